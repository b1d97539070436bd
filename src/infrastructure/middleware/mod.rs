// Session middleware - resolves the request's session once, handlers read it via CurrentSession

pub mod session_extractor;
pub mod session_middleware;

pub use session_extractor::CurrentSession;
pub use session_middleware::*;
