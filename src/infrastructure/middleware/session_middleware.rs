// Session Middleware - resolves the caller's session and injects it into request extensions

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::infrastructure::session::{Session, SessionStore};

pub const SESSION_COOKIE: &str = "session";

/// Trait for application state that can resolve sessions
pub trait HasSessionStore {
    fn session_store(&self) -> &Arc<dyn SessionStore>;
}

/// Resolve the session token (if any) and store `Option<Session>` on the request.
///
/// Never rejects a request; guards on individual operations decide what needs a session.
pub async fn session_middleware<T>(
    State(app_state): State<T>,
    mut request: Request,
    next: Next,
) -> Response
where
    T: HasSessionStore + Clone + Send + Sync + 'static,
{
    let session: Option<Session> = match extract_session_token(request.headers()) {
        Some(token) => {
            let resolved = app_state.session_store().resolve(&token).await;
            if resolved.is_none() {
                debug!("Unknown session token presented");
            }
            resolved
        }
        None => None,
    };

    request.extensions_mut().insert(session);
    next.run(request).await
}

/// Session token from the `session` cookie, falling back to `Authorization: Bearer`
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|auth| auth.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    })
}
