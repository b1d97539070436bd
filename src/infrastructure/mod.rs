// Core infrastructure modules
pub mod database;              // Database interface
pub mod sqlite_database;       // SQLite implementation
pub mod file_storage;          // Image storage root and path resolution
pub mod session;               // Session lookup and guard
pub mod middleware;            // Request-scoped session injection
pub mod monitoring;            // Tracing setup

pub use database::EventDatabase;
pub use sqlite_database::SqliteDatabase;
pub use file_storage::FileStorage;
pub use session::{require_session, Session, SessionStore, TokenSessionStore};
