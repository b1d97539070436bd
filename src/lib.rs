// Events site - event feed, event actions and image file serving

// Infrastructure - storage, file root, sessions, logging
pub mod infrastructure;

// Domain types
pub mod models;

// Business logic
pub mod services;

// HTTP surface
pub mod app_state;
pub mod events_interface;
pub mod images_interface;
pub mod router;

// Common utilities
pub mod config;
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
