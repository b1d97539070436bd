// Services - business logic between HTTP handlers and storage

pub mod event_actions_service;
pub mod event_feed_service;
pub mod image_file_service;

pub use event_actions_service::{CreatedEvent, EventActionsService};
pub use event_feed_service::{parse_limit, EventFeedService};
pub use image_file_service::{mime_for, weak_etag, FileResponse, ImageFileService};
