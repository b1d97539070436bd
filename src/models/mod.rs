// Event domain types shared by storage, services and HTTP handlers

pub mod event;

pub use event::{ColumnValue, Event, EventFeed, EventFeedEntry, EventFields, EventId, FeedMeta};
