// Database Interface - storage operations for events and their comments
// Services depend on this trait; SqliteDatabase is the shipped backend

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::AppResult;
use crate::models::{EventFeedEntry, EventFields, EventId};

/// Database interface trait for the events site.
///
/// Reads are not wrapped in a transaction: a feed read racing with writers
/// may observe a mix of before/after states. Isolation is whatever the
/// backend gives a single statement.
#[async_trait]
pub trait EventDatabase: Send + Sync {
    /// Every event dated on or after `today`, plus the `past_limit` most
    /// recent events before it, each with its comment count, ascending by date.
    async fn list_feed(&self, today: NaiveDate, past_limit: u32) -> AppResult<Vec<EventFeedEntry>>;

    /// Number of stored events, independent of any feed limit
    async fn count_events(&self) -> AppResult<i64>;

    /// Insert a new event row and return its id
    async fn insert_event(&self, fields: &EventFields) -> AppResult<EventId>;

    /// Apply `fields` to the event with `slug`. Returns false when no row matched.
    async fn update_event_by_slug(&self, slug: &str, fields: &EventFields) -> AppResult<bool>;

    /// Delete the event with `slug`. Returns false when no row matched.
    async fn delete_event_by_slug(&self, slug: &str) -> AppResult<bool>;
}
