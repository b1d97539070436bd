// EventFeedService - upcoming events plus a window of recent past events

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::{
    error::AppResult,
    infrastructure::EventDatabase,
    models::{EventFeed, FeedMeta},
};

/// Interpret the raw `limit` query value.
///
/// Only a plain non-negative integer is accepted; anything else (missing, empty,
/// negative, fractional, not a number) falls back to `default`. Integers too
/// large for `u32` saturate.
pub fn parse_limit(raw: Option<&str>, default: u32) -> u32 {
    raw.map(str::trim)
        .filter(|value| !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| match digits.parse::<u64>() {
            Ok(value) => Some(u32::try_from(value).unwrap_or(u32::MAX)),
            // More digits than u64 holds
            Err(_) => Some(u32::MAX),
        })
        .unwrap_or(default)
}

#[derive(Clone)]
pub struct EventFeedService {
    db: Arc<dyn EventDatabase>,
}

impl EventFeedService {
    pub fn new(db: Arc<dyn EventDatabase>) -> Self {
        Self { db }
    }

    /// Feed relative to the current UTC date
    pub async fn list_events(&self, limit: u32) -> AppResult<EventFeed> {
        self.list_events_on(Utc::now().date_naive(), limit).await
    }

    /// Feed relative to `today`: everything on or after it, the `limit` latest
    /// events before it, and the total number of stored events.
    ///
    /// The two reads are independent statements, so a concurrent writer can make
    /// `total_events` disagree with the listed rows.
    pub async fn list_events_on(&self, today: NaiveDate, limit: u32) -> AppResult<EventFeed> {
        let events = self.db.list_feed(today, limit).await?;
        let total_events = self.db.count_events().await?;

        debug!(
            "Listed {} feed entries ({} events stored, past limit {})",
            events.len(),
            total_events,
            limit
        );

        Ok(EventFeed {
            events,
            meta: FeedMeta { total_events },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::SqliteDatabase;
    use crate::models::EventFields;

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit(Some("3"), 5), 3);
        assert_eq!(parse_limit(Some(" 12 "), 5), 12);
        assert_eq!(parse_limit(Some("0"), 5), 0);
        assert_eq!(parse_limit(None, 5), 5);
        assert_eq!(parse_limit(Some(""), 5), 5);
        assert_eq!(parse_limit(Some("abc"), 5), 5);
        assert_eq!(parse_limit(Some("-2"), 5), 5);
        assert_eq!(parse_limit(Some("2.5"), 5), 5);
        assert_eq!(parse_limit(Some("NaN"), 7), 7);
        assert_eq!(parse_limit(Some("+3"), 5), 5);
        assert_eq!(parse_limit(Some("4294967295"), 5), u32::MAX);
        assert_eq!(parse_limit(Some("99999999999"), 5), u32::MAX);
        assert_eq!(parse_limit(Some("123456789012345678901234567890"), 5), u32::MAX);
    }

    #[tokio::test]
    async fn test_feed_counts_past_events_exactly() {
        let db = Arc::new(SqliteDatabase::new_in_memory().await.unwrap());
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        for day in 1..=9 {
            db.insert_event(&EventFields {
                slug: Some(format!("day-{}", day)),
                title: Some(format!("Day {}", day)),
                date: NaiveDate::from_ymd_opt(2026, 3, day * 2),
                ..EventFields::default()
            })
            .await
            .unwrap();
        }
        let service = EventFeedService::new(db);

        // Dates 2,4,6,8 are past; 10..18 are today or later
        for limit in [0u32, 1, 3, 4, 10] {
            let feed = service.list_events_on(today, limit).await.unwrap();
            let past = feed.events.iter().filter(|e| e.event.date < today).count();
            let upcoming = feed.events.iter().filter(|e| e.event.date >= today).count();
            assert_eq!(past, (limit as usize).min(4));
            assert_eq!(upcoming, 5);
            assert_eq!(feed.meta.total_events, 9);
            assert!(feed.events.windows(2).all(|w| w[0].event.date <= w[1].event.date));
        }
    }

    #[tokio::test]
    async fn test_empty_store() {
        let db = Arc::new(SqliteDatabase::new_in_memory().await.unwrap());
        let feed = EventFeedService::new(db).list_events(5).await.unwrap();
        assert!(feed.events.is_empty());
        assert_eq!(feed.meta.total_events, 0);
    }
}
