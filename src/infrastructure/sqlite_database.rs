use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{
    sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow},
    QueryBuilder, Row,
};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::infrastructure::database::EventDatabase;
use crate::models::{ColumnValue, Event, EventFeedEntry, EventFields, EventId};

const FEED_QUERY: &str = r#"
    SELECT e.id, e.slug, e.title, e.date, e.description, e.location, e.image,
           COALESCE(c.comments, 0) AS comments
    FROM (
        SELECT * FROM event WHERE date >= ?
        UNION ALL
        SELECT * FROM (
            SELECT * FROM event
            WHERE date < ?
            ORDER BY date DESC, id DESC
            LIMIT ?
        ) past_events
    ) e
    LEFT JOIN (
        SELECT event_id, COUNT(*) AS comments
        FROM comment
        GROUP BY event_id
    ) c ON e.id = c.event_id
    ORDER BY e.date, e.id
"#;

/// SQLite implementation of the events database
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Connect to `url`, creating the database file (and its directory) if missing
    pub async fn new(url: &str, max_connections: u32) -> AppResult<Self> {
        if let Some(parent) = sqlite_file_path(url).and_then(|path| path.parent()) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| AppError::ConfigurationError(format!("Invalid database URL {}: {}", url, e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to {}: {}", url, e)))?;

        let db = Self { pool };
        db.initialize().await?;
        info!("Connected to SQLite database at {}", url);
        Ok(db)
    }

    /// Single-connection in-memory database; the connection is never recycled
    /// so the schema and data live as long as the pool.
    pub async fn new_in_memory() -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| AppError::ConfigurationError(format!("Invalid in-memory URL: {}", e)))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to connect to in-memory SQLite: {}", e))
            })?;

        let db = Self { pool };
        db.initialize().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create event and comment tables if they do not exist yet
    pub async fn initialize(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS event (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                date TEXT NOT NULL,
                description TEXT,
                location TEXT,
                image TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create event table: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS comment (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id INTEGER NOT NULL REFERENCES event(id) ON DELETE CASCADE,
                author TEXT,
                body TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create comment table: {}", e)))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_event_date ON event(date)")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create event date index: {}", e)))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_comment_event_id ON comment(event_id)")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to create comment event index: {}", e))
            })?;

        Ok(())
    }

    /// Attach a comment to an event
    pub async fn add_comment(
        &self,
        event_id: EventId,
        author: Option<&str>,
        body: &str,
    ) -> AppResult<i64> {
        let now = chrono::Utc::now().timestamp_millis();
        let result = sqlx::query(
            "INSERT INTO comment (event_id, author, body, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(event_id)
        .bind(author)
        .bind(body)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error(&format!("Failed to add comment to event {}", event_id), e))?;
        Ok(result.last_insert_rowid())
    }
}

#[async_trait]
impl EventDatabase for SqliteDatabase {
    async fn list_feed(&self, today: NaiveDate, past_limit: u32) -> AppResult<Vec<EventFeedEntry>> {
        let rows = sqlx::query(FEED_QUERY)
            .bind(today)
            .bind(today)
            .bind(i64::from(past_limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to list event feed: {}", e)))?;

        debug!("Event feed for {} (past limit {}): {} rows", today, past_limit, rows.len());

        rows.iter()
            .map(|row| {
                Ok(EventFeedEntry {
                    event: event_from_row(row)?,
                    comments: row.try_get("comments")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| AppError::DatabaseError(format!("Failed to decode feed row: {}", e)))
    }

    async fn count_events(&self) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM event")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count events: {}", e)))?;
        row.try_get("total")
            .map_err(|e| AppError::DatabaseError(format!("Failed to decode event count: {}", e)))
    }

    async fn insert_event(&self, fields: &EventFields) -> AppResult<EventId> {
        let columns = fields.columns();
        if columns.is_empty() {
            return Err(AppError::Validation("No event fields supplied".to_string()));
        }

        let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        let mut qb = QueryBuilder::<Sqlite>::new("INSERT INTO event (");
        qb.push(names.join(", "));
        qb.push(") VALUES (");
        for (i, (_, value)) in columns.into_iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            push_value(&mut qb, value);
        }
        qb.push(")");

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to insert event", e))?;
        Ok(result.last_insert_rowid())
    }

    async fn update_event_by_slug(&self, slug: &str, fields: &EventFields) -> AppResult<bool> {
        let columns = fields.columns();
        if columns.is_empty() {
            let row = sqlx::query("SELECT 1 FROM event WHERE slug = ?")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| storage_error(&format!("Failed to look up event {}", slug), e))?;
            return Ok(row.is_some());
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE event SET ");
        for (i, (name, value)) in columns.into_iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(name);
            qb.push(" = ");
            push_value(&mut qb, value);
        }
        qb.push(" WHERE slug = ");
        qb.push_bind(slug);

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error(&format!("Failed to update event {}", slug), e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_event_by_slug(&self, slug: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM event WHERE slug = ?")
            .bind(slug)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error(&format!("Failed to delete event {}", slug), e))?;
        Ok(result.rows_affected() > 0)
    }
}

fn event_from_row(row: &SqliteRow) -> Result<Event, sqlx::Error> {
    Ok(Event {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
        date: row.try_get("date")?,
        description: row.try_get("description")?,
        location: row.try_get("location")?,
        image: row.try_get("image")?,
    })
}

fn push_value(qb: &mut QueryBuilder<'_, Sqlite>, value: ColumnValue) {
    match value {
        ColumnValue::Text(text) => {
            qb.push_bind(text);
        }
        ColumnValue::OptionalText(text) => {
            qb.push_bind(text);
        }
        ColumnValue::Date(date) => {
            qb.push_bind(date);
        }
    }
}

/// Keep constraint violations as validation errors, prefix everything else with context
fn storage_error(context: &str, err: sqlx::Error) -> AppError {
    match AppError::from(err) {
        AppError::DatabaseError(msg) => AppError::DatabaseError(format!("{}: {}", context, msg)),
        other => other,
    }
}

/// File path of a `sqlite:` URL, or None for in-memory databases
fn sqlite_file_path(url: &str) -> Option<&Path> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(Path::new(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    }

    fn fields(slug: &str, date: NaiveDate) -> EventFields {
        EventFields {
            slug: Some(slug.to_string()),
            title: Some(format!("Title for {}", slug)),
            date: Some(date),
            ..EventFields::default()
        }
    }

    async fn seeded() -> SqliteDatabase {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        let t = today();
        for (slug, offset) in [
            ("past-5", -5),
            ("past-4", -4),
            ("past-3", -3),
            ("past-2", -2),
            ("past-1", -1),
            ("today", 0),
            ("future-1", 1),
            ("future-9", 9),
        ] {
            db.insert_event(&fields(slug, t + chrono::Duration::days(offset)))
                .await
                .unwrap();
        }
        db
    }

    fn slugs(entries: &[EventFeedEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.event.slug.as_str()).collect()
    }

    #[tokio::test]
    async fn test_feed_includes_upcoming_and_recent_past() {
        let db = seeded().await;

        let feed = db.list_feed(today(), 2).await.unwrap();
        assert_eq!(
            slugs(&feed),
            vec!["past-2", "past-1", "today", "future-1", "future-9"]
        );
        assert!(feed.windows(2).all(|w| w[0].event.date <= w[1].event.date));
    }

    #[tokio::test]
    async fn test_feed_limit_zero_returns_upcoming_only() {
        let db = seeded().await;

        let feed = db.list_feed(today(), 0).await.unwrap();
        assert_eq!(slugs(&feed), vec!["today", "future-1", "future-9"]);
    }

    #[tokio::test]
    async fn test_feed_limit_larger_than_past_partition() {
        let db = seeded().await;

        let feed = db.list_feed(today(), 50).await.unwrap();
        assert_eq!(feed.len(), 8);
        let mut ids: Vec<_> = feed.iter().map(|e| e.event.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }

    #[tokio::test]
    async fn test_count_ignores_limit() {
        let db = seeded().await;
        assert_eq!(db.count_events().await.unwrap(), 8);
        db.list_feed(today(), 1).await.unwrap();
        assert_eq!(db.count_events().await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_comment_counts_and_zero_default() {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        let busy = db.insert_event(&fields("busy", today())).await.unwrap();
        db.insert_event(&fields("quiet", today())).await.unwrap();
        db.add_comment(busy, Some("ana"), "first").await.unwrap();
        db.add_comment(busy, None, "second").await.unwrap();

        let feed = db.list_feed(today(), 5).await.unwrap();
        let counts: HashMap<&str, i64> = feed
            .iter()
            .map(|e| (e.event.slug.as_str(), e.comments))
            .collect();
        assert_eq!(counts["busy"], 2);
        assert_eq!(counts["quiet"], 0);
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_validation_error() {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        db.insert_event(&fields("dup", today())).await.unwrap();

        let err = db.insert_event(&fields("dup", today())).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("UNIQUE")));
        assert_eq!(db.count_events().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_not_null_column_propagates() {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        let partial = EventFields {
            slug: Some("no-title".into()),
            date: Some(today()),
            ..EventFields::default()
        };
        assert!(db.insert_event(&partial).await.is_err());
        assert_eq!(db.count_events().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_and_delete_by_slug() {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        db.insert_event(&fields("meetup", today())).await.unwrap();

        let change = EventFields {
            title: Some("Renamed".into()),
            location: Some(Some("Hall B".into())),
            ..EventFields::default()
        };
        assert!(db.update_event_by_slug("meetup", &change).await.unwrap());
        assert!(!db.update_event_by_slug("missing", &change).await.unwrap());

        let feed = db.list_feed(today(), 0).await.unwrap();
        assert_eq!(feed[0].event.title, "Renamed");
        assert_eq!(feed[0].event.location.as_deref(), Some("Hall B"));

        assert!(db.delete_event_by_slug("meetup").await.unwrap());
        assert!(!db.delete_event_by_slug("meetup").await.unwrap());
        assert_eq!(db.count_events().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_comments() {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        let id = db.insert_event(&fields("gone", today())).await.unwrap();
        db.add_comment(id, None, "bye").await.unwrap();

        db.delete_event_by_slug("gone").await.unwrap();
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comment")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_sqlite_file_path() {
        assert_eq!(sqlite_file_path("sqlite:data/events.db"), Some(Path::new("data/events.db")));
        assert_eq!(
            sqlite_file_path("sqlite://data/events.db?mode=rwc"),
            Some(Path::new("data/events.db"))
        );
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
        assert_eq!(sqlite_file_path("postgres://localhost/db"), None);
    }
}
