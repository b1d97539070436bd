// Event records, feed projections and the validated mutation payload

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{AppError, AppResult};

pub type EventId = i64;

static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug pattern is valid"));

/// A stored event row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub slug: String,
    pub title: String,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub location: Option<String>,
    pub image: Option<String>,
}

/// One event annotated with its comment count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFeedEntry {
    #[serde(flatten)]
    pub event: Event,
    pub comments: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedMeta {
    pub total_events: i64,
}

/// Upcoming events, the most recent past events, and the overall event count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFeed {
    pub events: Vec<EventFeedEntry>,
    pub meta: FeedMeta,
}

/// A typed value bound to one allowlisted column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnValue {
    Text(String),
    OptionalText(Option<String>),
    Date(NaiveDate),
}

/// Validated subset of event columns.
///
/// `None` means "leave the column alone"; for the nullable columns
/// `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFields {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub description: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub image: Option<Option<String>>,
}

impl EventFields {
    /// Parse raw form input. Only `slug`, `title`, `date`, `description`,
    /// `location` and `image` are accepted; any other key is rejected.
    ///
    /// Keys listed in `ignored` (e.g. the slug used as the update key) are skipped.
    pub fn from_form(form: &HashMap<String, String>, ignored: &[&str]) -> AppResult<Self> {
        let mut fields = EventFields::default();

        for (key, raw) in form {
            if ignored.contains(&key.as_str()) {
                continue;
            }
            let value = raw.trim();
            match key.as_str() {
                "slug" => fields.slug = Some(parse_slug(value)?),
                "title" => {
                    if value.is_empty() {
                        return Err(AppError::Validation("title must not be empty".to_string()));
                    }
                    fields.title = Some(value.to_string());
                }
                "date" => fields.date = Some(parse_date(value)?),
                "description" => fields.description = Some(non_empty(value)),
                "location" => fields.location = Some(non_empty(value)),
                "image" => fields.image = Some(non_empty(value)),
                other => {
                    return Err(AppError::Validation(format!("Unknown event field: {}", other)));
                }
            }
        }

        Ok(fields)
    }

    /// Ensure the columns the table declares NOT NULL are present
    pub fn require_insertable(&self) -> AppResult<()> {
        let missing: Vec<&str> = [
            ("slug", self.slug.is_none()),
            ("title", self.title.is_none()),
            ("date", self.date.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "Missing required event fields: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns().is_empty()
    }

    /// Present columns in allowlist order, paired with their bind values
    pub fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
        let mut columns = Vec::new();
        if let Some(slug) = &self.slug {
            columns.push(("slug", ColumnValue::Text(slug.clone())));
        }
        if let Some(title) = &self.title {
            columns.push(("title", ColumnValue::Text(title.clone())));
        }
        if let Some(date) = self.date {
            columns.push(("date", ColumnValue::Date(date)));
        }
        if let Some(description) = &self.description {
            columns.push(("description", ColumnValue::OptionalText(description.clone())));
        }
        if let Some(location) = &self.location {
            columns.push(("location", ColumnValue::OptionalText(location.clone())));
        }
        if let Some(image) = &self.image {
            columns.push(("image", ColumnValue::OptionalText(image.clone())));
        }
        columns
    }
}

pub fn parse_slug(value: &str) -> AppResult<String> {
    let value = value.trim();
    if SLUG_PATTERN.is_match(value) {
        Ok(value.to_string())
    } else {
        Err(AppError::Validation(format!("Invalid slug: {:?}", value)))
    }
}

fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid date (expected YYYY-MM-DD): {:?}", value)))
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
