// EventActionsService - session-gated create/update/remove of events

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    error::{AppError, AppResult},
    infrastructure::{require_session, EventDatabase, Session},
    models::{event::parse_slug, EventFields, EventId},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedEvent {
    pub id: EventId,
    pub slug: String,
}

#[derive(Clone)]
pub struct EventActionsService {
    db: Arc<dyn EventDatabase>,
}

impl EventActionsService {
    pub fn new(db: Arc<dyn EventDatabase>) -> Self {
        Self { db }
    }

    /// Insert a new event from raw form fields
    pub async fn create(
        &self,
        session: Option<&Session>,
        form: &HashMap<String, String>,
    ) -> AppResult<CreatedEvent> {
        let session = guard(session, "create_event")?;

        let fields = EventFields::from_form(form, &[])?;
        fields.require_insertable()?;

        let id = self.db.insert_event(&fields).await?;
        let slug = fields.slug.unwrap_or_default();
        info!("{} created event {} (id {})", session.user, slug, id);
        Ok(CreatedEvent { id, slug })
    }

    /// Replace the supplied fields on the event identified by `slug`.
    /// The `slug` key inside `form` is the lookup key and is not rewritten.
    pub async fn update(
        &self,
        session: Option<&Session>,
        slug: &str,
        form: &HashMap<String, String>,
    ) -> AppResult<()> {
        let session = guard(session, "update_event")?;

        let slug = parse_slug(slug)?;
        let fields = EventFields::from_form(form, &["slug"])?;
        if fields.is_empty() {
            return Err(AppError::Validation("No event fields to update".to_string()));
        }

        if !self.db.update_event_by_slug(&slug, &fields).await? {
            return Err(AppError::NotFound(format!("Event {} not found", slug)));
        }
        info!("{} updated event {}", session.user, slug);
        Ok(())
    }

    /// Delete the event identified by `slug`
    pub async fn remove(&self, session: Option<&Session>, slug: &str) -> AppResult<()> {
        let session = guard(session, "remove_event")?;

        let slug = parse_slug(slug)?;
        if !self.db.delete_event_by_slug(&slug).await? {
            return Err(AppError::NotFound(format!("Event {} not found", slug)));
        }
        info!("{} removed event {}", session.user, slug);
        Ok(())
    }
}

fn guard<'a>(session: Option<&'a Session>, action: &str) -> AppResult<&'a Session> {
    require_session(session).inspect_err(|_| warn!("Rejected {} without a session", action))
}
