use std::sync::Arc;

use crate::{
    config::Config,
    infrastructure::{
        middleware::HasSessionStore, EventDatabase, FileStorage, SessionStore, SqliteDatabase,
        TokenSessionStore,
    },
    services::{EventActionsService, EventFeedService, ImageFileService},
};

#[derive(Clone)]
pub struct AppState {
    pub feed: EventFeedService,
    pub actions: EventActionsService,
    pub images: ImageFileService,
    pub sessions: Arc<dyn SessionStore>,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Initialize database
        let database =
            SqliteDatabase::new(&config.database.url, config.database.max_connections).await?;
        let database: Arc<dyn EventDatabase> = Arc::new(database);

        let sessions = TokenSessionStore::from_entries(&config.session.tokens);
        if sessions.is_empty() {
            tracing::warn!("SESSION_TOKENS is empty; every mutating action will be rejected");
        }

        Ok(Self::from_parts(config, database, Arc::new(sessions)))
    }

    /// Wire services around already constructed collaborators
    pub fn from_parts(
        config: Config,
        database: Arc<dyn EventDatabase>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let storage = Arc::new(FileStorage::new(config.files.root.clone()));

        Self {
            feed: EventFeedService::new(database.clone()),
            actions: EventActionsService::new(database),
            images: ImageFileService::new(storage, config.files.chunk_size),
            sessions,
            config,
        }
    }
}

impl HasSessionStore for AppState {
    fn session_store(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }
}
