// Session resolution and the authorization guard for mutating actions

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::{AppError, AppResult};

/// An authenticated session. Its presence on a request is what authorizes mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: String,
}

/// Looks up the session a request token belongs to
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn resolve(&self, token: &str) -> Option<Session>;
}

/// Session store backed by a fixed set of tokens from configuration
#[derive(Debug, Clone, Default)]
pub struct TokenSessionStore {
    users_by_token: HashMap<String, String>,
}

impl TokenSessionStore {
    /// Build from `token[:user]` entries. A bare token gets the user name "admin".
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let users_by_token = entries
            .into_iter()
            .filter_map(|entry| {
                let entry = entry.as_ref().trim();
                let (token, user) = match entry.split_once(':') {
                    Some((token, user)) => (token.trim(), user.trim()),
                    None => (entry, "admin"),
                };
                (!token.is_empty()).then(|| (token.to_string(), user.to_string()))
            })
            .collect();
        Self { users_by_token }
    }

    pub fn len(&self) -> usize {
        self.users_by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users_by_token.is_empty()
    }
}

#[async_trait]
impl SessionStore for TokenSessionStore {
    async fn resolve(&self, token: &str) -> Option<Session> {
        self.users_by_token.get(token).map(|user| Session {
            token: token.to_string(),
            user: user.clone(),
        })
    }
}

/// The one guard every mutating operation runs first
pub fn require_session(session: Option<&Session>) -> AppResult<&Session> {
    session.ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_store_resolves_known_tokens() {
        let store = TokenSessionStore::from_entries(["abc:alice", "def", " :nobody"]);
        assert_eq!(store.len(), 2);

        let alice = store.resolve("abc").await.unwrap();
        assert_eq!(alice.user, "alice");
        assert_eq!(store.resolve("def").await.unwrap().user, "admin");
        assert!(store.resolve("nope").await.is_none());
        assert!(store.resolve("").await.is_none());
    }

    #[test]
    fn test_require_session() {
        assert!(matches!(require_session(None), Err(AppError::Unauthorized(_))));

        let session = Session {
            token: "t".into(),
            user: "u".into(),
        };
        assert_eq!(require_session(Some(&session)).unwrap().user, "u");
    }
}
