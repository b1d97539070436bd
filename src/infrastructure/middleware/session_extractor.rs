// CurrentSession Extractor - hands the resolved session to handlers

use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

use crate::infrastructure::session::Session;

/// The session resolved by `session_middleware`, if any.
///
/// Extraction never fails: a route without the middleware simply sees no session.
#[derive(Debug, Clone, Default)]
pub struct CurrentSession(pub Option<Session>);

impl CurrentSession {
    pub fn get(&self) -> Option<&Session> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let session = parts
            .extensions
            .get::<Option<Session>>()
            .cloned()
            .flatten();

        async move { Ok(CurrentSession(session)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_extracts_injected_session() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        parts.extensions.insert(Some(Session {
            token: "t".into(),
            user: "alice".into(),
        }));

        let current = CurrentSession::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(current.get().map(|s| s.user.as_str()), Some("alice"));
    }

    #[tokio::test]
    async fn test_missing_extension_means_no_session() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let current = CurrentSession::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(current.get().is_none());
    }
}
