//! Login sessions
//!
//! A session is an explicit value handed to each handler by the [`Session`]
//! extractor. Tokens live in memory only; a restart logs everyone out.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{DateTime, Duration, Utc};

use crate::constants::SESSION_TTL_SECS;
use crate::error::AppError;
use crate::security::generate_session_token;
use crate::AppState;

/// Logged-in user context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn expires_at(&self, ttl: Duration) -> DateTime<Utc> {
        self.created_at + ttl
    }
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(Duration::seconds(SESSION_TTL_SECS))
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a session for an authenticated user
    pub fn create(&self, username: &str) -> Session {
        let now = Utc::now();
        let session = Session {
            token: generate_session_token(),
            username: username.to_string(),
            created_at: now,
        };

        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let ttl = self.ttl;
        sessions.retain(|_, s| s.expires_at(ttl) > now);
        sessions.insert(session.token.clone(), session.clone());

        tracing::info!("Session started for {}", username);
        session
    }

    /// Look a token up, dropping it if it has expired
    pub fn resolve(&self, token: &str) -> Option<Session> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
            match sessions.get(token) {
                None => return None,
                Some(session) if session.expires_at(self.ttl) > now => {
                    return Some(session.clone())
                }
                Some(_) => {}
            }
        }

        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        if let Some(expired) = sessions.remove(token) {
            tracing::info!("Session expired for {}", expired.username);
        }
        None
    }

    /// End a session; returns whether it existed
    pub fn revoke(&self, token: &str) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.remove(token).is_some()
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;
        state.sessions.resolve(token).ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_resolve() {
        let store = SessionStore::new();
        let session = store.create("alice");

        let resolved = store.resolve(&session.token).unwrap();
        assert_eq!(resolved.username, "alice");
        assert!(store.resolve("unknown").is_none());
    }

    #[test]
    fn test_revoke() {
        let store = SessionStore::new();
        let session = store.create("alice");

        assert!(store.revoke(&session.token));
        assert!(!store.revoke(&session.token));
        assert!(store.resolve(&session.token).is_none());
    }

    #[test]
    fn test_expired_session_rejected() {
        let store = SessionStore::with_ttl(Duration::seconds(-1));
        let session = store.create("alice");

        assert!(store.resolve(&session.token).is_none());
    }

    #[test]
    fn test_sessions_are_independent() {
        let store = SessionStore::new();
        let a = store.create("alice");
        let b = store.create("alice");

        assert_ne!(a.token, b.token);
        store.revoke(&a.token);
        assert!(store.resolve(&b.token).is_some());
    }

    #[test]
    fn test_bearer_token_parsing() {
        let request = axum::http::Request::builder()
            .header(AUTHORIZATION, "Bearer abc123")
            .body(())
            .unwrap();
        let (parts, _) = request.into_parts();
        assert_eq!(bearer_token(&parts), Some("abc123"));

        let request = axum::http::Request::builder()
            .header(AUTHORIZATION, "Basic abc123")
            .body(())
            .unwrap();
        let (parts, _) = request.into_parts();
        assert_eq!(bearer_token(&parts), None);
    }
}
