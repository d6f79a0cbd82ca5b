use chrono::Duration;
use thiserror::Error;

use crate::db_types::{PaymentSession, SessionId};

#[derive(Debug, Clone, Error)]
pub enum SessionStoreError {
    #[error("Session store is unreachable: {0}")]
    Unreachable(String),
    #[error("Session {0} does not exist or has expired")]
    NotFound(SessionId),
    #[error("Session {0} has already been completed")]
    AlreadyCompleted(SessionId),
    #[error("Could not (de)serialize session: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SessionStoreError {
    fn from(e: serde_json::Error) -> Self {
        SessionStoreError::Serialization(e.to_string())
    }
}

/// The session store is a key-value store with per-entry expiry holding checkout sessions that are waiting for the
/// payment provider to confirm payment.
///
/// Sessions are only addressable by `(user_id, session_id)`. A user can never read or modify another user's session
/// because the store has no other access path.
///
/// Implementations must be cheap to clone; clones share the same underlying store.
#[allow(async_fn_in_trait)]
pub trait SessionStore: Clone {
    /// Stores the session, replacing any existing entry with the same key. The entry expires after `ttl`.
    async fn put(
        &self,
        user_id: &str,
        session_id: &SessionId,
        session: &PaymentSession,
        ttl: Duration,
    ) -> Result<(), SessionStoreError>;

    /// Fetches a session. Expired sessions are never returned.
    async fn get(&self, user_id: &str, session_id: &SessionId) -> Result<Option<PaymentSession>, SessionStoreError>;

    /// All live sessions belonging to the user, in no particular order. Only sessions whose stored `user_id` equals
    /// `user_id` are returned, even if another user's key happens to share the prefix.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<PaymentSession>, SessionStoreError>;

    /// Removes the session. Deleting a session that does not exist is not an error.
    async fn delete(&self, user_id: &str, session_id: &SessionId) -> Result<(), SessionStoreError>;

    /// Flips the session status to `completed` and re-persists it with a fresh `ttl`.
    ///
    /// Returns [`SessionStoreError::AlreadyCompleted`] if the session was already completed, and
    /// [`SessionStoreError::NotFound`] if it is missing or expired.
    async fn mark_completed(
        &self,
        user_id: &str,
        session_id: &SessionId,
        ttl: Duration,
    ) -> Result<PaymentSession, SessionStoreError>;
}

/// The storage key for a session: `payment_session:{user_id}:{session_id}`
pub fn session_key(user_id: &str, session_id: &SessionId) -> String {
    format!("{}{session_id}", user_key_prefix(user_id))
}

/// The key prefix shared by all of a user's sessions.
pub fn user_key_prefix(user_id: &str) -> String {
    format!("payment_session:{user_id}:")
}

/// A `SCAN MATCH` glob selecting every key under [`user_key_prefix`]. Glob metacharacters in the user id are escaped so
/// that they only ever match themselves.
pub fn user_key_pattern(user_id: &str) -> String {
    let prefix = user_key_prefix(user_id);
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}
