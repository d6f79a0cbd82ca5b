use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use log::*;
use tokio::sync::RwLock;

use crate::{
    db_types::{PaymentSession, SessionId, SessionStatus},
    traits::{session_key, user_key_prefix, SessionStore, SessionStoreError},
};

#[derive(Debug, Clone)]
struct SessionEntry {
    json: String,
    expires_at: DateTime<Utc>,
}

impl SessionEntry {
    fn new(json: String, ttl: Duration) -> Self {
        Self { json, expires_at: Utc::now() + ttl }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A process-local session store. Sessions are kept as JSON, exactly as the Redis store keeps them, so that both
/// backends behave identically with respect to serialization.
///
/// Expired entries are invisible to readers straight away and are physically removed on the next write touching the
/// same key, or by [`MemorySessionStore::purge_expired`].
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes all expired sessions, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let purged = before - entries.len();
        if purged > 0 {
            debug!("🗝️ Purged {purged} expired sessions");
        }
        purged
    }

    /// The number of entries held, including any expired entries that have not been purged yet.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Stores `json` verbatim under the session's key, bypassing serialization.
    #[cfg(any(feature = "test_utils", test))]
    pub async fn put_raw(&self, user_id: &str, session_id: &SessionId, json: &str, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.insert(session_key(user_id, session_id), SessionEntry::new(json.to_string(), ttl));
    }
}

impl SessionStore for MemorySessionStore {
    async fn put(
        &self,
        user_id: &str,
        session_id: &SessionId,
        session: &PaymentSession,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let json = serde_json::to_string(session)?;
        let mut entries = self.entries.write().await;
        entries.insert(session_key(user_id, session_id), SessionEntry::new(json, ttl));
        trace!("🗝️ Stored session {session_id} for {}s", ttl.num_seconds());
        Ok(())
    }

    async fn get(&self, user_id: &str, session_id: &SessionId) -> Result<Option<PaymentSession>, SessionStoreError> {
        let entries = self.entries.read().await;
        match entries.get(&session_key(user_id, session_id)) {
            Some(entry) if !entry.is_expired(Utc::now()) => Ok(Some(serde_json::from_str(&entry.json)?)),
            _ => Ok(None),
        }
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<PaymentSession>, SessionStoreError> {
        let prefix = user_key_prefix(user_id);
        let now = Utc::now();
        let entries = self.entries.read().await;
        let mut sessions = Vec::new();
        let live = entries.iter().filter(|(key, entry)| key.starts_with(&prefix) && !entry.is_expired(now));
        for (_, entry) in live {
            let session: PaymentSession = serde_json::from_str(&entry.json)?;
            // `u1:` is also a prefix of `u1:x:`
            if session.user_id == user_id {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }

    async fn delete(&self, user_id: &str, session_id: &SessionId) -> Result<(), SessionStoreError> {
        let mut entries = self.entries.write().await;
        entries.remove(&session_key(user_id, session_id));
        Ok(())
    }

    async fn mark_completed(
        &self,
        user_id: &str,
        session_id: &SessionId,
        ttl: Duration,
    ) -> Result<PaymentSession, SessionStoreError> {
        let key = session_key(user_id, session_id);
        let mut entries = self.entries.write().await;
        let json = match entries.get(&key) {
            Some(entry) if !entry.is_expired(Utc::now()) => entry.json.clone(),
            _ => {
                entries.remove(&key);
                return Err(SessionStoreError::NotFound(*session_id));
            },
        };
        let mut session: PaymentSession = serde_json::from_str(&json)?;
        if session.status == SessionStatus::Completed {
            return Err(SessionStoreError::AlreadyCompleted(*session_id));
        }
        session.status = SessionStatus::Completed;
        let json = serde_json::to_string(&session)?;
        entries.insert(key, SessionEntry::new(json, ttl));
        Ok(session)
    }
}
