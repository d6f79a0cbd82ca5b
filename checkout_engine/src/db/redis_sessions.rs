use chrono::Duration;
use log::*;
use redis::{aio::Connection, Client, RedisError};

use crate::{
    db_types::{PaymentSession, SessionId, SessionStatus},
    traits::{session_key, user_key_pattern, SessionStore, SessionStoreError},
};

const SCAN_BATCH_SIZE: usize = 100;

impl From<RedisError> for SessionStoreError {
    fn from(e: RedisError) -> Self {
        SessionStoreError::Unreachable(e.to_string())
    }
}

/// A session store backed by Redis. Each session is a JSON string under `payment_session:{user_id}:{session_id}`
/// with a millisecond expiry, so Redis does all the TTL bookkeeping.
#[derive(Debug, Clone)]
pub struct RedisSessionStore {
    client: Client,
}

impl RedisSessionStore {
    pub fn new(redis_url: &str) -> Result<Self, SessionStoreError> {
        let client = Client::open(redis_url)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<Connection, SessionStoreError> {
        let conn = self.client.get_async_connection().await?;
        Ok(conn)
    }

    /// Checks that the server is reachable.
    pub async fn ping(&self) -> Result<(), SessionStoreError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

fn ttl_millis(ttl: Duration) -> i64 {
    ttl.num_milliseconds().max(1)
}

impl SessionStore for RedisSessionStore {
    async fn put(
        &self,
        user_id: &str,
        session_id: &SessionId,
        session: &PaymentSession,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let json = serde_json::to_string(session)?;
        let mut conn = self.connection().await?;
        redis::cmd("SET")
            .arg(session_key(user_id, session_id))
            .arg(json)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async::<_, ()>(&mut conn)
            .await?;
        trace!("🗝️ Stored session {session_id} in redis for {}s", ttl.num_seconds());
        Ok(())
    }

    async fn get(&self, user_id: &str, session_id: &SessionId) -> Result<Option<PaymentSession>, SessionStoreError> {
        let mut conn = self.connection().await?;
        let json: Option<String> =
            redis::cmd("GET").arg(session_key(user_id, session_id)).query_async(&mut conn).await?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<PaymentSession>, SessionStoreError> {
        let pattern = user_key_pattern(user_id);
        let mut conn = self.connection().await?;
        let mut keys = Vec::new();
        let mut cursor = 0u64;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH_SIZE)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        let mut sessions = Vec::with_capacity(keys.len());
        for key in keys {
            // The key may have expired between SCAN and GET
            let json: Option<String> = redis::cmd("GET").arg(&key).query_async(&mut conn).await?;
            if let Some(json) = json {
                let session: PaymentSession = serde_json::from_str(&json)?;
                // `u1:` is also a prefix of `u1:x:`
                if session.user_id == user_id {
                    sessions.push(session);
                }
            }
        }
        Ok(sessions)
    }

    async fn delete(&self, user_id: &str, session_id: &SessionId) -> Result<(), SessionStoreError> {
        let mut conn = self.connection().await?;
        redis::cmd("DEL").arg(session_key(user_id, session_id)).query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    async fn mark_completed(
        &self,
        user_id: &str,
        session_id: &SessionId,
        ttl: Duration,
    ) -> Result<PaymentSession, SessionStoreError> {
        let key = session_key(user_id, session_id);
        let mut conn = self.connection().await?;
        let json: Option<String> = redis::cmd("GET").arg(&key).query_async(&mut conn).await?;
        let mut session: PaymentSession = match json {
            Some(json) => serde_json::from_str(&json)?,
            None => return Err(SessionStoreError::NotFound(*session_id)),
        };
        if session.status == SessionStatus::Completed {
            return Err(SessionStoreError::AlreadyCompleted(*session_id));
        }
        session.status = SessionStatus::Completed;
        // XX: never resurrect a session that was deleted after we read it
        let stored: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(serde_json::to_string(&session)?)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .arg("XX")
            .query_async(&mut conn)
            .await?;
        match stored {
            Some(_) => Ok(session),
            None => Err(SessionStoreError::NotFound(*session_id)),
        }
    }
}
