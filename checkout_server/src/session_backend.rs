//! Runtime selection of the session store.
//!
//! The engine APIs are generic over [`SessionStore`], but which store is used is only known once the configuration
//! has been read. [`SessionBackend`] wraps the available stores and dispatches to whichever one is configured.
use checkout_engine::{
    db_types::{PaymentSession, SessionId},
    traits::{SessionStore, SessionStoreError},
    MemorySessionStore,
};
#[cfg(feature = "redis")]
use checkout_engine::RedisSessionStore;
use chrono::Duration;
use log::*;
use tokio::task::JoinHandle;

use crate::{config::ServerConfig, errors::ServerError};

const REAPER_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub enum SessionBackend {
    Memory(MemorySessionStore),
    #[cfg(feature = "redis")]
    Redis(RedisSessionStore),
}

impl SessionBackend {
    #[cfg(feature = "redis")]
    pub async fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        match &config.redis_url {
            Some(url) => {
                let store = RedisSessionStore::new(url).map_err(|e| ServerError::InitializeError(e.to_string()))?;
                store.ping().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
                info!("🗝️ Payment sessions are stored in Redis");
                Ok(Self::Redis(store))
            },
            None => Ok(Self::memory()),
        }
    }

    #[cfg(not(feature = "redis"))]
    pub async fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        if config.redis_url.is_some() {
            return Err(ServerError::ConfigurationError(
                "CHK_REDIS_URL is set, but this server was built without Redis support".into(),
            ));
        }
        Ok(Self::memory())
    }

    pub fn memory() -> Self {
        info!("🗝️ Payment sessions are stored in memory");
        Self::Memory(MemorySessionStore::new())
    }

    /// Starts a worker that evicts expired sessions from the in-memory store. Redis expires keys by itself, so there
    /// is nothing to do for the Redis backend. Do not await the returned JoinHandle, as it will run indefinitely.
    pub fn start_reaper(&self) -> Option<JoinHandle<()>> {
        let Self::Memory(store) = self else {
            return None;
        };
        let store = store.clone();
        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(std::time::Duration::from_secs(REAPER_INTERVAL_SECS));
            info!("🕰️ Session reaper started");
            loop {
                timer.tick().await;
                let purged = store.purge_expired().await;
                trace!("🕰️ Session reaper removed {purged} expired sessions");
            }
        });
        Some(handle)
    }
}

impl SessionStore for SessionBackend {
    async fn put(
        &self,
        user_id: &str,
        session_id: &SessionId,
        session: &PaymentSession,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        match self {
            Self::Memory(s) => s.put(user_id, session_id, session, ttl).await,
            #[cfg(feature = "redis")]
            Self::Redis(s) => s.put(user_id, session_id, session, ttl).await,
        }
    }

    async fn get(&self, user_id: &str, session_id: &SessionId) -> Result<Option<PaymentSession>, SessionStoreError> {
        match self {
            Self::Memory(s) => s.get(user_id, session_id).await,
            #[cfg(feature = "redis")]
            Self::Redis(s) => s.get(user_id, session_id).await,
        }
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<PaymentSession>, SessionStoreError> {
        match self {
            Self::Memory(s) => s.list_by_user(user_id).await,
            #[cfg(feature = "redis")]
            Self::Redis(s) => s.list_by_user(user_id).await,
        }
    }

    async fn delete(&self, user_id: &str, session_id: &SessionId) -> Result<(), SessionStoreError> {
        match self {
            Self::Memory(s) => s.delete(user_id, session_id).await,
            #[cfg(feature = "redis")]
            Self::Redis(s) => s.delete(user_id, session_id).await,
        }
    }

    async fn mark_completed(
        &self,
        user_id: &str,
        session_id: &SessionId,
        ttl: Duration,
    ) -> Result<PaymentSession, SessionStoreError> {
        match self {
            Self::Memory(s) => s.mark_completed(user_id, session_id, ttl).await,
            #[cfg(feature = "redis")]
            Self::Redis(s) => s.mark_completed(user_id, session_id, ttl).await,
        }
    }
}
