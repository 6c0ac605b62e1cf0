//! Redis-backed login sessions.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::redis::{AsyncCommands, RedisError};

use crate::domain::ports::{SessionStore, SessionStoreError};
use crate::domain::{Session, UserId};

use super::pool::{RedisFailure, RedisPool, RedisPoolError, classify};
use super::session_key;

fn map_pool_error(error: RedisPoolError) -> SessionStoreError {
    SessionStoreError::connection(error.to_string())
}

fn map_redis_error(error: &RedisError) -> SessionStoreError {
    match classify(error) {
        RedisFailure::Connection => SessionStoreError::connection(error.to_string()),
        RedisFailure::Command => SessionStoreError::command(error.to_string()),
    }
}

fn parse_owner(raw: &str) -> Result<UserId, SessionStoreError> {
    raw.parse::<u64>()
        .map(UserId::new)
        .map_err(|err| SessionStoreError::serialization(format!("session owner {raw:?}: {err}")))
}

/// Stores each session under `user_session:{session_id}` with a TTL.
///
/// Issuing a session never touches the user's other sessions.
#[derive(Clone)]
pub struct RedisSessionStore {
    pool: RedisPool,
}

impl RedisSessionStore {
    /// Create a store over `pool`.
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(&self, session: &Session, ttl: Duration) -> Result<(), SessionStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let () = conn
            .set_ex(
                session_key(&session.session_id),
                session.user_id.get(),
                ttl.as_secs().max(1),
            )
            .await
            .map_err(|err| map_redis_error(&err))?;
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<UserId>, SessionStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let raw: Option<String> = conn
            .get(session_key(session_id))
            .await
            .map_err(|err| map_redis_error(&err))?;
        raw.as_deref().map(parse_owner).transpose()
    }
}
