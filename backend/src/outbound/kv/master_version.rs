//! Redis-backed master version marker.

use async_trait::async_trait;
use bb8_redis::redis::AsyncCommands;
use tracing::info;

use crate::domain::ports::{DEFAULT_MASTER_VERSION, MasterVersionStore, MasterVersionStoreError};

use super::MASTER_VERSION_KEY;
use super::pool::{RedisFailure, RedisPool, RedisPoolError, classify};

fn map_pool_error(error: RedisPoolError) -> MasterVersionStoreError {
    MasterVersionStoreError::connection(error.to_string())
}

fn map_redis_error(error: &bb8_redis::redis::RedisError) -> MasterVersionStoreError {
    match classify(error) {
        RedisFailure::Connection => MasterVersionStoreError::connection(error.to_string()),
        RedisFailure::Command => MasterVersionStoreError::command(error.to_string()),
    }
}

/// Reads and publishes the `master_version` key.
///
/// An unset key reads as [`DEFAULT_MASTER_VERSION`].
#[derive(Clone)]
pub struct RedisMasterVersionStore {
    pool: RedisPool,
}

impl RedisMasterVersionStore {
    /// Create a store over `pool`.
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MasterVersionStore for RedisMasterVersionStore {
    async fn current_version(&self) -> Result<String, MasterVersionStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let version: Option<String> = conn
            .get(MASTER_VERSION_KEY)
            .await
            .map_err(|err| map_redis_error(&err))?;
        Ok(version.unwrap_or_else(|| DEFAULT_MASTER_VERSION.to_owned()))
    }

    async fn publish(&self, version: &str) -> Result<(), MasterVersionStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let () = conn
            .set(MASTER_VERSION_KEY, version)
            .await
            .map_err(|err| map_redis_error(&err))?;
        info!(version, "master version published");
        Ok(())
    }
}
