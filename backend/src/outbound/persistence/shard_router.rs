//! Deterministic user-to-shard routing.
//!
//! The router owns an immutable, ordered list of shard endpoints. A user's
//! shard is `user_id mod shard_count`, so every row of a user's data graph
//! lands on the same database for the lifetime of the shard list. Pools are
//! built lazily on first use; a shard that cannot be reached fails only the
//! requests routed to it.

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::domain::UserId;

use super::pool::{DbPool, PoolConfig, PoolError};

/// Errors raised while building a router or reaching a shard.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShardError {
    /// A router needs at least one shard.
    #[error("at least one shard is required")]
    NoShards,
    /// The shard's pool could not be built or a connection checked out.
    #[error("shard {shard} unavailable: {source}")]
    Unavailable {
        /// Index of the failing shard.
        shard: usize,
        /// Underlying pool failure.
        source: PoolError,
    },
}

/// One shard endpoint with its lazily established pool.
pub struct Shard {
    index: usize,
    config: PoolConfig,
    pool: OnceCell<DbPool>,
}

impl Shard {
    fn new(index: usize, config: PoolConfig) -> Self {
        Self {
            index,
            config,
            pool: OnceCell::new(),
        }
    }

    /// Position of the shard in the router's list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Connection URL of the shard.
    pub fn database_url(&self) -> &str {
        self.config.database_url()
    }

    /// The shard's pool, built on first use and reused afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::Unavailable`] when the pool cannot be built. A
    /// failed attempt is not cached; the next call retries.
    pub async fn pool(&self) -> Result<&DbPool, ShardError> {
        self.pool
            .get_or_try_init(|| async {
                info!(shard = self.index, "building shard pool");
                DbPool::new(self.config.clone()).await
            })
            .await
            .map_err(|source| ShardError::Unavailable {
                shard: self.index,
                source,
            })
    }
}

/// Maps users to shards.
pub struct ShardRouter {
    shards: Vec<Shard>,
}

impl ShardRouter {
    /// Build a router over `configs`; list order is the shard index.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::NoShards`] for an empty list.
    pub fn new(configs: Vec<PoolConfig>) -> Result<Self, ShardError> {
        if configs.is_empty() {
            return Err(ShardError::NoShards);
        }
        let shards = configs
            .into_iter()
            .enumerate()
            .map(|(index, config)| Shard::new(index, config))
            .collect();
        Ok(Self { shards })
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Index of the shard owning `user_id`.
    pub fn index_for(&self, user_id: UserId) -> usize {
        let count = self.shards.len() as u64;
        // `count` is non-zero and the remainder is below it, so it fits.
        usize::try_from(user_id.get() % count).unwrap_or_default()
    }

    /// The shard owning `user_id`.
    ///
    /// # Errors
    ///
    /// Never fails for a router built by [`ShardRouter::new`]; the
    /// [`ShardError::NoShards`] arm keeps the lookup total.
    pub fn shard_for(&self, user_id: UserId) -> Result<&Shard, ShardError> {
        let index = self.index_for(user_id);
        debug!(%user_id, shard = index, "routing user");
        self.shards.get(index).ok_or(ShardError::NoShards)
    }

    /// Every shard, in index order. Used by administrative fan-out only.
    pub fn all_shards(&self) -> &[Shard] {
        &self.shards
    }

    /// Shard by index, if it exists.
    pub fn shard(&self, index: usize) -> Option<&Shard> {
        self.shards.get(index)
    }
}
