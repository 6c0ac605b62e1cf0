//! Port for administrative schema fan-out across shards.
use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised while bootstrapping a shard.
    pub enum ShardBootstrapError {
        /// Shard connection could not be established.
        Connection { shard: usize, message: String } => "shard {shard} connection failed: {message}",
        /// Applying the schema failed.
        Migration { shard: usize, message: String } => "shard {shard} migration failed: {message}",
    }
}

/// Applies the relational schema to individual shards.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShardBootstrap: Send + Sync {
    /// Number of configured shards.
    fn shard_count(&self) -> usize;

    /// Apply pending schema migrations to one shard.
    async fn apply_schema(&self, shard: usize) -> Result<(), ShardBootstrapError>;
}
