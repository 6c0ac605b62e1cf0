//! Port for loading master tables from a shard.
use async_trait::async_trait;

use crate::domain::{MasterTables, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised while loading master tables.
    pub enum MasterDataSourceError {
        /// Shard connection could not be established.
        Connection { message: String } => "master data connection failed: {message}",
        /// A table could not be read.
        Query { message: String } => "master data query failed: {message}",
        /// A row holds values the domain cannot represent.
        Corrupt { message: String } => "master data is corrupt: {message}",
    }
}

/// Loads every master table in one pass.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MasterDataSource: Send + Sync {
    /// Load all master tables from the shard owning `shard_key`.
    async fn load(&self, shard_key: UserId) -> Result<MasterTables, MasterDataSourceError>;
}
