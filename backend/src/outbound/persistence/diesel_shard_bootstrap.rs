//! Applies the embedded schema migrations to one shard.
//!
//! Migrations run over a dedicated synchronous connection on the blocking
//! thread pool; pooled async connections are never used for DDL.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::{Connection, PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

use crate::domain::ports::{ShardBootstrap, ShardBootstrapError};

use super::shard_router::ShardRouter;

/// Migrations compiled into the binary from `backend/migrations`.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Diesel-backed implementation of the [`ShardBootstrap`] port.
#[derive(Clone)]
pub struct DieselShardBootstrap {
    router: Arc<ShardRouter>,
}

impl DieselShardBootstrap {
    /// Create a bootstrapper over every shard of `router`.
    pub fn new(router: Arc<ShardRouter>) -> Self {
        Self { router }
    }
}

fn run_migrations(shard: usize, database_url: &str) -> Result<usize, ShardBootstrapError> {
    let mut connection = PgConnection::establish(database_url)
        .map_err(|error| ShardBootstrapError::connection(shard, error.to_string()))?;
    let applied = connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|error| ShardBootstrapError::migration(shard, error.to_string()))?;
    Ok(applied.len())
}

#[async_trait]
impl ShardBootstrap for DieselShardBootstrap {
    fn shard_count(&self) -> usize {
        self.router.shard_count()
    }

    async fn apply_schema(&self, shard: usize) -> Result<(), ShardBootstrapError> {
        let database_url = self
            .router
            .shard(shard)
            .map(|entry| entry.database_url().to_owned())
            .ok_or_else(|| ShardBootstrapError::connection(shard, "no such shard"))?;
        let applied = tokio::task::spawn_blocking(move || run_migrations(shard, &database_url))
            .await
            .map_err(|error| ShardBootstrapError::migration(shard, error.to_string()))??;
        info!(shard, applied, "shard schema up to date");
        Ok(())
    }
}
