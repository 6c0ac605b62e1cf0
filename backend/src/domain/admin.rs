//! Administrative operations spanning every shard.

use std::sync::Arc;

use futures_util::future::join_all;
use serde_json::json;
use tracing::{info, warn};

use super::game::map_master_error;
use super::ports::{ShardBootstrap, ShardBootstrapError};
use super::{Error, MasterDataCache, reason};

/// Schema bootstrap and master version publication.
#[derive(Clone)]
pub struct AdminService {
    bootstrap: Arc<dyn ShardBootstrap>,
    masters: Arc<MasterDataCache>,
}

impl AdminService {
    /// Create a service over the shard bootstrapper and the master cache.
    pub fn new(bootstrap: Arc<dyn ShardBootstrap>, masters: Arc<MasterDataCache>) -> Self {
        Self { bootstrap, masters }
    }

    /// Apply the schema to every shard concurrently.
    ///
    /// Every shard is attempted even when some fail; the error lists the
    /// shards that did not complete.
    pub async fn initialize(&self) -> Result<(), Error> {
        let shards = self.bootstrap.shard_count();
        let results = join_all((0..shards).map(|shard| self.bootstrap.apply_schema(shard))).await;
        let failures: Vec<ShardBootstrapError> = results.into_iter().filter_map(Result::err).collect();
        if failures.is_empty() {
            info!(shards, "schema applied to every shard");
            return Ok(());
        }
        for failure in &failures {
            warn!(error = %failure, "shard bootstrap failed");
        }
        let failed: Vec<usize> = failures.iter().map(failed_shard).collect();
        Err(Error::service_unavailable("shard bootstrap failed")
            .with_details(json!({ "failedShards": failed })))
    }

    /// Publish a new authoritative master version.
    pub async fn publish_master_version(&self, version: &str) -> Result<(), Error> {
        if version.trim().is_empty() {
            return Err(Error::invalid_request(reason::INVALID_MASTER_VERSION));
        }
        self.masters
            .publish_version(version)
            .await
            .map_err(map_master_error)
    }
}

fn failed_shard(error: &ShardBootstrapError) -> usize {
    match error {
        ShardBootstrapError::Connection { shard, .. } | ShardBootstrapError::Migration { shard, .. } => *shard,
    }
}
