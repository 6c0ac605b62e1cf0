//! Process-local cache of master tables keyed by the authoritative version.
//!
//! The cache holds one immutable [`MasterSnapshot`]. When the version in the
//! shared store differs from the snapshot's, every table is reloaded and the
//! new snapshot replaces the old one in a single pointer swap, so readers
//! see either the old tables or the new ones and never a mix. Concurrent
//! reloads for the same version collapse behind a mutex that re-checks the
//! snapshot version before loading.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;
use tracing::{debug, info};

use super::ports::{
    MasterDataSource, MasterDataSourceError, MasterVersionStore, MasterVersionStoreError,
};
use super::{
    GachaItemMaster, GachaMaster, ItemMaster, LoginBonusMaster, LoginBonusRewardMaster,
    MasterTables, PresentAllMaster, UserId,
};

/// Failures while resolving the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MasterCacheError {
    /// The authoritative version could not be read or written.
    #[error(transparent)]
    Version(#[from] MasterVersionStoreError),
    /// The master tables could not be loaded.
    #[error(transparent)]
    Source(#[from] MasterDataSourceError),
}

/// Immutable master tables for one version, with lookup indexes.
#[derive(Debug)]
pub struct MasterSnapshot {
    version: String,
    tables: MasterTables,
    items_by_id: HashMap<i64, usize>,
    prizes_by_gacha: HashMap<i64, Vec<usize>>,
    rewards_by_step: HashMap<(i64, i32), usize>,
}

fn active(start: i64, end: i64, as_of: i64) -> bool {
    start <= as_of && as_of <= end
}

impl MasterSnapshot {
    /// Index `tables` for `version`.
    pub fn build(version: impl Into<String>, tables: MasterTables) -> Self {
        let items_by_id = tables
            .items
            .iter()
            .enumerate()
            .map(|(idx, item)| (item.id, idx))
            .collect();
        let mut prizes_by_gacha: HashMap<i64, Vec<usize>> = HashMap::new();
        for (idx, prize) in tables.gacha_items.iter().enumerate() {
            prizes_by_gacha.entry(prize.gacha_id).or_default().push(idx);
        }
        let rewards_by_step = tables
            .login_bonus_rewards
            .iter()
            .enumerate()
            .map(|(idx, reward)| ((reward.login_bonus_id, reward.reward_sequence), idx))
            .collect();
        Self {
            version: version.into(),
            tables,
            items_by_id,
            prizes_by_gacha,
            rewards_by_step,
        }
    }

    /// Version these tables were loaded for.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Item master by id.
    pub fn item(&self, id: i64) -> Option<&ItemMaster> {
        self.items_by_id
            .get(&id)
            .and_then(|idx| self.tables.items.get(*idx))
    }

    /// Login bonus schedules active at `as_of`.
    pub fn active_login_bonuses(&self, as_of: i64) -> Vec<&LoginBonusMaster> {
        self.tables
            .login_bonuses
            .iter()
            .filter(|bonus| active(bonus.start_at, bonus.end_at, as_of))
            .collect()
    }

    /// Reward configured for one step of a login bonus.
    pub fn login_bonus_reward(&self, login_bonus_id: i64, sequence: i32) -> Option<&LoginBonusRewardMaster> {
        self.rewards_by_step
            .get(&(login_bonus_id, sequence))
            .and_then(|idx| self.tables.login_bonus_rewards.get(*idx))
    }

    /// Gachas active at `as_of`, in display order.
    pub fn active_gachas(&self, as_of: i64) -> Vec<&GachaMaster> {
        self.tables
            .gachas
            .iter()
            .filter(|gacha| active(gacha.start_at, gacha.end_at, as_of))
            .collect()
    }

    /// Gacha by id, only while active at `as_of`.
    pub fn gacha(&self, id: i64, as_of: i64) -> Option<&GachaMaster> {
        self.tables
            .gachas
            .iter()
            .find(|gacha| gacha.id == id && active(gacha.start_at, gacha.end_at, as_of))
    }

    /// Prize table of a gacha, ordered by prize id.
    pub fn gacha_prizes(&self, gacha_id: i64) -> Vec<&GachaItemMaster> {
        self.prizes_by_gacha
            .get(&gacha_id)
            .map(|indexes| {
                indexes
                    .iter()
                    .filter_map(|idx| self.tables.gacha_items.get(*idx))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Global presents whose window contains `as_of`.
    pub fn active_present_alls(&self, as_of: i64) -> Vec<&PresentAllMaster> {
        self.tables
            .present_alls
            .iter()
            .filter(|present| active(present.registered_start_at, present.registered_end_at, as_of))
            .collect()
    }
}

/// Versioned master data cache shared by request workers.
pub struct MasterDataCache {
    versions: Arc<dyn MasterVersionStore>,
    source: Arc<dyn MasterDataSource>,
    snapshot: RwLock<Option<Arc<MasterSnapshot>>>,
    reload_lock: Mutex<()>,
}

impl MasterDataCache {
    /// Create an empty cache; the first lookup triggers a load.
    pub fn new(versions: Arc<dyn MasterVersionStore>, source: Arc<dyn MasterDataSource>) -> Self {
        Self {
            versions,
            source,
            snapshot: RwLock::new(None),
            reload_lock: Mutex::new(()),
        }
    }

    /// Authoritative version, reloading the cache first when it is stale.
    pub async fn current_version(&self, shard_key: UserId) -> Result<String, MasterCacheError> {
        let snapshot = self.fresh_snapshot(shard_key).await?;
        Ok(snapshot.version().to_owned())
    }

    /// Snapshot matching the authoritative version.
    pub async fn fresh_snapshot(&self, shard_key: UserId) -> Result<Arc<MasterSnapshot>, MasterCacheError> {
        let version = self.versions.current_version().await?;
        if let Some(snapshot) = self.cached(&version) {
            return Ok(snapshot);
        }
        self.reload(&version, shard_key).await
    }

    /// Load every table for `version` and swap the snapshot in.
    ///
    /// Returns the cached snapshot without loading when another caller has
    /// already installed `version`.
    pub async fn reload(&self, version: &str, shard_key: UserId) -> Result<Arc<MasterSnapshot>, MasterCacheError> {
        let _guard = self.reload_lock.lock().await;
        if let Some(snapshot) = self.cached(version) {
            debug!(version, "master data already reloaded by a concurrent caller");
            return Ok(snapshot);
        }
        let tables = self.source.load(shard_key).await?;
        let snapshot = Arc::new(MasterSnapshot::build(version, tables));
        self.install(Arc::clone(&snapshot));
        info!(version, "master data reloaded");
        Ok(snapshot)
    }

    /// Write a new authoritative version; the next lookup reloads.
    pub async fn publish_version(&self, version: &str) -> Result<(), MasterCacheError> {
        self.versions.publish(version).await?;
        info!(version, "master version published");
        Ok(())
    }

    /// Currently installed snapshot, without checking the version.
    pub fn installed(&self) -> Option<Arc<MasterSnapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn cached(&self, version: &str) -> Option<Arc<MasterSnapshot>> {
        self.installed().filter(|snapshot| snapshot.version() == version)
    }

    fn install(&self, snapshot: Arc<MasterSnapshot>) {
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
    }
}

#[cfg(test)]
#[path = "master_cache_tests.rs"]
mod tests;
