//! Fixture master dataset and in-memory master data ports.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::domain::ports::{
    DEFAULT_MASTER_VERSION, MasterDataSource, MasterDataSourceError, MasterVersionStore,
    MasterVersionStoreError,
};
use crate::domain::{
    GachaItemMaster, GachaMaster, ItemKind, ItemMaster, LoginBonusMaster, LoginBonusRewardMaster,
    MasterTables, PresentAllMaster, UserId,
};

/// Request time used by fixtures: 2023-11-15 07:13:20 at +09:00.
pub const FIXTURE_NOW: i64 = 1_700_000_000;

/// Gacha open at [`FIXTURE_NOW`].
pub const OPEN_GACHA_ID: i64 = 37;

const OPEN_FROM: i64 = 1_600_000_000;
const OPEN_UNTIL: i64 = 2_000_000_000;
const CLOSED_AT: i64 = 1_650_000_000;

fn item(id: i64, item_type: ItemKind, name: &str) -> ItemMaster {
    ItemMaster {
        id,
        item_type,
        name: name.to_owned(),
        description: format!("{name} for tests"),
        amount_per_sec: None,
        max_level: None,
        max_amount_per_sec: None,
        base_exp_per_level: None,
        gained_exp: None,
        shortening_min: None,
        created_at: OPEN_FROM,
    }
}

fn card(id: i64, name: &str, base: i64, max: i64, max_level: i32, base_exp: i64) -> ItemMaster {
    ItemMaster {
        amount_per_sec: Some(base),
        max_amount_per_sec: Some(max),
        max_level: Some(max_level),
        base_exp_per_level: Some(base_exp),
        ..item(id, ItemKind::Card, name)
    }
}

fn material(id: i64, item_type: ItemKind, name: &str, gained_exp: Option<i64>) -> ItemMaster {
    ItemMaster {
        gained_exp,
        shortening_min: (item_type == ItemKind::TimerMaterial).then_some(60),
        ..item(id, item_type, name)
    }
}

fn prize(id: i64, gacha_id: i64, item_type: ItemKind, item_id: i64, amount: i64, weight: i64) -> GachaItemMaster {
    GachaItemMaster {
        id,
        gacha_id,
        item_type,
        item_id,
        amount,
        weight,
        created_at: OPEN_FROM,
    }
}

fn bonus(id: i64, end_at: i64, column_count: i32, looped: bool) -> LoginBonusMaster {
    LoginBonusMaster {
        id,
        start_at: OPEN_FROM,
        end_at,
        column_count,
        looped,
        created_at: OPEN_FROM,
    }
}

fn step(id: i64, login_bonus_id: i64, reward_sequence: i32, item_type: ItemKind, item_id: i64, amount: i64) -> LoginBonusRewardMaster {
    LoginBonusRewardMaster {
        id,
        login_bonus_id,
        reward_sequence,
        item_type,
        item_id,
        amount,
        created_at: OPEN_FROM,
    }
}

fn present_all(id: i64, end_at: i64, item_type: ItemKind, item_id: i64, amount: i64, message: &str) -> PresentAllMaster {
    PresentAllMaster {
        id,
        registered_start_at: OPEN_FROM,
        registered_end_at: end_at,
        item_type,
        item_id,
        amount,
        present_message: message.to_owned(),
        created_at: OPEN_FROM,
    }
}

/// A small but complete master dataset.
///
/// - Items: coin `1`; cards `2` (10→50 per sec, max level 5, 100 exp) and
///   `3` (20→100, max level 2, 200 exp); exp materials `11` (10 exp) and
///   `12` (50 exp); timer material `21`.
/// - Gachas: `37` open with prizes `1` coin ×100 (weight 60), `2` card 2
///   (30) and `3` exp 11 ×5 (10); `38` closed.
/// - Login bonuses: `1` looping over 3 steps (coin 100, exp 11 ×3, card 2);
///   `2` non-looping over 2 steps (coin 50, timer 21); `3` closed.
/// - Global presents: `1` coin ×500 and `2` exp 12 ×2 open; `3` closed.
pub fn sample_master_tables() -> MasterTables {
    MasterTables {
        items: vec![
            item(1, ItemKind::Coin, "ISU coin"),
            card(2, "Hammer", 10, 50, 5, 100),
            card(3, "Drill", 20, 100, 2, 200),
            material(11, ItemKind::ExpMaterial, "Small grease", Some(10)),
            material(12, ItemKind::ExpMaterial, "Large grease", Some(50)),
            material(21, ItemKind::TimerMaterial, "Hourglass", None),
        ],
        gachas: vec![
            GachaMaster {
                id: OPEN_GACHA_ID,
                name: "standard".to_owned(),
                start_at: OPEN_FROM,
                end_at: OPEN_UNTIL,
                display_order: 1,
                created_at: OPEN_FROM,
            },
            GachaMaster {
                id: 38,
                name: "retired".to_owned(),
                start_at: OPEN_FROM,
                end_at: CLOSED_AT,
                display_order: 2,
                created_at: OPEN_FROM,
            },
        ],
        gacha_items: vec![
            prize(1, OPEN_GACHA_ID, ItemKind::Coin, 1, 100, 60),
            prize(2, OPEN_GACHA_ID, ItemKind::Card, 2, 1, 30),
            prize(3, OPEN_GACHA_ID, ItemKind::ExpMaterial, 11, 5, 10),
            prize(4, 38, ItemKind::Card, 3, 1, 1),
        ],
        login_bonuses: vec![
            bonus(1, OPEN_UNTIL, 3, true),
            bonus(2, OPEN_UNTIL, 2, false),
            bonus(3, CLOSED_AT, 1, true),
        ],
        login_bonus_rewards: vec![
            step(1, 1, 1, ItemKind::Coin, 1, 100),
            step(2, 1, 2, ItemKind::ExpMaterial, 11, 3),
            step(3, 1, 3, ItemKind::Card, 2, 1),
            step(4, 2, 1, ItemKind::Coin, 1, 50),
            step(5, 2, 2, ItemKind::TimerMaterial, 21, 1),
            step(6, 3, 1, ItemKind::Coin, 1, 1),
        ],
        present_alls: vec![
            present_all(1, OPEN_UNTIL, ItemKind::Coin, 1, 500, "welcome"),
            present_all(2, OPEN_UNTIL, ItemKind::ExpMaterial, 12, 2, "grease for everyone"),
            present_all(3, CLOSED_AT, ItemKind::Card, 3, 1, "expired campaign"),
        ],
    }
}

/// Master version store held in memory.
#[derive(Debug)]
pub struct InMemoryMasterVersionStore {
    version: RwLock<String>,
}

impl InMemoryMasterVersionStore {
    /// Store starting at `version`.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: RwLock::new(version.into()),
        }
    }
}

impl Default for InMemoryMasterVersionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MASTER_VERSION)
    }
}

#[async_trait]
impl MasterVersionStore for InMemoryMasterVersionStore {
    async fn current_version(&self) -> Result<String, MasterVersionStoreError> {
        Ok(self
            .version
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn publish(&self, version: &str) -> Result<(), MasterVersionStoreError> {
        *self.version.write().unwrap_or_else(PoisonError::into_inner) = version.to_owned();
        Ok(())
    }
}

/// Master data source serving replaceable tables and counting loads.
#[derive(Debug)]
pub struct StaticMasterDataSource {
    tables: RwLock<MasterTables>,
    loads: AtomicUsize,
}

impl StaticMasterDataSource {
    /// Serve `tables` until replaced.
    pub fn new(tables: MasterTables) -> Self {
        Self {
            tables: RwLock::new(tables),
            loads: AtomicUsize::new(0),
        }
    }

    /// Serve `tables` from the next load on.
    pub fn replace(&self, tables: MasterTables) {
        *self.tables.write().unwrap_or_else(PoisonError::into_inner) = tables;
    }

    /// Number of completed loads.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MasterDataSource for StaticMasterDataSource {
    async fn load(&self, _shard_key: UserId) -> Result<MasterTables, MasterDataSourceError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}
