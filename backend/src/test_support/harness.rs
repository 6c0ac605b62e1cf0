//! A [`GameService`] wired to in-memory ports.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::domain::{
    AccessRegistry, CreateUserRequest, CreateUserResponse, Error, GamePorts, GameService,
    GameSettings, IdGenerator, ItemKind, MasterDataCache, MasterTables, UserId, UserItem,
};

use super::{
    FIXTURE_NOW, InMemoryGameStore, InMemoryMasterVersionStore, InMemorySessionStore,
    InMemoryTokenStore, StaticMasterDataSource, sample_master_tables,
};

/// Seed of the gacha random source.
pub const FIXTURE_SEED: u64 = 0x15_c0_4e;

/// Game service plus handles on every in-memory port behind it.
pub struct GameHarness {
    pub service: GameService<InMemoryGameStore>,
    pub store: Arc<InMemoryGameStore>,
    pub versions: Arc<InMemoryMasterVersionStore>,
    pub source: Arc<StaticMasterDataSource>,
    pub sessions: Arc<InMemorySessionStore>,
    pub tokens: Arc<InMemoryTokenStore>,
    pub masters: Arc<MasterDataCache>,
    pub ids: Arc<IdGenerator>,
}

impl Default for GameHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl GameHarness {
    /// Harness over [`sample_master_tables`] with default settings.
    pub fn new() -> Self {
        Self::build(sample_master_tables(), GameSettings::default())
    }

    /// Harness over custom master tables.
    pub fn with_tables(tables: MasterTables) -> Self {
        Self::build(tables, GameSettings::default())
    }

    /// Harness over the sample tables with custom settings.
    pub fn with_settings(settings: GameSettings) -> Self {
        Self::build(sample_master_tables(), settings)
    }

    fn build(tables: MasterTables, settings: GameSettings) -> Self {
        let store = Arc::new(InMemoryGameStore::new());
        let versions = Arc::new(InMemoryMasterVersionStore::default());
        let source = Arc::new(StaticMasterDataSource::new(tables));
        let sessions = Arc::new(InMemorySessionStore::new());
        let tokens = Arc::new(InMemoryTokenStore::new());
        let masters = Arc::new(MasterDataCache::new(versions.clone(), source.clone()));
        let ids = Arc::new(IdGenerator::default());
        let ports = GamePorts {
            store: Arc::clone(&store),
            masters: Arc::clone(&masters),
            access: Arc::new(AccessRegistry::new(store.clone())),
            sessions: sessions.clone(),
            tokens: tokens.clone(),
            ids: Arc::clone(&ids),
        };
        let service = GameService::with_rng(ports, settings, SmallRng::seed_from_u64(FIXTURE_SEED));
        Self {
            service,
            store,
            versions,
            source,
            sessions,
            tokens,
            masters,
            ids,
        }
    }

    /// Register `viewer_id` on an iOS device at [`FIXTURE_NOW`].
    pub async fn register(&self, viewer_id: &str) -> Result<CreateUserResponse, Error> {
        self.service
            .create_user(
                CreateUserRequest {
                    viewer_id: viewer_id.to_owned(),
                    platform_type: 1,
                },
                FIXTURE_NOW,
            )
            .await
    }

    /// Set a user's coin balance.
    pub fn fund(&self, user_id: UserId, coins: i64) {
        self.store.update(|state| {
            if let Some(user) = state.users.get_mut(&user_id) {
                user.isu_coin = coins;
            }
        });
    }

    /// Give a user a fresh material stack and return its row id.
    pub fn stock(&self, user_id: UserId, item_type: ItemKind, item_id: i64, amount: i64) -> i64 {
        let id = self.ids.next_id();
        self.store.update(|state| {
            state.items.push(UserItem {
                id,
                user_id,
                item_type,
                item_id,
                amount,
                created_at: FIXTURE_NOW,
                updated_at: FIXTURE_NOW,
            });
        });
        id
    }
}
