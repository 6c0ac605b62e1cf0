//! Test utilities for the backend crate.
//!
//! In-memory implementations of every driven port plus a fixture master
//! dataset, shared by unit tests (in `src/`) and integration tests (in
//! `tests/`). Compiled for tests or with the `test-support` feature.

mod game_store;
mod harness;
mod kv;
mod masters;

pub use game_store::{GameState, InMemoryGameStore, InMemoryTransaction, StoredToken};
pub use harness::{FIXTURE_SEED, GameHarness};
pub use kv::{InMemorySessionStore, InMemoryTokenStore};
pub use masters::{
    FIXTURE_NOW, InMemoryMasterVersionStore, OPEN_GACHA_ID, StaticMasterDataSource,
    sample_master_tables,
};
