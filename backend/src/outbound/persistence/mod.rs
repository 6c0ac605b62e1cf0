//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Every per-user adapter goes through the [`ShardRouter`], which maps a
//! user id to one shard database and lazily builds that shard's `bb8` pool.
//!
//! - **Thin adapters**: implementations only translate between Diesel rows
//!   and domain types. Game rules live in the domain services.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Strongly typed errors**: Diesel and pool failures are mapped to the
//!   port's own error type.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use conquest_backend::outbound::persistence::{DieselGameStore, PoolConfig, ShardRouter};
//!
//! let router = Arc::new(ShardRouter::new(vec![
//!     PoolConfig::new("postgres://localhost/shard0"),
//!     PoolConfig::new("postgres://localhost/shard1"),
//! ])?);
//! let store = DieselGameStore::new(router);
//! ```

mod diesel_access_lookup;
mod diesel_basic_error_mapping;
mod diesel_game_store;
mod diesel_master_data_source;
mod diesel_shard_bootstrap;
mod models;
mod pool;
mod schema;
mod shard_router;

pub use diesel_access_lookup::DieselAccessLookup;
pub use diesel_game_store::{DieselGameStore, DieselTransaction};
pub use diesel_master_data_source::DieselMasterDataSource;
pub use diesel_shard_bootstrap::{DieselShardBootstrap, MIGRATIONS};
pub use pool::{DbPool, PoolConfig, PoolError};
pub use shard_router::{Shard, ShardError, ShardRouter};
