//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod access_lookup;
mod game_store;
mod master_data_source;
mod master_version_store;
mod one_time_token_store;
mod session_store;
mod shard_bootstrap;

#[cfg(test)]
pub use access_lookup::MockAccessLookup;
pub use access_lookup::{AccessLookup, AccessLookupError, FixtureAccessLookup};
pub use game_store::{GameStore, GameStoreError, GameTransaction};
#[cfg(test)]
pub use master_data_source::MockMasterDataSource;
pub use master_data_source::{MasterDataSource, MasterDataSourceError};
#[cfg(test)]
pub use master_version_store::MockMasterVersionStore;
pub use master_version_store::{
    DEFAULT_MASTER_VERSION, FixtureMasterVersionStore, MasterVersionStore, MasterVersionStoreError,
};
#[cfg(test)]
pub use one_time_token_store::MockOneTimeTokenStore;
pub use one_time_token_store::{OneTimeTokenStore, OneTimeTokenStoreError, TokenConsumption};
#[cfg(test)]
pub use session_store::MockSessionStore;
pub use session_store::{SessionStore, SessionStoreError};
#[cfg(test)]
pub use shard_bootstrap::MockShardBootstrap;
pub use shard_bootstrap::{ShardBootstrap, ShardBootstrapError};
