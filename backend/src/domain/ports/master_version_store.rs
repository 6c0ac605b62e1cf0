//! Port for the authoritative master-data version marker.
use async_trait::async_trait;

use super::define_port_error;

/// Version assumed when none has been published yet.
pub const DEFAULT_MASTER_VERSION: &str = "1";

define_port_error! {
    /// Errors raised by master version store adapters.
    pub enum MasterVersionStoreError {
        /// Shared store connection could not be established.
        Connection { message: String } => "master version store connection failed: {message}",
        /// Command failed during execution.
        Command { message: String } => "master version store command failed: {message}",
    }
}

/// Holds the single authoritative master version string.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MasterVersionStore: Send + Sync {
    /// Current version, or [`DEFAULT_MASTER_VERSION`] when unset.
    async fn current_version(&self) -> Result<String, MasterVersionStoreError>;

    /// Replace the authoritative version.
    async fn publish(&self, version: &str) -> Result<(), MasterVersionStoreError>;
}

/// Fixture store pinned to one version.
#[derive(Debug, Clone)]
pub struct FixtureMasterVersionStore {
    version: String,
}

impl FixtureMasterVersionStore {
    /// Serve `version` and ignore publishes.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

impl Default for FixtureMasterVersionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MASTER_VERSION)
    }
}

#[async_trait]
impl MasterVersionStore for FixtureMasterVersionStore {
    async fn current_version(&self) -> Result<String, MasterVersionStoreError> {
        Ok(self.version.clone())
    }

    async fn publish(&self, _version: &str) -> Result<(), MasterVersionStoreError> {
        Ok(())
    }
}
