//! Port for ban and device-binding lookups.
use async_trait::async_trait;

use crate::domain::UserId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by access lookup adapters.
    pub enum AccessLookupError {
        /// Shard connection could not be established.
        Connection { message: String } => "access lookup connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } => "access lookup query failed: {message}",
    }
}

/// Reads the ban list and device bindings on the user's shard.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessLookup: Send + Sync {
    /// Whether a ban row exists for the user.
    async fn is_banned(&self, user_id: UserId) -> Result<bool, AccessLookupError>;

    /// Whether `viewer_id` is bound to the user.
    async fn has_device(&self, user_id: UserId, viewer_id: &str) -> Result<bool, AccessLookupError>;
}

/// Fixture lookup that bans nobody and accepts every device.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureAccessLookup;

#[async_trait]
impl AccessLookup for FixtureAccessLookup {
    async fn is_banned(&self, _user_id: UserId) -> Result<bool, AccessLookupError> {
        Ok(false)
    }

    async fn has_device(&self, _user_id: UserId, _viewer_id: &str) -> Result<bool, AccessLookupError> {
        Ok(true)
    }
}
