//! Port for single-use action tokens.
//!
//! Each user holds at most one live token: issuing replaces whatever was
//! stored before. Callers activate a token only after its audit row has
//! committed. Consumption must match and delete in one atomic step so
//! two concurrent requests cannot both succeed with the same token.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{OneTimeTokenRecord, TokenType, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by one-time token store adapters.
    pub enum OneTimeTokenStoreError {
        /// Shared store connection could not be established.
        Connection { message: String } => "token store connection failed: {message}",
        /// Command failed during execution.
        Command { message: String } => "token store command failed: {message}",
    }
}

/// Outcome of a consumption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenConsumption {
    /// The token matched, was live, and is now spent.
    Consumed,
    /// The token matched but had expired; it has been removed.
    Expired,
    /// No matching token was stored.
    Invalid,
}

/// Issues and consumes one-time tokens.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OneTimeTokenStore: Send + Sync {
    /// Make `record` the user's live token, replacing any token they held.
    ///
    /// `record.expired_at` is compared against request time on consumption;
    /// `ttl` bounds how long the store keeps the entry.
    async fn issue(&self, record: &OneTimeTokenRecord, ttl: Duration) -> Result<(), OneTimeTokenStoreError>;

    /// Atomically match and delete a token.
    async fn consume(
        &self,
        user_id: UserId,
        token: &str,
        token_type: TokenType,
        now: i64,
    ) -> Result<TokenConsumption, OneTimeTokenStoreError>;
}
