//! Port for login sessions held in the shared store.
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Session, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by session store adapters.
    pub enum SessionStoreError {
        /// Shared store connection could not be established.
        Connection { message: String } => "session store connection failed: {message}",
        /// Command failed during execution.
        Command { message: String } => "session store command failed: {message}",
        /// A stored session could not be decoded.
        Serialization { message: String } => "session store serialization failed: {message}",
    }
}

/// Stores sessions keyed by session id.
///
/// Storing a session never revokes other sessions of the same user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a session for `ttl`.
    async fn put(&self, session: &Session, ttl: Duration) -> Result<(), SessionStoreError>;

    /// Owner of a live session.
    async fn get(&self, session_id: &str) -> Result<Option<UserId>, SessionStoreError>;
}
