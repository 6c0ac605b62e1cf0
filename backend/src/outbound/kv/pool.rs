//! Connection pool for the shared Redis store.

use std::time::Duration;

use bb8_redis::bb8::{Pool, PooledConnection};
use bb8_redis::redis::RedisError;
use bb8_redis::RedisConnectionManager;
use tracing::debug;

/// Errors raised while building the pool or checking out a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RedisPoolError {
    /// The connection URL was rejected or the pool could not start.
    #[error("failed to build redis pool: {message}")]
    Build { message: String },

    /// No connection became available within the timeout.
    #[error("failed to get redis connection: {message}")]
    Checkout { message: String },
}

impl RedisPoolError {
    /// Create a build error with the given message.
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }

    /// Create a checkout error with the given message.
    pub fn checkout(message: impl Into<String>) -> Self {
        Self::Checkout {
            message: message.into(),
        }
    }
}

/// Configuration for the shared store pool.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    url: String,
    max_size: u32,
    connection_timeout: Duration,
}

impl RedisConfig {
    /// Defaults: 16 connections, 5 second checkout timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_size: 16,
            connection_timeout: Duration::from_secs(5),
        }
    }

    /// Set the maximum number of connections.
    #[must_use]
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the checkout timeout.
    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Connection URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Pooled multiplexed connections to the shared store.
#[derive(Clone)]
pub struct RedisPool {
    inner: Pool<RedisConnectionManager>,
}

impl RedisPool {
    /// Build a pool; connections are opened on first checkout. Must run
    /// inside a Tokio runtime, which hosts the pool's reaper task.
    ///
    /// # Errors
    ///
    /// Returns [`RedisPoolError::Build`] for an unparseable URL.
    pub fn new(config: &RedisConfig) -> Result<Self, RedisPoolError> {
        let manager = RedisConnectionManager::new(config.url.as_str())
            .map_err(|err| RedisPoolError::build(err.to_string()))?;
        let inner = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build_unchecked(manager);
        Ok(Self { inner })
    }

    /// Check out a connection.
    ///
    /// # Errors
    ///
    /// Returns [`RedisPoolError::Checkout`] when the store is unreachable or
    /// the timeout elapses.
    pub async fn get(&self) -> Result<PooledConnection<'_, RedisConnectionManager>, RedisPoolError> {
        self.inner.get().await.map_err(|err| {
            debug!(error = %err, "redis checkout failed");
            RedisPoolError::checkout(err.to_string())
        })
    }
}

/// Failure class of a Redis command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RedisFailure {
    Connection,
    Command,
}

/// Classify a command error as a lost connection or a rejected command.
pub(crate) fn classify(error: &RedisError) -> RedisFailure {
    debug!(kind = ?error.kind(), error = %error, "redis command failed");
    if error.is_io_error()
        || error.is_connection_dropped()
        || error.is_connection_refusal()
        || error.is_timeout()
    {
        RedisFailure::Connection
    } else {
        RedisFailure::Command
    }
}
