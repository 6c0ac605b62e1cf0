//! Game backend library.
//!
//! `domain` holds the game rules and the transaction engine, `outbound`
//! the sharded PostgreSQL and Redis adapters, and `inbound::http` the
//! request helpers shared by an HTTP front end. Wiring them into a
//! process is left to the binary that embeds this crate.

pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::{AppSettings, SettingsError};
