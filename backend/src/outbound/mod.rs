//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: sharded PostgreSQL adapters using Diesel
//! - **kv**: Redis adapters for the master version, sessions and tokens
//!
//! Adapters are thin translators between domain types and infrastructure
//! representations. They contain no game rules.

pub mod kv;
pub mod persistence;
