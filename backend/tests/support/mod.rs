//! Helpers shared by the adapter integration suites.

pub mod embedded_shard;
