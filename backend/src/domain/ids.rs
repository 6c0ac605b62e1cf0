//! Identifier newtypes and the process-local snowflake generator.
//!
//! Every persisted row is keyed by a roughly time-ordered 63-bit identifier
//! built from a millisecond timestamp, the configured node id and a
//! per-millisecond sequence. User ids double as shard keys.

use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// 2023-01-01T00:00:00Z in milliseconds; keeps generated ids well below `i64::MAX`.
const EPOCH_MILLIS: i64 = 1_672_531_200_000;
const NODE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const MAX_NODE_ID: u16 = (1 << NODE_BITS) - 1;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_MASK: u64 = (1 << 41) - 1;

/// Identifier of a user; also the shard key for all of the user's rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Wrap a raw identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw identifier value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl UserId {
    /// Value as stored in signed `BIGINT` columns.
    #[expect(
        clippy::cast_possible_wrap,
        reason = "generated ids never use the sign bit"
    )]
    pub const fn as_db(self) -> i64 {
        self.0 as i64
    }

    /// Rebuild an identifier from a signed database column.
    pub const fn from_db(raw: i64) -> Self {
        Self(raw.unsigned_abs())
    }
}

/// Errors raised while building an [`IdGenerator`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdGeneratorError {
    /// Node ids must fit in the reserved bit range.
    #[error("node id {node_id} exceeds the maximum of {max}")]
    NodeIdOutOfRange { node_id: u16, max: u16 },
}

/// Generator of unique, roughly time-ordered identifiers.
///
/// Safe to share between request workers; uniqueness across processes relies
/// on each process being configured with a distinct node id.
#[derive(Debug)]
pub struct IdGenerator {
    node_id: u64,
    state: Mutex<GeneratorState>,
    fallback: AtomicU64,
}

#[derive(Debug, Default)]
struct GeneratorState {
    last_millis: i64,
    sequence: u64,
}

impl Default for IdGenerator {
    /// Generator for node 0.
    fn default() -> Self {
        Self {
            node_id: 0,
            state: Mutex::new(GeneratorState::default()),
            fallback: AtomicU64::new(0),
        }
    }
}

impl IdGenerator {
    /// Create a generator for the given node.
    pub fn new(node_id: u16) -> Result<Self, IdGeneratorError> {
        if node_id > MAX_NODE_ID {
            return Err(IdGeneratorError::NodeIdOutOfRange {
                node_id,
                max: MAX_NODE_ID,
            });
        }
        Ok(Self {
            node_id: u64::from(node_id),
            state: Mutex::new(GeneratorState::default()),
            fallback: AtomicU64::new(0),
        })
    }

    /// Produce the next row identifier.
    pub fn next_id(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let Ok(mut state) = self.state.lock() else {
            // A poisoned lock only means another thread panicked mid-update;
            // keep ids unique by drawing from a separate counter.
            return self.compose(now, self.fallback.fetch_add(1, Ordering::Relaxed));
        };

        let millis = now.max(state.last_millis);
        if millis == state.last_millis {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                // Sequence exhausted for this millisecond: borrow the next one.
                state.last_millis = millis + 1;
                return self.compose(state.last_millis, 0);
            }
        } else {
            state.last_millis = millis;
            state.sequence = 0;
        }
        self.compose(state.last_millis, state.sequence)
    }

    /// Produce the next identifier as a [`UserId`].
    pub fn next_user_id(&self) -> UserId {
        UserId(self.next_id().unsigned_abs())
    }

    #[expect(
        clippy::cast_possible_wrap,
        reason = "timestamp is masked to 41 bits so the composed id stays below 2^63"
    )]
    fn compose(&self, millis: i64, sequence: u64) -> i64 {
        let elapsed = u64::try_from(millis - EPOCH_MILLIS).unwrap_or(0) & TIMESTAMP_MASK;
        ((elapsed << (NODE_BITS + SEQUENCE_BITS))
            | (self.node_id << SEQUENCE_BITS)
            | (sequence & SEQUENCE_MASK)) as i64
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;
    use rstest::rstest;

    #[rstest]
    fn rejects_node_ids_outside_bit_range() {
        let err = IdGenerator::new(MAX_NODE_ID + 1).expect_err("node id too large");
        assert!(matches!(err, IdGeneratorError::NodeIdOutOfRange { .. }));
    }

    #[rstest]
    fn ids_are_unique_and_increasing() {
        let generator = IdGenerator::new(7).expect("valid node id");
        let ids: Vec<i64> = (0..10_000).map(|_| generator.next_id()).collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[rstest]
    fn ids_are_positive_and_carry_the_node() {
        let generator = IdGenerator::new(MAX_NODE_ID).expect("valid node id");
        let id = generator.next_id();
        assert!(id > 0);
        assert_eq!((id >> SEQUENCE_BITS) & i64::from(MAX_NODE_ID), i64::from(MAX_NODE_ID));
    }

    #[rstest]
    fn user_ids_round_trip_through_database_columns() {
        let generator = IdGenerator::new(3).expect("valid node id");
        let user_id = generator.next_user_id();
        assert_eq!(UserId::from_db(user_id.as_db()), user_id);
    }

    #[rstest]
    fn concurrent_callers_never_collide() {
        let generator = Arc::new(IdGenerator::new(1).expect("valid node id"));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || (0..2_000).map(|_| generator.next_id()).collect::<Vec<_>>())
            })
            .collect();
        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().expect("worker finished") {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
    }
}
