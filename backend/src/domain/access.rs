//! Memoising ban and device-binding checks.
//!
//! Only positive answers are cached: bans are never lifted in-process and a
//! device binding is write-once, while a negative answer may turn positive
//! once the row is written.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock};

use super::UserId;
use super::ports::{AccessLookup, AccessLookupError};

/// Per-process ban and device registry over an [`AccessLookup`].
pub struct AccessRegistry {
    lookup: Arc<dyn AccessLookup>,
    banned: RwLock<HashSet<UserId>>,
    devices: RwLock<HashSet<(UserId, String)>>,
}

impl AccessRegistry {
    /// Create an empty registry.
    pub fn new(lookup: Arc<dyn AccessLookup>) -> Self {
        Self {
            lookup,
            banned: RwLock::new(HashSet::new()),
            devices: RwLock::new(HashSet::new()),
        }
    }

    /// Whether the user is banned.
    pub async fn is_banned(&self, user_id: UserId) -> Result<bool, AccessLookupError> {
        if contains(&self.banned, &user_id) {
            return Ok(true);
        }
        let banned = self.lookup.is_banned(user_id).await?;
        if banned {
            insert(&self.banned, user_id);
        }
        Ok(banned)
    }

    /// Whether `viewer_id` is bound to the user.
    pub async fn is_registered_device(
        &self,
        user_id: UserId,
        viewer_id: &str,
    ) -> Result<bool, AccessLookupError> {
        let key = (user_id, viewer_id.to_owned());
        if contains(&self.devices, &key) {
            return Ok(true);
        }
        let registered = self.lookup.has_device(user_id, viewer_id).await?;
        if registered {
            insert(&self.devices, key);
        }
        Ok(registered)
    }

    /// Remember a binding written by this process.
    pub fn remember_device(&self, user_id: UserId, viewer_id: &str) {
        insert(&self.devices, (user_id, viewer_id.to_owned()));
    }
}

fn contains<T: Eq + Hash>(set: &RwLock<HashSet<T>>, value: &T) -> bool {
    set.read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(value)
}

fn insert<T: Eq + Hash>(set: &RwLock<HashSet<T>>, value: T) {
    set.write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(value);
}
