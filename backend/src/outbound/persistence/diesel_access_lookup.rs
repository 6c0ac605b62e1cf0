//! PostgreSQL-backed ban and device lookups.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::UserId;
use crate::domain::ports::{AccessLookup, AccessLookupError};

use super::diesel_basic_error_mapping::{
    map_basic_diesel_error, map_basic_pool_error, map_shard_error,
};
use super::pool::DbPool;
use super::schema::{user_bans, user_devices};
use super::shard_router::ShardRouter;

fn map_diesel_error(error: diesel::result::Error) -> AccessLookupError {
    map_basic_diesel_error(error, AccessLookupError::query, AccessLookupError::connection)
}

/// Diesel-backed implementation of the [`AccessLookup`] port.
#[derive(Clone)]
pub struct DieselAccessLookup {
    router: Arc<ShardRouter>,
}

impl DieselAccessLookup {
    /// Create a lookup reading through `router`.
    pub fn new(router: Arc<ShardRouter>) -> Self {
        Self { router }
    }

    async fn pool_for(&self, user_id: UserId) -> Result<&DbPool, AccessLookupError> {
        let shard = self
            .router
            .shard_for(user_id)
            .map_err(|error| map_shard_error(error, AccessLookupError::connection))?;
        shard
            .pool()
            .await
            .map_err(|error| map_shard_error(error, AccessLookupError::connection))
    }
}

#[async_trait]
impl AccessLookup for DieselAccessLookup {
    async fn is_banned(&self, user_id: UserId) -> Result<bool, AccessLookupError> {
        let mut conn = self
            .pool_for(user_id)
            .await?
            .get()
            .await
            .map_err(|error| map_basic_pool_error(&error, AccessLookupError::connection))?;
        diesel::select(exists(
            user_bans::table.filter(user_bans::user_id.eq(user_id.as_db())),
        ))
        .get_result(&mut conn)
        .await
        .map_err(map_diesel_error)
    }

    async fn has_device(&self, user_id: UserId, viewer_id: &str) -> Result<bool, AccessLookupError> {
        let mut conn = self
            .pool_for(user_id)
            .await?
            .get()
            .await
            .map_err(|error| map_basic_pool_error(&error, AccessLookupError::connection))?;
        diesel::select(exists(
            user_devices::table
                .filter(user_devices::user_id.eq(user_id.as_db()))
                .filter(user_devices::platform_id.eq(viewer_id)),
        ))
        .get_result(&mut conn)
        .await
        .map_err(map_diesel_error)
    }
}
