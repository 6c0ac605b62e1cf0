//! Redis-backed one-time tokens.
//!
//! Each user holds one hash under `one_time_token:{user_id}` with the token,
//! its type and its expiry. Issuing overwrites the hash. Consumption runs a
//! Lua script that compares and deletes in one step, so two requests racing
//! on the same token cannot both succeed.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::redis::{self, RedisError, Script};
use tracing::debug;

use crate::domain::ports::{OneTimeTokenStore, OneTimeTokenStoreError, TokenConsumption};
use crate::domain::{OneTimeTokenRecord, TokenType, UserId};

use super::pool::{RedisFailure, RedisPool, RedisPoolError, classify};
use super::token_key;

/// Returns 1 when consumed, 2 when the matching token had expired, 0 when it
/// does not match. A matching token is deleted either way.
const CONSUME_SCRIPT: &str = r"
local stored = redis.call('HMGET', KEYS[1], 'token', 'token_type', 'expires_at')
if not stored[1] or stored[1] ~= ARGV[1] or stored[2] ~= ARGV[2] then
  return 0
end
redis.call('DEL', KEYS[1])
if tonumber(stored[3]) < tonumber(ARGV[3]) then
  return 2
end
return 1
";

fn map_pool_error(error: RedisPoolError) -> OneTimeTokenStoreError {
    OneTimeTokenStoreError::connection(error.to_string())
}

fn map_redis_error(error: &RedisError) -> OneTimeTokenStoreError {
    match classify(error) {
        RedisFailure::Connection => OneTimeTokenStoreError::connection(error.to_string()),
        RedisFailure::Command => OneTimeTokenStoreError::command(error.to_string()),
    }
}

fn consumption_from_reply(reply: i64) -> TokenConsumption {
    match reply {
        1 => TokenConsumption::Consumed,
        2 => TokenConsumption::Expired,
        _ => TokenConsumption::Invalid,
    }
}

/// One live token per user, consumed atomically.
#[derive(Clone)]
pub struct RedisTokenStore {
    pool: RedisPool,
    consume: Script,
}

impl RedisTokenStore {
    /// Create a store over `pool`.
    pub fn new(pool: RedisPool) -> Self {
        Self {
            pool,
            consume: Script::new(CONSUME_SCRIPT),
        }
    }
}

#[async_trait]
impl OneTimeTokenStore for RedisTokenStore {
    async fn issue(&self, record: &OneTimeTokenRecord, ttl: Duration) -> Result<(), OneTimeTokenStoreError> {
        let key = token_key(record.user_id);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let () = redis::pipe()
            .atomic()
            .del(&key)
            .ignore()
            .hset_multiple(
                &key,
                &[
                    ("token", record.token.clone()),
                    ("token_type", record.token_type.as_i32().to_string()),
                    ("expires_at", record.expired_at.to_string()),
                ],
            )
            .ignore()
            .expire(&key, i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1))
            .ignore()
            .query_async(&mut *conn)
            .await
            .map_err(|err| map_redis_error(&err))?;
        debug!(user_id = %record.user_id, token_type = ?record.token_type, "one-time token issued");
        Ok(())
    }

    async fn consume(
        &self,
        user_id: UserId,
        token: &str,
        token_type: TokenType,
        now: i64,
    ) -> Result<TokenConsumption, OneTimeTokenStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let reply: i64 = self
            .consume
            .key(token_key(user_id))
            .arg(token)
            .arg(token_type.as_i32())
            .arg(now)
            .invoke_async(&mut *conn)
            .await
            .map_err(|err| map_redis_error(&err))?;
        Ok(consumption_from_reply(reply))
    }
}
