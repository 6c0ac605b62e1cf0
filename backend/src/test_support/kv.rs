//! In-memory session and one-time token stores.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::ports::{
    OneTimeTokenStore, OneTimeTokenStoreError, SessionStore, SessionStoreError, TokenConsumption,
};
use crate::domain::{OneTimeTokenRecord, Session, TokenType, UserId};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Session store without expiry.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, UserId>>,
}

impl InMemorySessionStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Live sessions held by a user.
    pub fn count_for(&self, user_id: UserId) -> usize {
        guard(&self.sessions)
            .values()
            .filter(|owner| **owner == user_id)
            .count()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, session: &Session, _ttl: Duration) -> Result<(), SessionStoreError> {
        guard(&self.sessions).insert(session.session_id.clone(), session.user_id);
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<UserId>, SessionStoreError> {
        Ok(guard(&self.sessions).get(session_id).copied())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LiveToken {
    token: String,
    token_type: TokenType,
    expires_at: i64,
}

/// One-time token store keeping one token per user.
///
/// Expiry is judged against the request time passed to `consume`, so tests
/// can age a token by consuming it with a later `now`.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    tokens: Mutex<HashMap<UserId, LiveToken>>,
}

impl InMemoryTokenStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The user's live token and its type.
    pub fn current(&self, user_id: UserId) -> Option<(String, TokenType)> {
        guard(&self.tokens)
            .get(&user_id)
            .map(|live| (live.token.clone(), live.token_type))
    }
}

#[async_trait]
impl OneTimeTokenStore for InMemoryTokenStore {
    async fn issue(&self, record: &OneTimeTokenRecord, _ttl: Duration) -> Result<(), OneTimeTokenStoreError> {
        guard(&self.tokens).insert(
            record.user_id,
            LiveToken {
                token: record.token.clone(),
                token_type: record.token_type,
                expires_at: record.expired_at,
            },
        );
        Ok(())
    }

    async fn consume(
        &self,
        user_id: UserId,
        token: &str,
        token_type: TokenType,
        now: i64,
    ) -> Result<TokenConsumption, OneTimeTokenStoreError> {
        let mut tokens = guard(&self.tokens);
        let matches = tokens
            .get(&user_id)
            .is_some_and(|live| live.token == token && live.token_type == token_type);
        if !matches {
            return Ok(TokenConsumption::Invalid);
        }
        let expired = tokens
            .remove(&user_id)
            .is_some_and(|live| live.expires_at < now);
        Ok(if expired {
            TokenConsumption::Expired
        } else {
            TokenConsumption::Consumed
        })
    }
}
