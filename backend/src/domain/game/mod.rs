//! Per-user game transaction engine.
//!
//! Every public operation resolves master data through the shared
//! [`MasterDataCache`], validates tokens, bans and device bindings, then runs
//! one transaction on the shard owning the user. An error at any point rolls
//! the transaction back; dropping an unfinished transaction (for example when
//! the bounded timeout fires) rolls it back as well.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{debug, warn};

use crate::domain::ports::{GameStore, GameTransaction, OneTimeTokenStore, SessionStore, TokenConsumption};
use crate::domain::{
    AccessRegistry, Error, GameCalendar, IdGenerator, MasterDataCache, MasterSnapshot,
    OneTimeTokenRecord, Session, TokenType, UserId, reason,
};

mod cards;
mod errors;
mod gacha;
mod gate;
mod grants;
mod login;
mod presents;

pub use cards::{AddExpRequest, ConsumeItem, HomeResponse, ItemListing, UpdateDeckRequest};
pub(crate) use errors::{map_access_error, map_master_error, map_store_error};
use errors::{map_session_error, map_token_error};
pub use gacha::{
    DrawGachaRequest, DrawGachaResponse, GACHA_COST_PER_DRAW, GachaListing, GachaWithPrizes,
};
pub use login::{CreateUserRequest, CreateUserResponse, INITIAL_CARD_ITEM_ID, LoginResponse};
pub use presents::{PRESENTS_PER_PAGE, PresentPage};

/// Tunables of the transaction engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSettings {
    /// Lifetime of a login session.
    pub session_ttl: Duration,
    /// Lifetime of a one-time token.
    pub token_ttl: Duration,
    /// Upper bound for one operation, store round trips included.
    pub transaction_timeout: Duration,
    /// Day boundary used by the once-per-day login processing.
    pub calendar: GameCalendar,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(86_400),
            token_ttl: Duration::from_secs(600),
            transaction_timeout: Duration::from_secs(5),
            calendar: GameCalendar::default(),
        }
    }
}

/// Driven ports and caches the engine composes.
pub struct GamePorts<G> {
    pub store: Arc<G>,
    pub masters: Arc<MasterDataCache>,
    pub access: Arc<AccessRegistry>,
    pub sessions: Arc<dyn SessionStore>,
    pub tokens: Arc<dyn OneTimeTokenStore>,
    pub ids: Arc<IdGenerator>,
}

/// Game transaction engine over a shard-aware [`GameStore`].
pub struct GameService<G> {
    store: Arc<G>,
    masters: Arc<MasterDataCache>,
    access: Arc<AccessRegistry>,
    sessions: Arc<dyn SessionStore>,
    tokens: Arc<dyn OneTimeTokenStore>,
    ids: Arc<IdGenerator>,
    settings: GameSettings,
    rng: Mutex<SmallRng>,
}

impl<G> GameService<G> {
    /// Create a service drawing gacha prizes from an entropy-seeded source.
    pub fn new(ports: GamePorts<G>, settings: GameSettings) -> Self {
        Self::with_rng(ports, settings, SmallRng::from_entropy())
    }

    /// Create a service with an explicit random source.
    pub fn with_rng(ports: GamePorts<G>, settings: GameSettings, rng: SmallRng) -> Self {
        let GamePorts {
            store,
            masters,
            access,
            sessions,
            tokens,
            ids,
        } = ports;
        Self {
            store,
            masters,
            access,
            sessions,
            tokens,
            ids,
            settings,
            rng: Mutex::new(rng),
        }
    }

    /// Settings the service was built with.
    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    fn rng(&self) -> MutexGuard<'_, SmallRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<G> GameService<G>
where
    G: GameStore,
{
    /// Run `operation` under the configured timeout.
    ///
    /// On expiry the future is dropped, which rolls back any transaction it
    /// still owns.
    async fn bounded<T, F>(&self, operation: &'static str, future: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        match tokio::time::timeout(self.settings.transaction_timeout, future).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, "game operation timed out");
                Err(Error::service_unavailable(format!("{operation} timed out")))
            }
        }
    }

    async fn begin(&self, user_id: UserId) -> Result<G::Transaction, Error> {
        self.store.begin(user_id).await.map_err(map_store_error)
    }

    /// Commit on success, roll back on failure.
    async fn finish<T>(tx: G::Transaction, outcome: Result<T, Error>) -> Result<T, Error> {
        match outcome {
            Ok(value) => {
                tx.commit().await.map_err(map_store_error)?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "rollback failed; connection discarded");
                }
                Err(error)
            }
        }
    }

    async fn snapshot(&self, user_id: UserId) -> Result<Arc<MasterSnapshot>, Error> {
        self.masters
            .fresh_snapshot(user_id)
            .await
            .map_err(map_master_error)
    }

    async fn ensure_device(&self, user_id: UserId, viewer_id: &str) -> Result<(), Error> {
        let registered = self
            .access
            .is_registered_device(user_id, viewer_id)
            .await
            .map_err(map_access_error)?;
        if registered {
            return Ok(());
        }
        warn!(%user_id, "request from unregistered device");
        Err(Error::not_found(reason::USER_DEVICE_NOT_FOUND))
    }

    async fn open_session(&self, user_id: UserId) -> Result<Session, Error> {
        let session = Session::issue(user_id, uuid::Uuid::new_v4());
        self.sessions
            .put(&session, self.settings.session_ttl)
            .await
            .map_err(map_session_error)?;
        debug!(%user_id, "session issued");
        Ok(session)
    }

    /// Record the audit row of a fresh token in `tx`.
    ///
    /// The token is not usable until [`Self::activate_token`] runs after
    /// `tx` commits.
    async fn record_token(
        &self,
        tx: &mut G::Transaction,
        user_id: UserId,
        token_type: TokenType,
        now: i64,
    ) -> Result<OneTimeTokenRecord, Error> {
        let ttl_secs = i64::try_from(self.settings.token_ttl.as_secs()).unwrap_or(i64::MAX);
        let record = OneTimeTokenRecord {
            id: self.ids.next_id(),
            user_id,
            token: uuid::Uuid::new_v4().to_string(),
            token_type,
            expired_at: now.saturating_add(ttl_secs),
            created_at: now,
            updated_at: now,
        };
        tx.replace_token_record(&record, now)
            .await
            .map_err(map_store_error)?;
        Ok(record)
    }

    /// Publish a committed token record to the shared store.
    async fn activate_token(&self, record: OneTimeTokenRecord) -> Result<String, Error> {
        self.tokens
            .issue(&record, self.settings.token_ttl)
            .await
            .map_err(map_token_error)?;
        Ok(record.token)
    }

    /// Spend a token. The caller retires the audit row in its transaction.
    async fn consume_token(
        &self,
        user_id: UserId,
        token: &str,
        token_type: TokenType,
        now: i64,
    ) -> Result<(), Error> {
        let outcome = self
            .tokens
            .consume(user_id, token, token_type, now)
            .await
            .map_err(map_token_error)?;
        match outcome {
            TokenConsumption::Consumed => Ok(()),
            TokenConsumption::Expired => {
                warn!(%user_id, ?token_type, "expired one-time token presented");
                self.retire_expired_token(user_id, token, now).await;
                Err(Error::invalid_request(reason::INVALID_TOKEN))
            }
            TokenConsumption::Invalid => {
                warn!(%user_id, ?token_type, "unknown one-time token presented");
                Err(Error::invalid_request(reason::INVALID_TOKEN))
            }
        }
    }

    /// Soft-delete the audit row of an expired token in its own transaction.
    async fn retire_expired_token(&self, user_id: UserId, token: &str, now: i64) {
        let result = async {
            let mut tx = self.begin(user_id).await?;
            let outcome = tx
                .retire_token_record(user_id, token, now)
                .await
                .map_err(map_store_error);
            Self::finish(tx, outcome).await
        }
        .await;
        if let Err(error) = result {
            debug!(%user_id, error = %error, "expired token row left in place");
        }
    }
}

fn non_empty<T>(rows: Vec<T>) -> Option<Vec<T>> {
    (!rows.is_empty()).then_some(rows)
}


#[cfg(test)]
#[path = "gacha_tests.rs"]
mod gacha_tests;


#[cfg(test)]
#[path = "cards_tests.rs"]
mod cards_tests;

#[cfg(test)]
#[path = "gate_tests.rs"]
mod gate_tests;
