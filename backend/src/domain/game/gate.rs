//! Checks run in front of every game operation.

use tracing::warn;

use crate::domain::ports::GameStore;
use crate::domain::{Error, UserId, reason};

use super::errors::map_session_error;
use super::{GameService, map_access_error};

/// Shard key used for requests that carry no user.
const ANONYMOUS_SHARD_KEY: UserId = UserId::new(0);

impl<G> GameService<G>
where
    G: GameStore,
{
    /// Reject clients on a stale master version and banned users.
    ///
    /// Resolving the version reloads the master cache when it is stale.
    pub async fn check_request(
        &self,
        user_id: Option<UserId>,
        client_master_version: Option<&str>,
    ) -> Result<(), Error> {
        self.bounded("check_request", async {
            let shard_key = user_id.unwrap_or(ANONYMOUS_SHARD_KEY);
            let snapshot = self.snapshot(shard_key).await?;
            if client_master_version != Some(snapshot.version()) {
                return Err(Error::unprocessable(reason::INVALID_MASTER_VERSION));
            }
            let Some(user_id) = user_id else {
                return Ok(());
            };
            if self.access.is_banned(user_id).await.map_err(map_access_error)? {
                warn!(%user_id, "request from banned user");
                return Err(Error::unauthorized(reason::UNAUTHORIZED));
            }
            Ok(())
        })
        .await
    }

    /// Check that `session_id` is live and belongs to `user_id`.
    pub async fn authorize_session(&self, session_id: &str, user_id: UserId) -> Result<(), Error> {
        if !is_well_formed(session_id) {
            return Err(Error::unauthorized(reason::UNAUTHORIZED));
        }
        self.bounded("authorize_session", async {
            let owner = self
                .sessions
                .get(session_id)
                .await
                .map_err(map_session_error)?
                .ok_or_else(|| Error::unauthorized(reason::UNAUTHORIZED))?;
            if owner != user_id {
                warn!(%user_id, %owner, "session used for another user");
                return Err(Error::forbidden(reason::FORBIDDEN));
            }
            Ok(())
        })
        .await
    }
}

/// Session ids look like `{nonce}::{user_id}`.
fn is_well_formed(session_id: &str) -> bool {
    session_id
        .split_once("::")
        .is_some_and(|(nonce, owner)| !nonce.is_empty() && owner.parse::<u64>().is_ok())
}
