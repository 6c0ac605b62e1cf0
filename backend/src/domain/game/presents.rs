//! Present mailbox paging and collection.

use serde::Serialize;

use crate::domain::ports::{GameStore, GameTransaction};
use crate::domain::rewards::GrantBatch;
use crate::domain::{Error, MasterSnapshot, UpdatedResources, UserId, UserPresent, reason};

use super::{GameService, map_store_error, non_empty};

/// Presents returned per page.
pub const PRESENTS_PER_PAGE: i64 = 100;

/// One page of uncollected presents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentPage {
    pub presents: Vec<UserPresent>,
    /// True when later pages hold more presents.
    pub is_next: bool,
}

impl<G> GameService<G>
where
    G: GameStore,
{
    /// Page through uncollected presents, newest first. Pages start at 1.
    pub async fn list_presents(&self, user_id: UserId, page: i64) -> Result<PresentPage, Error> {
        if page < 1 {
            return Err(Error::invalid_request(reason::INVALID_PAGE));
        }
        let offset = (page - 1).saturating_mul(PRESENTS_PER_PAGE);
        self.bounded("list_presents", async {
            let mut tx = self.begin(user_id).await?;
            let outcome = tx
                .list_open_presents(user_id, offset, PRESENTS_PER_PAGE + 1)
                .await
                .map_err(map_store_error);
            let mut presents = Self::finish(tx, outcome).await?;
            let is_next = i64::try_from(presents.len()).unwrap_or(i64::MAX) > PRESENTS_PER_PAGE;
            presents.truncate(usize::try_from(PRESENTS_PER_PAGE).unwrap_or(usize::MAX));
            Ok(PresentPage { presents, is_next })
        })
        .await
    }

    /// Collect presents by id.
    ///
    /// Ids that are unknown or already collected are ignored. The contents
    /// of the remaining presents are granted in one batch.
    pub async fn receive_presents(
        &self,
        user_id: UserId,
        viewer_id: &str,
        present_ids: &[i64],
        now: i64,
    ) -> Result<UpdatedResources, Error> {
        if present_ids.is_empty() {
            return Err(Error::unprocessable(reason::EMPTY_PRESENT_IDS));
        }
        self.bounded("receive_presents", async {
            self.ensure_device(user_id, viewer_id).await?;
            let snapshot = self.snapshot(user_id).await?;
            let mut tx = self.begin(user_id).await?;
            let outcome = self
                .collect_presents(&mut tx, &snapshot, user_id, present_ids, now)
                .await;
            Self::finish(tx, outcome).await
        })
        .await
    }

    async fn collect_presents(
        &self,
        tx: &mut G::Transaction,
        snapshot: &MasterSnapshot,
        user_id: UserId,
        present_ids: &[i64],
        now: i64,
    ) -> Result<UpdatedResources, Error> {
        let mut user = tx
            .lock_user(user_id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| Error::not_found(reason::USER_NOT_FOUND))?;
        let open = tx
            .find_open_presents(user_id, present_ids)
            .await
            .map_err(map_store_error)?;
        if open.is_empty() {
            return Ok(UpdatedResources {
                user_presents: Some(Vec::new()),
                ..UpdatedResources::at(now)
            });
        }

        let ids: Vec<i64> = open.iter().map(|present| present.id).collect();
        tx.retire_presents(user_id, &ids, now)
            .await
            .map_err(map_store_error)?;
        let granted = self
            .apply_grants(tx, snapshot, &mut user, GrantBatch::from_presents(&open), now)
            .await?;
        user.updated_at = now;
        tx.update_user(&user).await.map_err(map_store_error)?;

        let collected = open
            .into_iter()
            .map(|present| UserPresent {
                updated_at: now,
                deleted_at: Some(now),
                ..present
            })
            .collect();
        Ok(UpdatedResources {
            user: Some(user),
            user_cards: non_empty(granted.cards),
            user_items: non_empty(granted.items),
            user_presents: Some(collected),
            ..UpdatedResources::at(now)
        })
    }
}
