//! Applying grouped grants to a user inside an open transaction.

use std::collections::{BTreeMap, HashMap};

use crate::domain::ports::{GameStore, GameTransaction};
use crate::domain::rewards::GrantBatch;
use crate::domain::{
    Error, ItemKind, ItemMaster, MasterSnapshot, User, UserCard, UserId, UserItem, reason,
};

use super::{GameService, map_store_error};

/// Rows created or changed by applying a [`GrantBatch`].
#[derive(Debug, Default)]
pub(super) struct Granted {
    pub cards: Vec<UserCard>,
    pub items: Vec<UserItem>,
}

impl<G> GameService<G>
where
    G: GameStore,
{
    /// Apply `batch` to `user`.
    ///
    /// Coins are added to `user` in memory; the caller persists the row.
    /// Cards become new level-1 instances and materials are merged into the
    /// user's stacks.
    pub(super) async fn apply_grants(
        &self,
        tx: &mut G::Transaction,
        snapshot: &MasterSnapshot,
        user: &mut User,
        batch: GrantBatch,
        now: i64,
    ) -> Result<Granted, Error> {
        user.isu_coin = user.isu_coin.saturating_add(batch.coins);

        let mut cards = Vec::with_capacity(batch.cards.len());
        for item_id in batch.cards {
            let item = master_of_kind(snapshot, item_id, |kind| kind == ItemKind::Card)?;
            cards.push(self.new_card(user.id, item, now)?);
        }
        if !cards.is_empty() {
            tx.insert_cards(&cards).await.map_err(map_store_error)?;
        }

        let items = self
            .stack_items(tx, snapshot, user.id, &batch.stackables, now)
            .await?;
        Ok(Granted { cards, items })
    }

    /// Level-1 instance of a card template.
    pub(super) fn new_card(&self, user_id: UserId, item: &ItemMaster, now: i64) -> Result<UserCard, Error> {
        let amount_per_sec = item
            .amount_per_sec
            .ok_or_else(|| Error::internal(format!("card {} has no base yield", item.id)))?;
        Ok(UserCard {
            id: self.ids.next_id(),
            user_id,
            card_id: item.id,
            amount_per_sec,
            level: 1,
            total_exp: 0,
            created_at: now,
            updated_at: now,
        })
    }

    async fn stack_items(
        &self,
        tx: &mut G::Transaction,
        snapshot: &MasterSnapshot,
        user_id: UserId,
        stackables: &[(i64, i64)],
        now: i64,
    ) -> Result<Vec<UserItem>, Error> {
        if stackables.is_empty() {
            return Ok(Vec::new());
        }
        let mut totals: BTreeMap<i64, (ItemKind, i64)> = BTreeMap::new();
        for &(item_id, amount) in stackables {
            let item = master_of_kind(snapshot, item_id, ItemKind::is_stackable)?;
            let entry = totals.entry(item_id).or_insert((item.item_type, 0));
            entry.1 = entry.1.saturating_add(amount);
        }

        let item_ids: Vec<i64> = totals.keys().copied().collect();
        let mut held: HashMap<i64, UserItem> = tx
            .find_items_by_item_ids(user_id, &item_ids)
            .await
            .map_err(map_store_error)?
            .into_iter()
            .map(|row| (row.item_id, row))
            .collect();

        let rows: Vec<UserItem> = totals
            .into_iter()
            .map(|(item_id, (item_type, amount))| {
                held.remove(&item_id).map_or_else(
                    || UserItem {
                        id: self.ids.next_id(),
                        user_id,
                        item_type,
                        item_id,
                        amount,
                        created_at: now,
                        updated_at: now,
                    },
                    |row| UserItem {
                        amount: row.amount.saturating_add(amount),
                        updated_at: now,
                        ..row
                    },
                )
            })
            .collect();
        tx.upsert_items(&rows).await.map_err(map_store_error)?;
        Ok(rows)
    }
}

fn master_of_kind(
    snapshot: &MasterSnapshot,
    item_id: i64,
    accepts: impl Fn(ItemKind) -> bool,
) -> Result<&ItemMaster, Error> {
    snapshot
        .item(item_id)
        .filter(|item| accepts(item.item_type))
        .ok_or_else(|| Error::not_found(reason::ITEM_NOT_FOUND))
}
