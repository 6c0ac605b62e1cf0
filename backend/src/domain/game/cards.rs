//! Inventory, card leveling, deck management and passive income.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::domain::ports::{GameStore, GameTransaction};
use crate::domain::rewards::{CardCurve, CardLevel, accrue_reward, level_up};
use crate::domain::{
    DECK_CARD_COUNT, Error, ItemKind, MasterSnapshot, OneTimeTokenRecord, TokenType,
    UpdatedResources, User, UserCard, UserDeck, UserId, UserItem, reason,
};

use super::{GameService, map_store_error};

/// Inventory snapshot plus the token required to level a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemListing {
    pub one_time_token: String,
    pub user: User,
    pub items: Vec<UserItem>,
    pub cards: Vec<UserCard>,
}

/// Material stack to consume, by `user_items` row id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeItem {
    pub id: i64,
    pub amount: i64,
}

/// Card leveling input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddExpRequest {
    pub viewer_id: String,
    pub one_time_token: String,
    /// `user_cards` row id of the card to level.
    pub card_id: i64,
    pub items: Vec<ConsumeItem>,
}

/// Deck replacement input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDeckRequest {
    pub viewer_id: String,
    pub card_ids: Vec<i64>,
}

/// Home screen state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeResponse {
    pub now: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deck: Option<UserDeck>,
    pub total_amount_per_sec: i64,
    /// Seconds since passive income was last collected.
    pub past_time: i64,
    pub user: User,
}

impl<G> GameService<G>
where
    G: GameStore,
{
    /// List items and cards and issue a card-exp token.
    pub async fn list_items(&self, user_id: UserId, now: i64) -> Result<ItemListing, Error> {
        self.bounded("list_items", async {
            let mut tx = self.begin(user_id).await?;
            let outcome = self.inventory(&mut tx, user_id, now).await;
            let (mut listing, record) = Self::finish(tx, outcome).await?;
            listing.one_time_token = self.activate_token(record).await?;
            Ok(listing)
        })
        .await
    }

    async fn inventory(
        &self,
        tx: &mut G::Transaction,
        user_id: UserId,
        now: i64,
    ) -> Result<(ItemListing, OneTimeTokenRecord), Error> {
        let user = find_user(tx, user_id).await?;
        let items = tx.list_items(user_id).await.map_err(map_store_error)?;
        let cards = tx.list_cards(user_id).await.map_err(map_store_error)?;
        let record = self.record_token(tx, user_id, TokenType::CardExp, now).await?;
        let listing = ItemListing {
            one_time_token: String::new(),
            user,
            items,
            cards,
        };
        Ok((listing, record))
    }

    /// Feed exp materials to a card and apply the resulting level-ups.
    ///
    /// A card already at its maximum level is rejected before the token is
    /// spent.
    pub async fn add_exp_to_card(
        &self,
        user_id: UserId,
        request: &AddExpRequest,
        now: i64,
    ) -> Result<UpdatedResources, Error> {
        let consumption = merge_consumption(&request.items)?;
        self.bounded("add_exp_to_card", async {
            let snapshot = self.snapshot(user_id).await?;
            let mut tx = self.begin(user_id).await?;
            let outcome = self
                .feed_card(&mut tx, &snapshot, user_id, request, &consumption, now)
                .await;
            Self::finish(tx, outcome).await
        })
        .await
    }

    async fn feed_card(
        &self,
        tx: &mut G::Transaction,
        snapshot: &MasterSnapshot,
        user_id: UserId,
        request: &AddExpRequest,
        consumption: &BTreeMap<i64, i64>,
        now: i64,
    ) -> Result<UpdatedResources, Error> {
        let user = tx
            .lock_user(user_id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| Error::not_found(reason::USER_NOT_FOUND))?;
        let mut card = tx
            .find_cards(user_id, &[request.card_id])
            .await
            .map_err(map_store_error)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(reason::CARD_NOT_FOUND))?;
        let template = snapshot
            .item(card.card_id)
            .ok_or_else(|| Error::not_found(reason::ITEM_NOT_FOUND))?;
        let curve = CardCurve::from_item(template).ok_or_else(|| {
            Error::internal(format!("card master {} lacks leveling columns", template.id))
        })?;
        if card.level >= curve.max_level {
            return Err(Error::invalid_request(reason::CARD_MAX_LEVEL));
        }

        self.consume_token(user_id, &request.one_time_token, TokenType::CardExp, now)
            .await?;
        self.ensure_device(user_id, &request.viewer_id).await?;

        let ids: Vec<i64> = consumption.keys().copied().collect();
        let mut held: HashMap<i64, UserItem> = tx
            .find_items(user_id, &ids)
            .await
            .map_err(map_store_error)?
            .into_iter()
            .filter(|row| row.item_type == ItemKind::ExpMaterial)
            .map(|row| (row.id, row))
            .collect();

        let mut gained = 0_i64;
        let mut consumed = Vec::with_capacity(consumption.len());
        for (&id, &amount) in consumption {
            let mut row = held
                .remove(&id)
                .ok_or_else(|| Error::not_found(reason::ITEM_NOT_FOUND))?;
            if amount > row.amount {
                return Err(Error::invalid_request(reason::ITEM_NOT_ENOUGH));
            }
            let gained_exp = snapshot
                .item(row.item_id)
                .and_then(|item| item.gained_exp)
                .ok_or_else(|| Error::not_found(reason::ITEM_NOT_FOUND))?;
            gained = gained.saturating_add(amount.saturating_mul(gained_exp));
            row.amount -= amount;
            row.updated_at = now;
            consumed.push(row);
        }

        card.total_exp = card.total_exp.saturating_add(gained);
        let leveled = level_up(
            CardLevel {
                level: card.level,
                amount_per_sec: card.amount_per_sec,
            },
            card.total_exp,
            &curve,
        );
        debug!(
            %user_id,
            card_id = card.id,
            from = card.level,
            to = leveled.level,
            "card experience applied"
        );
        card.level = leveled.level;
        card.amount_per_sec = leveled.amount_per_sec;
        card.updated_at = now;
        tx.update_card(&card).await.map_err(map_store_error)?;
        tx.upsert_items(&consumed).await.map_err(map_store_error)?;
        tx.retire_token_record(user_id, &request.one_time_token, now)
            .await
            .map_err(map_store_error)?;

        Ok(UpdatedResources {
            user: Some(user),
            user_cards: Some(vec![card]),
            user_items: Some(consumed),
            ..UpdatedResources::at(now)
        })
    }

    /// Replace the active deck with three distinct owned cards.
    pub async fn update_deck(
        &self,
        user_id: UserId,
        request: &UpdateDeckRequest,
        now: i64,
    ) -> Result<UpdatedResources, Error> {
        let card_ids = <[i64; DECK_CARD_COUNT]>::try_from(request.card_ids.as_slice())
            .map_err(|_| Error::invalid_request(reason::INVALID_CARD_COUNT))?;
        let distinct: HashSet<i64> = card_ids.iter().copied().collect();
        if distinct.len() != DECK_CARD_COUNT {
            return Err(Error::invalid_request(reason::INVALID_CARD_IDS));
        }
        self.bounded("update_deck", async {
            self.ensure_device(user_id, &request.viewer_id).await?;
            let mut tx = self.begin(user_id).await?;
            let outcome = self.replace_deck(&mut tx, user_id, card_ids, now).await;
            Self::finish(tx, outcome).await
        })
        .await
    }

    async fn replace_deck(
        &self,
        tx: &mut G::Transaction,
        user_id: UserId,
        card_ids: [i64; DECK_CARD_COUNT],
        now: i64,
    ) -> Result<UpdatedResources, Error> {
        tx.lock_user(user_id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| Error::not_found(reason::USER_NOT_FOUND))?;
        let owned = tx
            .find_cards(user_id, &card_ids)
            .await
            .map_err(map_store_error)?;
        if owned.len() != DECK_CARD_COUNT {
            return Err(Error::invalid_request(reason::INVALID_CARD_IDS));
        }
        tx.retire_decks(user_id, now).await.map_err(map_store_error)?;
        let [first, second, third] = card_ids;
        let deck = UserDeck {
            id: self.ids.next_id(),
            user_id,
            user_card_id_1: first,
            user_card_id_2: second,
            user_card_id_3: third,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tx.insert_deck(&deck).await.map_err(map_store_error)?;
        Ok(UpdatedResources {
            user_decks: Some(vec![deck]),
            ..UpdatedResources::at(now)
        })
    }

    /// Collect passive income produced by the active deck since the last
    /// collection.
    pub async fn reward(&self, user_id: UserId, viewer_id: &str, now: i64) -> Result<UpdatedResources, Error> {
        self.bounded("reward", async {
            self.ensure_device(user_id, viewer_id).await?;
            let mut tx = self.begin(user_id).await?;
            let outcome = collect_reward(&mut tx, user_id, now).await;
            Self::finish(tx, outcome).await
        })
        .await
    }

    /// Deck, yield and elapsed time shown on the home screen.
    pub async fn home(&self, user_id: UserId, now: i64) -> Result<HomeResponse, Error> {
        self.bounded("home", async {
            let mut tx = self.begin(user_id).await?;
            let outcome = home_state(&mut tx, user_id, now).await;
            Self::finish(tx, outcome).await
        })
        .await
    }
}

async fn find_user<T: GameTransaction>(tx: &mut T, user_id: UserId) -> Result<User, Error> {
    tx.find_user(user_id)
        .await
        .map_err(map_store_error)?
        .ok_or_else(|| Error::not_found(reason::USER_NOT_FOUND))
}

async fn deck_yield<T: GameTransaction>(tx: &mut T, user_id: UserId, deck: &UserDeck) -> Result<Option<i64>, Error> {
    let cards = tx
        .find_cards(user_id, &deck.card_ids())
        .await
        .map_err(map_store_error)?;
    if cards.len() != DECK_CARD_COUNT {
        return Ok(None);
    }
    Ok(Some(cards.iter().map(|card| card.amount_per_sec).sum()))
}

async fn collect_reward<T: GameTransaction>(tx: &mut T, user_id: UserId, now: i64) -> Result<UpdatedResources, Error> {
    let mut user = tx
        .lock_user(user_id)
        .await
        .map_err(map_store_error)?
        .ok_or_else(|| Error::not_found(reason::USER_NOT_FOUND))?;
    let deck = tx
        .find_active_deck(user_id)
        .await
        .map_err(map_store_error)?
        .ok_or_else(|| Error::not_found(reason::DECK_NOT_FOUND))?;
    let yield_per_sec = deck_yield(tx, user_id, &deck)
        .await?
        .ok_or_else(|| Error::invalid_request(reason::INVALID_DECK_CARDS))?;

    let accrual = accrue_reward(user.isu_coin, user.last_getreward_at, now, yield_per_sec);
    user.isu_coin = accrual.balance;
    user.last_getreward_at = accrual.collected_at;
    user.updated_at = now;
    tx.update_user(&user).await.map_err(map_store_error)?;
    debug!(%user_id, elapsed = accrual.elapsed_secs, yield_per_sec, "passive income collected");
    Ok(UpdatedResources {
        user: Some(user),
        ..UpdatedResources::at(now)
    })
}

async fn home_state<T: GameTransaction>(tx: &mut T, user_id: UserId, now: i64) -> Result<HomeResponse, Error> {
    let user = find_user(tx, user_id).await?;
    let deck = tx.find_active_deck(user_id).await.map_err(map_store_error)?;
    let mut total_amount_per_sec = 0;
    if let Some(active) = &deck {
        total_amount_per_sec = deck_yield(tx, user_id, active).await?.unwrap_or(0);
    }
    Ok(HomeResponse {
        now,
        deck,
        total_amount_per_sec,
        past_time: (now - user.last_getreward_at).max(0),
        user,
    })
}

/// Sum requested amounts per stack and reject non-positive amounts.
fn merge_consumption(items: &[ConsumeItem]) -> Result<BTreeMap<i64, i64>, Error> {
    let mut merged = BTreeMap::new();
    for item in items {
        if item.amount < 1 {
            return Err(Error::invalid_request(reason::INVALID_REQUEST_BODY));
        }
        let total: &mut i64 = merged.entry(item.id).or_insert(0);
        *total = total.saturating_add(item.amount);
    }
    Ok(merged)
}
