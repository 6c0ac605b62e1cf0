//! PostgreSQL-backed game store.
//!
//! [`DieselGameStore`] routes each user to their shard and opens a Diesel
//! transaction on an owned pooled connection. [`DieselTransaction`] keeps that
//! connection until `commit` or `rollback`. A transaction dropped while still
//! open leaves its connection flagged as broken, so the pool discards it and
//! PostgreSQL rolls the work back when the session closes.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::{AnsiTransactionManager, AsyncPgConnection, RunQueryDsl, TransactionManager};
use tracing::debug;

use crate::domain::ports::{GameStore, GameStoreError, GameTransaction};
use crate::domain::{
    OneTimeTokenRecord, User, UserCard, UserDeck, UserDevice, UserId, UserItem, UserLoginBonus,
    UserPresent, UserPresentAllReceivedHistory,
};

use super::diesel_basic_error_mapping::{
    map_basic_diesel_error, map_basic_pool_error, map_shard_error,
};
use super::models::{
    InvalidRow, NewOneTimeTokenRow, NewPresentAllHistoryRow, NewUserDeviceRow, UserCardRow,
    UserDeckRow, UserItemRow, UserLoginBonusRow, UserPresentRow, UserRow,
};
use super::schema::{
    user_cards, user_decks, user_devices, user_items, user_login_bonuses, user_one_time_tokens,
    user_present_all_received_history, user_presents, users,
};
use super::shard_router::ShardRouter;

fn map_diesel_error(error: diesel::result::Error) -> GameStoreError {
    map_basic_diesel_error(error, GameStoreError::query, GameStoreError::connection)
}

fn map_invalid_row(error: InvalidRow) -> GameStoreError {
    GameStoreError::corrupt(error.to_string())
}

fn convert_rows<R, T>(rows: Vec<R>) -> Result<Vec<T>, GameStoreError>
where
    T: TryFrom<R, Error = InvalidRow>,
{
    rows.into_iter()
        .map(T::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_invalid_row)
}

/// Diesel-backed implementation of the [`GameStore`] port.
#[derive(Clone)]
pub struct DieselGameStore {
    router: Arc<ShardRouter>,
}

impl DieselGameStore {
    /// Create a store routing through `router`.
    pub fn new(router: Arc<ShardRouter>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl GameStore for DieselGameStore {
    type Transaction = DieselTransaction;

    async fn begin(&self, user_id: UserId) -> Result<Self::Transaction, GameStoreError> {
        let shard = self
            .router
            .shard_for(user_id)
            .map_err(|error| map_shard_error(error, GameStoreError::connection))?;
        let pool = shard
            .pool()
            .await
            .map_err(|error| map_shard_error(error, GameStoreError::connection))?;
        let mut conn = pool
            .get_owned()
            .await
            .map_err(|error| map_basic_pool_error(&error, GameStoreError::connection))?;
        AnsiTransactionManager::begin_transaction(&mut *conn)
            .await
            .map_err(map_diesel_error)?;
        debug!(%user_id, shard = shard.index(), "game transaction opened");
        Ok(DieselTransaction {
            conn,
            shard: shard.index(),
        })
    }
}

/// Open transaction on one shard connection.
pub struct DieselTransaction {
    conn: PooledConnection<'static, AsyncPgConnection>,
    shard: usize,
}

impl DieselTransaction {
    fn conn(&mut self) -> &mut AsyncPgConnection {
        &mut self.conn
    }
}

#[async_trait]
impl GameTransaction for DieselTransaction {
    async fn find_user(&mut self, user_id: UserId) -> Result<Option<User>, GameStoreError> {
        let row: Option<UserRow> = users::table
            .filter(users::id.eq(user_id.as_db()))
            .filter(users::deleted_at.is_null())
            .select(UserRow::as_select())
            .first(self.conn())
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(User::from))
    }

    async fn lock_user(&mut self, user_id: UserId) -> Result<Option<User>, GameStoreError> {
        let row: Option<UserRow> = users::table
            .filter(users::id.eq(user_id.as_db()))
            .filter(users::deleted_at.is_null())
            .select(UserRow::as_select())
            .for_update()
            .first(self.conn())
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(User::from))
    }

    async fn insert_user(&mut self, user: &User) -> Result<(), GameStoreError> {
        diesel::insert_into(users::table)
            .values(UserRow::from(user))
            .execute(self.conn())
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn update_user(&mut self, user: &User) -> Result<(), GameStoreError> {
        diesel::update(users::table.filter(users::id.eq(user.id.as_db())))
            .set((
                users::isu_coin.eq(user.isu_coin),
                users::last_getreward_at.eq(user.last_getreward_at),
                users::last_activated_at.eq(user.last_activated_at),
                users::updated_at.eq(user.updated_at),
            ))
            .execute(self.conn())
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn insert_device(&mut self, device: &UserDevice) -> Result<(), GameStoreError> {
        diesel::insert_into(user_devices::table)
            .values(NewUserDeviceRow::from(device))
            .execute(self.conn())
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn insert_cards(&mut self, cards: &[UserCard]) -> Result<(), GameStoreError> {
        if cards.is_empty() {
            return Ok(());
        }
        let rows: Vec<UserCardRow> = cards.iter().map(UserCardRow::from).collect();
        diesel::insert_into(user_cards::table)
            .values(&rows)
            .execute(self.conn())
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn find_cards(
        &mut self,
        user_id: UserId,
        card_ids: &[i64],
    ) -> Result<Vec<UserCard>, GameStoreError> {
        let rows: Vec<UserCardRow> = user_cards::table
            .filter(user_cards::user_id.eq(user_id.as_db()))
            .filter(user_cards::id.eq_any(card_ids))
            .select(UserCardRow::as_select())
            .order_by(user_cards::id)
            .load(self.conn())
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(UserCard::from).collect())
    }

    async fn list_cards(&mut self, user_id: UserId) -> Result<Vec<UserCard>, GameStoreError> {
        let rows: Vec<UserCardRow> = user_cards::table
            .filter(user_cards::user_id.eq(user_id.as_db()))
            .select(UserCardRow::as_select())
            .order_by(user_cards::id)
            .load(self.conn())
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(UserCard::from).collect())
    }

    async fn update_card(&mut self, card: &UserCard) -> Result<(), GameStoreError> {
        diesel::update(user_cards::table.filter(user_cards::id.eq(card.id)))
            .set((
                user_cards::amount_per_sec.eq(card.amount_per_sec),
                user_cards::level.eq(card.level),
                user_cards::total_exp.eq(card.total_exp),
                user_cards::updated_at.eq(card.updated_at),
            ))
            .execute(self.conn())
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn find_active_deck(&mut self, user_id: UserId) -> Result<Option<UserDeck>, GameStoreError> {
        let row: Option<UserDeckRow> = user_decks::table
            .filter(user_decks::user_id.eq(user_id.as_db()))
            .filter(user_decks::deleted_at.is_null())
            .select(UserDeckRow::as_select())
            .first(self.conn())
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(UserDeck::from))
    }

    async fn retire_decks(&mut self, user_id: UserId, now: i64) -> Result<(), GameStoreError> {
        diesel::update(
            user_decks::table
                .filter(user_decks::user_id.eq(user_id.as_db()))
                .filter(user_decks::deleted_at.is_null()),
        )
        .set((
            user_decks::deleted_at.eq(Some(now)),
            user_decks::updated_at.eq(now),
        ))
        .execute(self.conn())
        .await
        .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn insert_deck(&mut self, deck: &UserDeck) -> Result<(), GameStoreError> {
        diesel::insert_into(user_decks::table)
            .values(UserDeckRow::from(deck))
            .execute(self.conn())
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn find_items_by_item_ids(
        &mut self,
        user_id: UserId,
        item_ids: &[i64],
    ) -> Result<Vec<UserItem>, GameStoreError> {
        let rows: Vec<UserItemRow> = user_items::table
            .filter(user_items::user_id.eq(user_id.as_db()))
            .filter(user_items::item_id.eq_any(item_ids))
            .select(UserItemRow::as_select())
            .load(self.conn())
            .await
            .map_err(map_diesel_error)?;
        convert_rows(rows)
    }

    async fn find_items(
        &mut self,
        user_id: UserId,
        ids: &[i64],
    ) -> Result<Vec<UserItem>, GameStoreError> {
        let rows: Vec<UserItemRow> = user_items::table
            .filter(user_items::user_id.eq(user_id.as_db()))
            .filter(user_items::id.eq_any(ids))
            .select(UserItemRow::as_select())
            .load(self.conn())
            .await
            .map_err(map_diesel_error)?;
        convert_rows(rows)
    }

    async fn list_items(&mut self, user_id: UserId) -> Result<Vec<UserItem>, GameStoreError> {
        let rows: Vec<UserItemRow> = user_items::table
            .filter(user_items::user_id.eq(user_id.as_db()))
            .select(UserItemRow::as_select())
            .order_by(user_items::id)
            .load(self.conn())
            .await
            .map_err(map_diesel_error)?;
        convert_rows(rows)
    }

    async fn upsert_items(&mut self, items: &[UserItem]) -> Result<(), GameStoreError> {
        if items.is_empty() {
            return Ok(());
        }
        let rows: Vec<UserItemRow> = items.iter().map(UserItemRow::from).collect();
        diesel::insert_into(user_items::table)
            .values(&rows)
            .on_conflict(user_items::id)
            .do_update()
            .set((
                user_items::amount.eq(excluded(user_items::amount)),
                user_items::updated_at.eq(excluded(user_items::updated_at)),
            ))
            .execute(self.conn())
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn find_login_bonus(
        &mut self,
        user_id: UserId,
        login_bonus_id: i64,
    ) -> Result<Option<UserLoginBonus>, GameStoreError> {
        let row: Option<UserLoginBonusRow> = user_login_bonuses::table
            .filter(user_login_bonuses::user_id.eq(user_id.as_db()))
            .filter(user_login_bonuses::login_bonus_id.eq(login_bonus_id))
            .select(UserLoginBonusRow::as_select())
            .first(self.conn())
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(UserLoginBonus::from))
    }

    async fn save_login_bonus(&mut self, progress: &UserLoginBonus) -> Result<(), GameStoreError> {
        diesel::insert_into(user_login_bonuses::table)
            .values(UserLoginBonusRow::from(progress))
            .on_conflict(user_login_bonuses::id)
            .do_update()
            .set((
                user_login_bonuses::last_reward_sequence
                    .eq(excluded(user_login_bonuses::last_reward_sequence)),
                user_login_bonuses::loop_count.eq(excluded(user_login_bonuses::loop_count)),
                user_login_bonuses::updated_at.eq(excluded(user_login_bonuses::updated_at)),
            ))
            .execute(self.conn())
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn received_present_all_ids(
        &mut self,
        user_id: UserId,
        present_all_ids: &[i64],
    ) -> Result<Vec<i64>, GameStoreError> {
        user_present_all_received_history::table
            .filter(user_present_all_received_history::user_id.eq(user_id.as_db()))
            .filter(user_present_all_received_history::present_all_id.eq_any(present_all_ids))
            .select(user_present_all_received_history::present_all_id)
            .load(self.conn())
            .await
            .map_err(map_diesel_error)
    }

    async fn insert_present_all_histories(
        &mut self,
        histories: &[UserPresentAllReceivedHistory],
    ) -> Result<(), GameStoreError> {
        if histories.is_empty() {
            return Ok(());
        }
        let rows: Vec<NewPresentAllHistoryRow> =
            histories.iter().map(NewPresentAllHistoryRow::from).collect();
        diesel::insert_into(user_present_all_received_history::table)
            .values(&rows)
            .execute(self.conn())
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn insert_presents(&mut self, presents: &[UserPresent]) -> Result<(), GameStoreError> {
        if presents.is_empty() {
            return Ok(());
        }
        let rows: Vec<UserPresentRow> = presents.iter().map(UserPresentRow::from).collect();
        diesel::insert_into(user_presents::table)
            .values(&rows)
            .execute(self.conn())
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn find_open_presents(
        &mut self,
        user_id: UserId,
        present_ids: &[i64],
    ) -> Result<Vec<UserPresent>, GameStoreError> {
        let rows: Vec<UserPresentRow> = user_presents::table
            .filter(user_presents::user_id.eq(user_id.as_db()))
            .filter(user_presents::id.eq_any(present_ids))
            .filter(user_presents::deleted_at.is_null())
            .select(UserPresentRow::as_select())
            .order_by(user_presents::id)
            .load(self.conn())
            .await
            .map_err(map_diesel_error)?;
        convert_rows(rows)
    }

    async fn retire_presents(
        &mut self,
        user_id: UserId,
        present_ids: &[i64],
        now: i64,
    ) -> Result<(), GameStoreError> {
        diesel::update(
            user_presents::table
                .filter(user_presents::user_id.eq(user_id.as_db()))
                .filter(user_presents::id.eq_any(present_ids))
                .filter(user_presents::deleted_at.is_null()),
        )
        .set((
            user_presents::deleted_at.eq(Some(now)),
            user_presents::updated_at.eq(now),
        ))
        .execute(self.conn())
        .await
        .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn list_open_presents(
        &mut self,
        user_id: UserId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<UserPresent>, GameStoreError> {
        let rows: Vec<UserPresentRow> = user_presents::table
            .filter(user_presents::user_id.eq(user_id.as_db()))
            .filter(user_presents::deleted_at.is_null())
            .select(UserPresentRow::as_select())
            .order_by((user_presents::created_at.desc(), user_presents::id.asc()))
            .offset(offset)
            .limit(limit)
            .load(self.conn())
            .await
            .map_err(map_diesel_error)?;
        convert_rows(rows)
    }

    async fn replace_token_record(
        &mut self,
        record: &OneTimeTokenRecord,
        now: i64,
    ) -> Result<(), GameStoreError> {
        diesel::update(
            user_one_time_tokens::table
                .filter(user_one_time_tokens::user_id.eq(record.user_id.as_db()))
                .filter(user_one_time_tokens::deleted_at.is_null()),
        )
        .set((
            user_one_time_tokens::deleted_at.eq(Some(now)),
            user_one_time_tokens::updated_at.eq(now),
        ))
        .execute(self.conn())
        .await
        .map_err(map_diesel_error)?;
        diesel::insert_into(user_one_time_tokens::table)
            .values(NewOneTimeTokenRow::from(record))
            .execute(self.conn())
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn retire_token_record(
        &mut self,
        user_id: UserId,
        token: &str,
        now: i64,
    ) -> Result<(), GameStoreError> {
        diesel::update(
            user_one_time_tokens::table
                .filter(user_one_time_tokens::user_id.eq(user_id.as_db()))
                .filter(user_one_time_tokens::token.eq(token))
                .filter(user_one_time_tokens::deleted_at.is_null()),
        )
        .set((
            user_one_time_tokens::deleted_at.eq(Some(now)),
            user_one_time_tokens::updated_at.eq(now),
        ))
        .execute(self.conn())
        .await
        .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn commit(mut self) -> Result<(), GameStoreError> {
        AnsiTransactionManager::commit_transaction(self.conn())
            .await
            .map_err(map_diesel_error)?;
        debug!(shard = self.shard, "game transaction committed");
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), GameStoreError> {
        AnsiTransactionManager::rollback_transaction(self.conn())
            .await
            .map_err(map_diesel_error)?;
        debug!(shard = self.shard, "game transaction rolled back");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    use crate::domain::ItemKind;

    fn item_row(item_type: i32) -> UserItemRow {
        UserItemRow {
            id: 1,
            user_id: 2,
            item_type,
            item_id: 11,
            amount: 3,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[rstest]
    fn rows_convert_when_every_kind_is_known() {
        let items: Vec<UserItem> =
            convert_rows(vec![item_row(3), item_row(4)]).expect("known kinds");
        let kinds: Vec<ItemKind> = items.iter().map(|item| item.item_type).collect();
        assert_eq!(kinds, vec![ItemKind::ExpMaterial, ItemKind::TimerMaterial]);
    }

    #[rstest]
    fn one_unknown_kind_marks_the_result_corrupt() {
        let result: Result<Vec<UserItem>, _> = convert_rows(vec![item_row(3), item_row(7)]);
        assert!(matches!(result, Err(GameStoreError::Corrupt { .. })));
    }
}
