//! Port for shard-local game transactions.
//!
//! A [`GameStore`] opens one transaction on the shard owning a user. Every
//! read and write of a game operation goes through the returned
//! [`GameTransaction`], which is either committed or rolled back as a unit.
//! Dropping a transaction without committing discards its writes.

use async_trait::async_trait;

use crate::domain::{
    OneTimeTokenRecord, User, UserCard, UserDeck, UserDevice, UserId, UserItem, UserLoginBonus,
    UserPresent, UserPresentAllReceivedHistory,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by game store adapters.
    pub enum GameStoreError {
        /// Shard connection could not be established.
        Connection { message: String } => "game store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "game store query failed: {message}",
        /// Stored data could not be mapped into domain types.
        Corrupt { message: String } => "game store returned invalid data: {message}",
    }
}

/// Opens shard-local transactions.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Transaction handle bound to one shard connection.
    type Transaction: GameTransaction;

    /// Begin a transaction on the shard that owns `user_id`.
    async fn begin(&self, user_id: UserId) -> Result<Self::Transaction, GameStoreError>;
}

/// Reads and writes executed inside one shard transaction.
///
/// All queries are scoped to the owning user. Soft-deleted rows are
/// invisible to the `find_*`/`list_*` methods.
#[async_trait]
pub trait GameTransaction: Send {
    /// Fetch a user row.
    async fn find_user(&mut self, user_id: UserId) -> Result<Option<User>, GameStoreError>;

    /// Fetch a user row and hold a write lock on it until the transaction ends.
    async fn lock_user(&mut self, user_id: UserId) -> Result<Option<User>, GameStoreError>;

    /// Insert a new user row.
    async fn insert_user(&mut self, user: &User) -> Result<(), GameStoreError>;

    /// Persist balance and activity columns of an existing user.
    async fn update_user(&mut self, user: &User) -> Result<(), GameStoreError>;

    /// Insert a device binding.
    async fn insert_device(&mut self, device: &UserDevice) -> Result<(), GameStoreError>;

    /// Insert new card instances.
    async fn insert_cards(&mut self, cards: &[UserCard]) -> Result<(), GameStoreError>;

    /// Fetch the user's cards among `card_ids`.
    async fn find_cards(
        &mut self,
        user_id: UserId,
        card_ids: &[i64],
    ) -> Result<Vec<UserCard>, GameStoreError>;

    /// Every card the user owns.
    async fn list_cards(&mut self, user_id: UserId) -> Result<Vec<UserCard>, GameStoreError>;

    /// Persist level, experience and yield of a card.
    async fn update_card(&mut self, card: &UserCard) -> Result<(), GameStoreError>;

    /// The user's non-deleted deck, if any.
    async fn find_active_deck(&mut self, user_id: UserId) -> Result<Option<UserDeck>, GameStoreError>;

    /// Soft-delete every active deck of the user.
    async fn retire_decks(&mut self, user_id: UserId, now: i64) -> Result<(), GameStoreError>;

    /// Insert a new active deck.
    async fn insert_deck(&mut self, deck: &UserDeck) -> Result<(), GameStoreError>;

    /// Stackable rows of the user for the given item master ids.
    async fn find_items_by_item_ids(
        &mut self,
        user_id: UserId,
        item_ids: &[i64],
    ) -> Result<Vec<UserItem>, GameStoreError>;

    /// Stackable rows of the user by row id.
    async fn find_items(
        &mut self,
        user_id: UserId,
        ids: &[i64],
    ) -> Result<Vec<UserItem>, GameStoreError>;

    /// Every stackable row of the user.
    async fn list_items(&mut self, user_id: UserId) -> Result<Vec<UserItem>, GameStoreError>;

    /// Insert new rows or overwrite amounts of existing ones, keyed by row id.
    async fn upsert_items(&mut self, items: &[UserItem]) -> Result<(), GameStoreError>;

    /// Progress of the user through one login bonus.
    async fn find_login_bonus(
        &mut self,
        user_id: UserId,
        login_bonus_id: i64,
    ) -> Result<Option<UserLoginBonus>, GameStoreError>;

    /// Insert or update login bonus progress, keyed by row id.
    async fn save_login_bonus(&mut self, progress: &UserLoginBonus) -> Result<(), GameStoreError>;

    /// Global present ids among `present_all_ids` already delivered to the user.
    async fn received_present_all_ids(
        &mut self,
        user_id: UserId,
        present_all_ids: &[i64],
    ) -> Result<Vec<i64>, GameStoreError>;

    /// Record delivered global presents.
    async fn insert_present_all_histories(
        &mut self,
        histories: &[UserPresentAllReceivedHistory],
    ) -> Result<(), GameStoreError>;

    /// Put presents into the user's mailbox.
    async fn insert_presents(&mut self, presents: &[UserPresent]) -> Result<(), GameStoreError>;

    /// Uncollected presents of the user among `present_ids`.
    async fn find_open_presents(
        &mut self,
        user_id: UserId,
        present_ids: &[i64],
    ) -> Result<Vec<UserPresent>, GameStoreError>;

    /// Soft-delete collected presents.
    async fn retire_presents(
        &mut self,
        user_id: UserId,
        present_ids: &[i64],
        now: i64,
    ) -> Result<(), GameStoreError>;

    /// Page of uncollected presents, newest first then by id.
    async fn list_open_presents(
        &mut self,
        user_id: UserId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<UserPresent>, GameStoreError>;

    /// Soft-delete the user's live token rows and insert `record`.
    async fn replace_token_record(
        &mut self,
        record: &OneTimeTokenRecord,
        now: i64,
    ) -> Result<(), GameStoreError>;

    /// Soft-delete the audit row of a used or expired token.
    async fn retire_token_record(
        &mut self,
        user_id: UserId,
        token: &str,
        now: i64,
    ) -> Result<(), GameStoreError>;

    /// Make every write of the transaction durable.
    async fn commit(self) -> Result<(), GameStoreError>
    where
        Self: Sized;

    /// Discard every write of the transaction.
    async fn rollback(self) -> Result<(), GameStoreError>
    where
        Self: Sized;
}
