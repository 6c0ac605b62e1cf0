//! In-memory shard store.
//!
//! A transaction works on a private copy of the state and publishes it on
//! commit; dropping or rolling back discards the copy. Concurrent
//! transactions are last-writer-wins, so tests drive one user operation at a
//! time.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::domain::ports::{
    AccessLookup, AccessLookupError, GameStore, GameStoreError, GameTransaction,
};
use crate::domain::{
    OneTimeTokenRecord, User, UserCard, UserDeck, UserDevice, UserId, UserItem, UserLoginBonus,
    UserPresent, UserPresentAllReceivedHistory,
};

/// A token audit row and its soft-delete marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredToken {
    pub record: OneTimeTokenRecord,
    pub deleted_at: Option<i64>,
}

/// Every per-user table of one shard.
#[derive(Debug, Clone, Default)]
pub struct GameState {
    pub users: BTreeMap<UserId, User>,
    pub devices: Vec<UserDevice>,
    pub bans: BTreeSet<UserId>,
    pub cards: Vec<UserCard>,
    pub decks: Vec<UserDeck>,
    pub items: Vec<UserItem>,
    pub login_bonuses: Vec<UserLoginBonus>,
    pub present_all_histories: Vec<UserPresentAllReceivedHistory>,
    pub presents: Vec<UserPresent>,
    pub tokens: Vec<StoredToken>,
}

impl GameState {
    /// Non-deleted decks of a user.
    pub fn active_decks(&self, user_id: UserId) -> Vec<&UserDeck> {
        self.decks
            .iter()
            .filter(|deck| deck.user_id == user_id && deck.deleted_at.is_none())
            .collect()
    }

    /// Uncollected presents of a user.
    pub fn open_presents(&self, user_id: UserId) -> Vec<&UserPresent> {
        self.presents
            .iter()
            .filter(|present| present.user_id == user_id && present.deleted_at.is_none())
            .collect()
    }

    /// Stack size of one item for a user, zero when absent.
    pub fn item_amount(&self, user_id: UserId, item_id: i64) -> i64 {
        self.items
            .iter()
            .filter(|row| row.user_id == user_id && row.item_id == item_id)
            .map(|row| row.amount)
            .sum()
    }

    /// Cards owned by a user.
    pub fn cards_of(&self, user_id: UserId) -> Vec<&UserCard> {
        self.cards.iter().filter(|card| card.user_id == user_id).collect()
    }
}

/// Shared in-memory shard.
#[derive(Debug, Default)]
pub struct InMemoryGameStore {
    state: Arc<Mutex<GameState>>,
    fail_commits: Arc<AtomicBool>,
    begun: AtomicUsize,
    journal: Arc<Mutex<Vec<&'static str>>>,
}

impl InMemoryGameStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the committed state.
    pub fn state(&self) -> GameState {
        lock(&self.state).clone()
    }

    /// Mutate the committed state directly.
    pub fn update(&self, mutate: impl FnOnce(&mut GameState)) {
        mutate(&mut lock(&self.state));
    }

    /// Ban a user.
    pub fn ban(&self, user_id: UserId) {
        self.update(|state| {
            state.bans.insert(user_id);
        });
    }

    /// Make every later commit fail with a connection error.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Number of transactions opened so far.
    pub fn transactions_begun(&self) -> usize {
        self.begun.load(Ordering::SeqCst)
    }

    /// Row locks, card and item reads, and their writes, in call order.
    pub fn journal(&self) -> Vec<&'static str> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

fn lock(state: &Mutex<GameState>) -> std::sync::MutexGuard<'_, GameState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl GameStore for InMemoryGameStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self, _user_id: UserId) -> Result<Self::Transaction, GameStoreError> {
        self.begun.fetch_add(1, Ordering::SeqCst);
        Ok(InMemoryTransaction {
            working: self.state(),
            shared: Arc::clone(&self.state),
            fail_commit: Arc::clone(&self.fail_commits),
            journal: Arc::clone(&self.journal),
        })
    }
}

#[async_trait]
impl AccessLookup for InMemoryGameStore {
    async fn is_banned(&self, user_id: UserId) -> Result<bool, AccessLookupError> {
        Ok(lock(&self.state).bans.contains(&user_id))
    }

    async fn has_device(&self, user_id: UserId, viewer_id: &str) -> Result<bool, AccessLookupError> {
        Ok(lock(&self.state)
            .devices
            .iter()
            .any(|device| device.user_id == user_id && device.platform_id == viewer_id))
    }
}

/// Transaction over a private copy of the shard state.
#[derive(Debug)]
pub struct InMemoryTransaction {
    working: GameState,
    shared: Arc<Mutex<GameState>>,
    fail_commit: Arc<AtomicBool>,
    journal: Arc<Mutex<Vec<&'static str>>>,
}

impl InMemoryTransaction {
    fn note(&self, call: &'static str) {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }
}

fn missing(what: &str, id: i64) -> GameStoreError {
    GameStoreError::query(format!("{what} {id} does not exist"))
}

#[async_trait]
impl GameTransaction for InMemoryTransaction {
    async fn find_user(&mut self, user_id: UserId) -> Result<Option<User>, GameStoreError> {
        Ok(self
            .working
            .users
            .get(&user_id)
            .filter(|user| user.deleted_at.is_none())
            .cloned())
    }

    async fn lock_user(&mut self, user_id: UserId) -> Result<Option<User>, GameStoreError> {
        self.note("lock_user");
        self.find_user(user_id).await
    }

    async fn insert_user(&mut self, user: &User) -> Result<(), GameStoreError> {
        if self.working.users.contains_key(&user.id) {
            return Err(GameStoreError::query(format!("user {} already exists", user.id)));
        }
        self.working.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&mut self, user: &User) -> Result<(), GameStoreError> {
        let stored = self
            .working
            .users
            .get_mut(&user.id)
            .ok_or_else(|| missing("user", user.id.as_db()))?;
        *stored = user.clone();
        Ok(())
    }

    async fn insert_device(&mut self, device: &UserDevice) -> Result<(), GameStoreError> {
        self.working.devices.push(device.clone());
        Ok(())
    }

    async fn insert_cards(&mut self, cards: &[UserCard]) -> Result<(), GameStoreError> {
        self.working.cards.extend_from_slice(cards);
        Ok(())
    }

    async fn find_cards(&mut self, user_id: UserId, card_ids: &[i64]) -> Result<Vec<UserCard>, GameStoreError> {
        self.note("find_cards");
        Ok(self
            .working
            .cards
            .iter()
            .filter(|card| card.user_id == user_id && card_ids.contains(&card.id))
            .cloned()
            .collect())
    }

    async fn list_cards(&mut self, user_id: UserId) -> Result<Vec<UserCard>, GameStoreError> {
        Ok(self.working.cards_of(user_id).into_iter().cloned().collect())
    }

    async fn update_card(&mut self, card: &UserCard) -> Result<(), GameStoreError> {
        self.note("update_card");
        let stored = self
            .working
            .cards
            .iter_mut()
            .find(|stored| stored.id == card.id)
            .ok_or_else(|| missing("card", card.id))?;
        *stored = card.clone();
        Ok(())
    }

    async fn find_active_deck(&mut self, user_id: UserId) -> Result<Option<UserDeck>, GameStoreError> {
        Ok(self.working.active_decks(user_id).last().map(|deck| (*deck).clone()))
    }

    async fn retire_decks(&mut self, user_id: UserId, now: i64) -> Result<(), GameStoreError> {
        self.note("retire_decks");
        for deck in self
            .working
            .decks
            .iter_mut()
            .filter(|deck| deck.user_id == user_id && deck.deleted_at.is_none())
        {
            deck.deleted_at = Some(now);
            deck.updated_at = now;
        }
        Ok(())
    }

    async fn insert_deck(&mut self, deck: &UserDeck) -> Result<(), GameStoreError> {
        self.working.decks.push(deck.clone());
        Ok(())
    }

    async fn find_items_by_item_ids(
        &mut self,
        user_id: UserId,
        item_ids: &[i64],
    ) -> Result<Vec<UserItem>, GameStoreError> {
        Ok(self
            .working
            .items
            .iter()
            .filter(|row| row.user_id == user_id && item_ids.contains(&row.item_id))
            .cloned()
            .collect())
    }

    async fn find_items(&mut self, user_id: UserId, ids: &[i64]) -> Result<Vec<UserItem>, GameStoreError> {
        self.note("find_items");
        Ok(self
            .working
            .items
            .iter()
            .filter(|row| row.user_id == user_id && ids.contains(&row.id))
            .cloned()
            .collect())
    }

    async fn list_items(&mut self, user_id: UserId) -> Result<Vec<UserItem>, GameStoreError> {
        Ok(self
            .working
            .items
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert_items(&mut self, items: &[UserItem]) -> Result<(), GameStoreError> {
        self.note("upsert_items");
        for item in items {
            self.working.items.retain(|row| row.id != item.id);
            self.working.items.push(item.clone());
        }
        Ok(())
    }

    async fn find_login_bonus(
        &mut self,
        user_id: UserId,
        login_bonus_id: i64,
    ) -> Result<Option<UserLoginBonus>, GameStoreError> {
        Ok(self
            .working
            .login_bonuses
            .iter()
            .find(|row| row.user_id == user_id && row.login_bonus_id == login_bonus_id)
            .cloned())
    }

    async fn save_login_bonus(&mut self, progress: &UserLoginBonus) -> Result<(), GameStoreError> {
        self.working.login_bonuses.retain(|row| row.id != progress.id);
        self.working.login_bonuses.push(progress.clone());
        Ok(())
    }

    async fn received_present_all_ids(
        &mut self,
        user_id: UserId,
        present_all_ids: &[i64],
    ) -> Result<Vec<i64>, GameStoreError> {
        Ok(self
            .working
            .present_all_histories
            .iter()
            .filter(|row| row.user_id == user_id && present_all_ids.contains(&row.present_all_id))
            .map(|row| row.present_all_id)
            .collect())
    }

    async fn insert_present_all_histories(
        &mut self,
        histories: &[UserPresentAllReceivedHistory],
    ) -> Result<(), GameStoreError> {
        self.working.present_all_histories.extend_from_slice(histories);
        Ok(())
    }

    async fn insert_presents(&mut self, presents: &[UserPresent]) -> Result<(), GameStoreError> {
        self.working.presents.extend_from_slice(presents);
        Ok(())
    }

    async fn find_open_presents(
        &mut self,
        user_id: UserId,
        present_ids: &[i64],
    ) -> Result<Vec<UserPresent>, GameStoreError> {
        Ok(self
            .working
            .open_presents(user_id)
            .into_iter()
            .filter(|present| present_ids.contains(&present.id))
            .cloned()
            .collect())
    }

    async fn retire_presents(
        &mut self,
        user_id: UserId,
        present_ids: &[i64],
        now: i64,
    ) -> Result<(), GameStoreError> {
        for present in self.working.presents.iter_mut().filter(|present| {
            present.user_id == user_id
                && present.deleted_at.is_none()
                && present_ids.contains(&present.id)
        }) {
            present.deleted_at = Some(now);
            present.updated_at = now;
        }
        Ok(())
    }

    async fn list_open_presents(
        &mut self,
        user_id: UserId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<UserPresent>, GameStoreError> {
        let mut open: Vec<UserPresent> = self
            .working
            .open_presents(user_id)
            .into_iter()
            .cloned()
            .collect();
        open.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(0);
        Ok(open.into_iter().skip(skip).take(take).collect())
    }

    async fn replace_token_record(&mut self, record: &OneTimeTokenRecord, now: i64) -> Result<(), GameStoreError> {
        for stored in self
            .working
            .tokens
            .iter_mut()
            .filter(|stored| stored.record.user_id == record.user_id && stored.deleted_at.is_none())
        {
            stored.deleted_at = Some(now);
            stored.record.updated_at = now;
        }
        self.working.tokens.push(StoredToken {
            record: record.clone(),
            deleted_at: None,
        });
        Ok(())
    }

    async fn retire_token_record(&mut self, user_id: UserId, token: &str, now: i64) -> Result<(), GameStoreError> {
        for stored in self.working.tokens.iter_mut().filter(|stored| {
            stored.record.user_id == user_id && stored.record.token == token && stored.deleted_at.is_none()
        }) {
            stored.deleted_at = Some(now);
            stored.record.updated_at = now;
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), GameStoreError> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(GameStoreError::connection("commit refused"));
        }
        *lock(&self.shared) = self.working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), GameStoreError> {
        Ok(())
    }
}
