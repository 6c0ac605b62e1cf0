//! Account creation, login and the once-per-day login processing.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::ports::{GameStore, GameTransaction};
use crate::domain::rewards::{BonusProgress, GrantBatch, advance_login_bonus};
use crate::domain::{
    Error, ItemKind, ItemMaster, MasterSnapshot, PlatformType, UpdatedResources, User, UserDeck,
    UserDevice, UserId, UserLoginBonus, UserPresent, UserPresentAllReceivedHistory, reason,
};

use super::grants::Granted;
use super::{GameService, map_access_error, map_store_error, non_empty};

/// Card template every new account starts with.
pub const INITIAL_CARD_ITEM_ID: i64 = 2;

/// Registration input, validated by [`GameService::create_user`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUserRequest {
    pub viewer_id: String,
    pub platform_type: i32,
}

/// Result of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserResponse {
    pub user_id: UserId,
    pub viewer_id: String,
    pub session_id: String,
    pub created_at: i64,
    pub updated_resources: UpdatedResources,
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub viewer_id: String,
    pub session_id: String,
    pub updated_resources: UpdatedResources,
}

struct NewAccount<'a> {
    user_id: UserId,
    viewer_id: &'a str,
    platform_type: PlatformType,
    now: i64,
}

/// Rows written by one run of login processing.
#[derive(Default)]
struct LoginGrants {
    login_bonuses: Vec<UserLoginBonus>,
    presents: Vec<UserPresent>,
    granted: Granted,
}

impl<G> GameService<G>
where
    G: GameStore,
{
    /// Register a user with a device binding, a starter deck and a session.
    pub async fn create_user(&self, request: CreateUserRequest, now: i64) -> Result<CreateUserResponse, Error> {
        if request.viewer_id.trim().is_empty() {
            return Err(Error::invalid_request(reason::INVALID_REQUEST_BODY));
        }
        let platform_type = PlatformType::new(request.platform_type).map_err(|err| {
            Error::invalid_request(reason::INVALID_REQUEST_BODY)
                .with_details(serde_json::json!({ "platformType": err.0 }))
        })?;
        let user_id = self.ids.next_user_id();
        let account = NewAccount {
            user_id,
            viewer_id: &request.viewer_id,
            platform_type,
            now,
        };

        let resources = self
            .bounded("create_user", async {
                let snapshot = self.snapshot(user_id).await?;
                let starter = snapshot
                    .item(INITIAL_CARD_ITEM_ID)
                    .filter(|item| item.item_type == ItemKind::Card)
                    .ok_or_else(|| Error::not_found(reason::ITEM_NOT_FOUND))?;
                let mut tx = self.begin(user_id).await?;
                let outcome = self.register(&mut tx, &snapshot, &account, starter).await;
                Self::finish(tx, outcome).await
            })
            .await?;
        self.access.remember_device(user_id, &request.viewer_id);
        let session = self.bounded("create_user", self.open_session(user_id)).await?;
        info!(%user_id, "user registered");

        Ok(CreateUserResponse {
            user_id,
            viewer_id: request.viewer_id,
            session_id: session.session_id,
            created_at: now,
            updated_resources: resources,
        })
    }

    async fn register(
        &self,
        tx: &mut G::Transaction,
        snapshot: &MasterSnapshot,
        account: &NewAccount<'_>,
        starter: &ItemMaster,
    ) -> Result<UpdatedResources, Error> {
        let NewAccount {
            user_id,
            viewer_id,
            platform_type,
            now,
        } = *account;
        let mut user = User::register(user_id, now);
        tx.insert_user(&user).await.map_err(map_store_error)?;

        let device = UserDevice {
            id: self.ids.next_id(),
            user_id,
            platform_id: viewer_id.to_owned(),
            platform_type,
            created_at: now,
            updated_at: now,
        };
        tx.insert_device(&device).await.map_err(map_store_error)?;

        let starter_cards = [
            self.new_card(user_id, starter, now)?,
            self.new_card(user_id, starter, now)?,
            self.new_card(user_id, starter, now)?,
        ];
        tx.insert_cards(&starter_cards).await.map_err(map_store_error)?;

        let [first, second, third] = &starter_cards;
        let deck = UserDeck {
            id: self.ids.next_id(),
            user_id,
            user_card_id_1: first.id,
            user_card_id_2: second.id,
            user_card_id_3: third.id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tx.insert_deck(&deck).await.map_err(map_store_error)?;

        let grants = self.process_login(tx, snapshot, &mut user, now).await?;
        tx.update_user(&user).await.map_err(map_store_error)?;

        let mut cards = starter_cards.to_vec();
        cards.extend(grants.granted.cards);
        Ok(UpdatedResources {
            user: Some(user),
            user_device: Some(device),
            user_cards: Some(cards),
            user_decks: Some(vec![deck]),
            user_items: non_empty(grants.granted.items),
            user_login_bonuses: Some(grants.login_bonuses),
            user_presents: Some(grants.presents),
            ..UpdatedResources::at(now)
        })
    }

    /// Log a user in from a registered device and issue a session.
    ///
    /// Login bonuses and global presents are processed at most once per
    /// calendar day; later logins on the same day only refresh the activity
    /// timestamp.
    pub async fn login(&self, user_id: UserId, viewer_id: &str, now: i64) -> Result<LoginResponse, Error> {
        self.bounded("login", async {
            let snapshot = self.snapshot(user_id).await?;
            if self.access.is_banned(user_id).await.map_err(map_access_error)? {
                warn!(%user_id, "banned user attempted to log in");
                return Err(Error::forbidden(reason::FORBIDDEN));
            }
            self.ensure_device(user_id, viewer_id).await?;
            let mut tx = self.begin(user_id).await?;
            let outcome = self.login_in(&mut tx, &snapshot, user_id, now).await;
            let resources = Self::finish(tx, outcome).await?;
            let session = self.open_session(user_id).await?;
            Ok(LoginResponse {
                viewer_id: viewer_id.to_owned(),
                session_id: session.session_id,
                updated_resources: resources,
            })
        })
        .await
    }

    async fn login_in(
        &self,
        tx: &mut G::Transaction,
        snapshot: &MasterSnapshot,
        user_id: UserId,
        now: i64,
    ) -> Result<UpdatedResources, Error> {
        let mut user = tx
            .lock_user(user_id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| Error::not_found(reason::USER_NOT_FOUND))?;

        let already_today = self.settings.calendar.same_day(user.last_activated_at, now);
        let grants = if already_today {
            debug!(%user_id, "login already processed today");
            LoginGrants::default()
        } else {
            self.process_login(tx, snapshot, &mut user, now).await?
        };
        user.last_activated_at = now;
        user.updated_at = now;
        tx.update_user(&user).await.map_err(map_store_error)?;

        let mut resources = UpdatedResources {
            user: Some(user),
            ..UpdatedResources::at(now)
        };
        if !already_today {
            resources.user_cards = non_empty(grants.granted.cards);
            resources.user_items = non_empty(grants.granted.items);
            resources.user_login_bonuses = Some(grants.login_bonuses);
            resources.user_presents = Some(grants.presents);
        }
        Ok(resources)
    }

    /// Advance every active login bonus and deliver pending global presents.
    async fn process_login(
        &self,
        tx: &mut G::Transaction,
        snapshot: &MasterSnapshot,
        user: &mut User,
        now: i64,
    ) -> Result<LoginGrants, Error> {
        let user_id = user.id;
        let mut batch = GrantBatch::default();
        let mut login_bonuses = Vec::new();
        for bonus in snapshot.active_login_bonuses(now) {
            let stored = tx
                .find_login_bonus(user_id, bonus.id)
                .await
                .map_err(map_store_error)?;
            let current = stored.as_ref().map_or(BonusProgress::INITIAL, |row| BonusProgress {
                last_reward_sequence: row.last_reward_sequence,
                loop_count: row.loop_count,
            });
            let Some(next) = advance_login_bonus(current, bonus) else {
                continue;
            };
            let reward = snapshot
                .login_bonus_reward(bonus.id, next.last_reward_sequence)
                .ok_or_else(|| {
                    warn!(
                        login_bonus_id = bonus.id,
                        sequence = next.last_reward_sequence,
                        "login bonus reward step missing from master data"
                    );
                    Error::internal(reason::LOGIN_BONUS_REWARD_NOT_FOUND)
                })?;
            batch.push(reward.item_type, reward.item_id, reward.amount);

            let row = stored.map_or_else(
                || UserLoginBonus {
                    id: self.ids.next_id(),
                    user_id,
                    login_bonus_id: bonus.id,
                    last_reward_sequence: next.last_reward_sequence,
                    loop_count: next.loop_count,
                    created_at: now,
                    updated_at: now,
                },
                |row| UserLoginBonus {
                    last_reward_sequence: next.last_reward_sequence,
                    loop_count: next.loop_count,
                    updated_at: now,
                    ..row
                },
            );
            tx.save_login_bonus(&row).await.map_err(map_store_error)?;
            login_bonuses.push(row);
        }

        let presents = self.deliver_present_alls(tx, snapshot, user_id, now).await?;
        let granted = self.apply_grants(tx, snapshot, user, batch, now).await?;
        Ok(LoginGrants {
            login_bonuses,
            presents,
            granted,
        })
    }

    /// Mail every active global present the user has not received yet.
    async fn deliver_present_alls(
        &self,
        tx: &mut G::Transaction,
        snapshot: &MasterSnapshot,
        user_id: UserId,
        now: i64,
    ) -> Result<Vec<UserPresent>, Error> {
        let active = snapshot.active_present_alls(now);
        if active.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = active.iter().map(|present| present.id).collect();
        let received: HashSet<i64> = tx
            .received_present_all_ids(user_id, &ids)
            .await
            .map_err(map_store_error)?
            .into_iter()
            .collect();

        let mut presents = Vec::new();
        let mut histories = Vec::new();
        for present_all in active.into_iter().filter(|p| !received.contains(&p.id)) {
            presents.push(UserPresent {
                id: self.ids.next_id(),
                user_id,
                sent_at: now,
                item_type: present_all.item_type,
                item_id: present_all.item_id,
                amount: present_all.amount,
                present_message: present_all.present_message.clone(),
                created_at: now,
                updated_at: now,
                deleted_at: None,
            });
            histories.push(UserPresentAllReceivedHistory {
                id: self.ids.next_id(),
                user_id,
                present_all_id: present_all.id,
                received_at: now,
                created_at: now,
                updated_at: now,
            });
        }
        if !presents.is_empty() {
            tx.insert_presents(&presents).await.map_err(map_store_error)?;
            tx.insert_present_all_histories(&histories)
                .await
                .map_err(map_store_error)?;
        }
        Ok(presents)
    }
}
