//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain types validate
//! enumerated columns and fail with [`InvalidRow`].

use diesel::prelude::*;

use crate::domain::{
    GachaItemMaster, GachaMaster, ItemKind, ItemMaster, LoginBonusMaster, LoginBonusRewardMaster,
    OneTimeTokenRecord, PlatformType, PresentAllMaster, TokenType, User, UserCard, UserDeck,
    UserDevice, UserId, UserItem, UserLoginBonus, UserPresent, UserPresentAllReceivedHistory,
};

use super::schema::{
    gacha_item_masters, gacha_masters, item_masters, login_bonus_masters,
    login_bonus_reward_masters, present_all_masters, user_cards, user_decks, user_devices,
    user_items, user_login_bonuses, user_one_time_tokens, user_present_all_received_history,
    user_presents, users,
};

/// A stored row holds a value the domain cannot represent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{table} row {id}: {reason}")]
pub(crate) struct InvalidRow {
    pub table: &'static str,
    pub id: i64,
    pub reason: String,
}

fn item_kind(table: &'static str, id: i64, raw: i32) -> Result<ItemKind, InvalidRow> {
    ItemKind::try_from(raw).map_err(|err| InvalidRow {
        table,
        id,
        reason: err.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Master tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = item_masters)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ItemMasterRow {
    pub id: i64,
    pub item_type: i32,
    pub name: String,
    pub description: String,
    pub amount_per_sec: Option<i64>,
    pub max_level: Option<i32>,
    pub max_amount_per_sec: Option<i64>,
    pub base_exp_per_level: Option<i64>,
    pub gained_exp: Option<i64>,
    pub shortening_min: Option<i64>,
    pub created_at: i64,
}

impl TryFrom<ItemMasterRow> for ItemMaster {
    type Error = InvalidRow;

    fn try_from(row: ItemMasterRow) -> Result<Self, Self::Error> {
        Ok(Self {
            item_type: item_kind("item_masters", row.id, row.item_type)?,
            id: row.id,
            name: row.name,
            description: row.description,
            amount_per_sec: row.amount_per_sec,
            max_level: row.max_level,
            max_amount_per_sec: row.max_amount_per_sec,
            base_exp_per_level: row.base_exp_per_level,
            gained_exp: row.gained_exp,
            shortening_min: row.shortening_min,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = gacha_masters)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct GachaMasterRow {
    pub id: i64,
    pub name: String,
    pub start_at: i64,
    pub end_at: i64,
    pub display_order: i32,
    pub created_at: i64,
}

impl From<GachaMasterRow> for GachaMaster {
    fn from(row: GachaMasterRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            start_at: row.start_at,
            end_at: row.end_at,
            display_order: row.display_order,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = gacha_item_masters)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct GachaItemMasterRow {
    pub id: i64,
    pub gacha_id: i64,
    pub item_type: i32,
    pub item_id: i64,
    pub amount: i64,
    pub weight: i64,
    pub created_at: i64,
}

impl TryFrom<GachaItemMasterRow> for GachaItemMaster {
    type Error = InvalidRow;

    fn try_from(row: GachaItemMasterRow) -> Result<Self, Self::Error> {
        Ok(Self {
            item_type: item_kind("gacha_item_masters", row.id, row.item_type)?,
            id: row.id,
            gacha_id: row.gacha_id,
            item_id: row.item_id,
            amount: row.amount,
            weight: row.weight,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = login_bonus_masters)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct LoginBonusMasterRow {
    pub id: i64,
    pub start_at: i64,
    pub end_at: i64,
    pub column_count: i32,
    pub looped: bool,
    pub created_at: i64,
}

impl From<LoginBonusMasterRow> for LoginBonusMaster {
    fn from(row: LoginBonusMasterRow) -> Self {
        Self {
            id: row.id,
            start_at: row.start_at,
            end_at: row.end_at,
            column_count: row.column_count,
            looped: row.looped,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = login_bonus_reward_masters)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct LoginBonusRewardMasterRow {
    pub id: i64,
    pub login_bonus_id: i64,
    pub reward_sequence: i32,
    pub item_type: i32,
    pub item_id: i64,
    pub amount: i64,
    pub created_at: i64,
}

impl TryFrom<LoginBonusRewardMasterRow> for LoginBonusRewardMaster {
    type Error = InvalidRow;

    fn try_from(row: LoginBonusRewardMasterRow) -> Result<Self, Self::Error> {
        Ok(Self {
            item_type: item_kind("login_bonus_reward_masters", row.id, row.item_type)?,
            id: row.id,
            login_bonus_id: row.login_bonus_id,
            reward_sequence: row.reward_sequence,
            item_id: row.item_id,
            amount: row.amount,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = present_all_masters)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PresentAllMasterRow {
    pub id: i64,
    pub registered_start_at: i64,
    pub registered_end_at: i64,
    pub item_type: i32,
    pub item_id: i64,
    pub amount: i64,
    pub present_message: String,
    pub created_at: i64,
}

impl TryFrom<PresentAllMasterRow> for PresentAllMaster {
    type Error = InvalidRow;

    fn try_from(row: PresentAllMasterRow) -> Result<Self, Self::Error> {
        Ok(Self {
            item_type: item_kind("present_all_masters", row.id, row.item_type)?,
            id: row.id,
            registered_start_at: row.registered_start_at,
            registered_end_at: row.registered_end_at,
            item_id: row.item_id,
            amount: row.amount,
            present_message: row.present_message,
            created_at: row.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Per-user tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: i64,
    pub isu_coin: i64,
    pub last_getreward_at: i64,
    pub last_activated_at: i64,
    pub registered_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.as_db(),
            isu_coin: user.isu_coin,
            last_getreward_at: user.last_getreward_at,
            last_activated_at: user.last_activated_at,
            registered_at: user.registered_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
            deleted_at: user.deleted_at,
        }
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from_db(row.id),
            isu_coin: row.isu_coin,
            last_getreward_at: row.last_getreward_at,
            last_activated_at: row.last_activated_at,
            registered_at: row.registered_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_devices)]
pub(crate) struct NewUserDeviceRow<'a> {
    pub id: i64,
    pub user_id: i64,
    pub platform_id: &'a str,
    pub platform_type: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl<'a> From<&'a UserDevice> for NewUserDeviceRow<'a> {
    fn from(device: &'a UserDevice) -> Self {
        Self {
            id: device.id,
            user_id: device.user_id.as_db(),
            platform_id: &device.platform_id,
            platform_type: PlatformType::get(device.platform_type),
            created_at: device.created_at,
            updated_at: device.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = user_cards)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserCardRow {
    pub id: i64,
    pub user_id: i64,
    pub card_id: i64,
    pub amount_per_sec: i64,
    pub level: i32,
    pub total_exp: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&UserCard> for UserCardRow {
    fn from(card: &UserCard) -> Self {
        Self {
            id: card.id,
            user_id: card.user_id.as_db(),
            card_id: card.card_id,
            amount_per_sec: card.amount_per_sec,
            level: card.level,
            total_exp: card.total_exp,
            created_at: card.created_at,
            updated_at: card.updated_at,
        }
    }
}

impl From<UserCardRow> for UserCard {
    fn from(row: UserCardRow) -> Self {
        Self {
            id: row.id,
            user_id: UserId::from_db(row.user_id),
            card_id: row.card_id,
            amount_per_sec: row.amount_per_sec,
            level: row.level,
            total_exp: row.total_exp,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = user_decks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserDeckRow {
    pub id: i64,
    pub user_id: i64,
    pub user_card_id_1: i64,
    pub user_card_id_2: i64,
    pub user_card_id_3: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl From<&UserDeck> for UserDeckRow {
    fn from(deck: &UserDeck) -> Self {
        Self {
            id: deck.id,
            user_id: deck.user_id.as_db(),
            user_card_id_1: deck.user_card_id_1,
            user_card_id_2: deck.user_card_id_2,
            user_card_id_3: deck.user_card_id_3,
            created_at: deck.created_at,
            updated_at: deck.updated_at,
            deleted_at: deck.deleted_at,
        }
    }
}

impl From<UserDeckRow> for UserDeck {
    fn from(row: UserDeckRow) -> Self {
        Self {
            id: row.id,
            user_id: UserId::from_db(row.user_id),
            user_card_id_1: row.user_card_id_1,
            user_card_id_2: row.user_card_id_2,
            user_card_id_3: row.user_card_id_3,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = user_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserItemRow {
    pub id: i64,
    pub user_id: i64,
    pub item_type: i32,
    pub item_id: i64,
    pub amount: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&UserItem> for UserItemRow {
    fn from(item: &UserItem) -> Self {
        Self {
            id: item.id,
            user_id: item.user_id.as_db(),
            item_type: item.item_type.as_i32(),
            item_id: item.item_id,
            amount: item.amount,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

impl TryFrom<UserItemRow> for UserItem {
    type Error = InvalidRow;

    fn try_from(row: UserItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            item_type: item_kind("user_items", row.id, row.item_type)?,
            id: row.id,
            user_id: UserId::from_db(row.user_id),
            item_id: row.item_id,
            amount: row.amount,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = user_presents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserPresentRow {
    pub id: i64,
    pub user_id: i64,
    pub sent_at: i64,
    pub item_type: i32,
    pub item_id: i64,
    pub amount: i64,
    pub present_message: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl From<&UserPresent> for UserPresentRow {
    fn from(present: &UserPresent) -> Self {
        Self {
            id: present.id,
            user_id: present.user_id.as_db(),
            sent_at: present.sent_at,
            item_type: present.item_type.as_i32(),
            item_id: present.item_id,
            amount: present.amount,
            present_message: present.present_message.clone(),
            created_at: present.created_at,
            updated_at: present.updated_at,
            deleted_at: present.deleted_at,
        }
    }
}

impl TryFrom<UserPresentRow> for UserPresent {
    type Error = InvalidRow;

    fn try_from(row: UserPresentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            item_type: item_kind("user_presents", row.id, row.item_type)?,
            id: row.id,
            user_id: UserId::from_db(row.user_id),
            sent_at: row.sent_at,
            item_id: row.item_id,
            amount: row.amount,
            present_message: row.present_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_present_all_received_history)]
pub(crate) struct NewPresentAllHistoryRow {
    pub id: i64,
    pub user_id: i64,
    pub present_all_id: i64,
    pub received_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&UserPresentAllReceivedHistory> for NewPresentAllHistoryRow {
    fn from(history: &UserPresentAllReceivedHistory) -> Self {
        Self {
            id: history.id,
            user_id: history.user_id.as_db(),
            present_all_id: history.present_all_id,
            received_at: history.received_at,
            created_at: history.created_at,
            updated_at: history.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = user_login_bonuses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserLoginBonusRow {
    pub id: i64,
    pub user_id: i64,
    pub login_bonus_id: i64,
    pub last_reward_sequence: i32,
    pub loop_count: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&UserLoginBonus> for UserLoginBonusRow {
    fn from(progress: &UserLoginBonus) -> Self {
        Self {
            id: progress.id,
            user_id: progress.user_id.as_db(),
            login_bonus_id: progress.login_bonus_id,
            last_reward_sequence: progress.last_reward_sequence,
            loop_count: progress.loop_count,
            created_at: progress.created_at,
            updated_at: progress.updated_at,
        }
    }
}

impl From<UserLoginBonusRow> for UserLoginBonus {
    fn from(row: UserLoginBonusRow) -> Self {
        Self {
            id: row.id,
            user_id: UserId::from_db(row.user_id),
            login_bonus_id: row.login_bonus_id,
            last_reward_sequence: row.last_reward_sequence,
            loop_count: row.loop_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_one_time_tokens)]
pub(crate) struct NewOneTimeTokenRow<'a> {
    pub id: i64,
    pub user_id: i64,
    pub token: &'a str,
    pub token_type: i32,
    pub expired_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl<'a> From<&'a OneTimeTokenRecord> for NewOneTimeTokenRow<'a> {
    fn from(record: &'a OneTimeTokenRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id.as_db(),
            token: &record.token,
            token_type: TokenType::as_i32(record.token_type),
            expired_at: record.expired_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn present_row(item_type: i32) -> UserPresentRow {
        UserPresentRow {
            id: 9,
            user_id: 4,
            sent_at: 10,
            item_type,
            item_id: 1,
            amount: 100,
            present_message: "hello".to_owned(),
            created_at: 10,
            updated_at: 10,
            deleted_at: None,
        }
    }

    #[rstest]
    fn present_rows_convert_known_item_types() {
        let present = UserPresent::try_from(present_row(1)).expect("coin present");
        assert_eq!(present.item_type, ItemKind::Coin);
        assert_eq!(present.user_id, UserId::new(4));
        assert_eq!(UserPresentRow::from(&present).item_type, 1);
    }

    #[rstest]
    fn unknown_item_types_name_the_row() {
        let err = UserPresent::try_from(present_row(9)).expect_err("unknown type");
        assert_eq!(err.table, "user_presents");
        assert_eq!(err.id, 9);
    }
}
