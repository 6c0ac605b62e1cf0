//! Mutable per-user rows.
//!
//! Every row here lives on the shard owning its `user_id`. Timestamps are
//! unix seconds; soft-deleted rows carry a `deleted_at` marker instead of
//! being removed.

use serde::{Deserialize, Serialize};

use super::{ItemKind, UserId};

/// Player account and currency balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub isu_coin: i64,
    /// Last time passive income was collected.
    #[serde(rename = "lastGetRewardAt")]
    pub last_getreward_at: i64,
    pub last_activated_at: i64,
    pub registered_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

impl User {
    /// Fresh account with every timestamp set to `now`.
    pub fn register(id: UserId, now: i64) -> Self {
        Self {
            id,
            isu_coin: 0,
            last_getreward_at: now,
            last_activated_at: now,
            registered_at: now,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Client platform reported at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct PlatformType(i32);

/// Raised for platform types outside `1..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("platform type {0} is not supported")]
pub struct PlatformTypeError(pub i32);

impl PlatformType {
    /// Validate a raw platform type.
    pub fn new(raw: i32) -> Result<Self, PlatformTypeError> {
        if (1..=3).contains(&raw) {
            Ok(Self(raw))
        } else {
            Err(PlatformTypeError(raw))
        }
    }

    /// Raw column value.
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for PlatformType {
    type Error = PlatformTypeError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PlatformType> for i32 {
    fn from(value: PlatformType) -> Self {
        value.0
    }
}

/// Binding between a user and a client viewer id. Write-once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDevice {
    pub id: i64,
    pub user_id: UserId,
    #[serde(rename = "platformId")]
    pub platform_id: String,
    pub platform_type: PlatformType,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Card instance owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCard {
    pub id: i64,
    pub user_id: UserId,
    /// Item master id of the card template.
    pub card_id: i64,
    pub amount_per_sec: i64,
    pub level: i32,
    pub total_exp: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Number of cards in a deck.
pub const DECK_CARD_COUNT: usize = 3;

/// Active card selection contributing to passive income.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDeck {
    pub id: i64,
    pub user_id: UserId,
    #[serde(rename = "cardId1")]
    pub user_card_id_1: i64,
    #[serde(rename = "cardId2")]
    pub user_card_id_2: i64,
    #[serde(rename = "cardId3")]
    pub user_card_id_3: i64,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

impl UserDeck {
    /// Card instance ids in slot order.
    pub const fn card_ids(&self) -> [i64; DECK_CARD_COUNT] {
        [self.user_card_id_1, self.user_card_id_2, self.user_card_id_3]
    }
}

/// Stackable material quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserItem {
    pub id: i64,
    pub user_id: UserId,
    pub item_type: ItemKind,
    pub item_id: i64,
    pub amount: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Mailbox entry waiting to be collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPresent {
    pub id: i64,
    pub user_id: UserId,
    pub sent_at: i64,
    pub item_type: ItemKind,
    pub item_id: i64,
    pub amount: i64,
    pub present_message: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

/// Marker that a global present was delivered to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPresentAllReceivedHistory {
    pub id: i64,
    pub user_id: UserId,
    pub present_all_id: i64,
    pub received_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Progress of a user through one login bonus schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLoginBonus {
    pub id: i64,
    pub user_id: UserId,
    pub login_bonus_id: i64,
    pub last_reward_sequence: i32,
    pub loop_count: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Operation a one-time token authorises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum TokenType {
    /// Gacha draw, issued by the gacha listing.
    Gacha,
    /// Card experience, issued by the item listing.
    CardExp,
}

/// Raised when a stored token type is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown token type {0}")]
pub struct UnknownTokenType(pub i32);

impl TokenType {
    /// Stored representation.
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Gacha => 1,
            Self::CardExp => 2,
        }
    }
}

impl TryFrom<i32> for TokenType {
    type Error = UnknownTokenType;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Gacha),
            2 => Ok(Self::CardExp),
            other => Err(UnknownTokenType(other)),
        }
    }
}

impl From<TokenType> for i32 {
    fn from(value: TokenType) -> Self {
        value.as_i32()
    }
}

/// Audit row of an issued one-time token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneTimeTokenRecord {
    pub id: i64,
    pub user_id: UserId,
    pub token: String,
    pub token_type: TokenType,
    pub expired_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Login session. Lives only in the shared store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: UserId,
    pub session_id: String,
}

impl Session {
    /// Compose a session id of the form `{uuid}::{user_id}`.
    pub fn issue(user_id: UserId, nonce: uuid::Uuid) -> Self {
        Self {
            user_id,
            session_id: format!("{nonce}::{user_id}"),
        }
    }
}
