//! Game-design ("master") tables.
//!
//! Master rows are read-only for the engine. They are loaded wholesale for a
//! given master version and never mutated individually.

use serde::{Deserialize, Serialize};

/// Kind of an item master row; decides how a grant is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum ItemKind {
    /// In-game currency, added to the user's balance.
    Coin,
    /// Card template; each grant creates a new level-1 card instance.
    Card,
    /// Experience material consumed when leveling cards.
    ExpMaterial,
    /// Timer material, stacked like experience materials.
    TimerMaterial,
}

/// Raised when a stored item type is outside the known set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown item type {0}")]
pub struct UnknownItemKind(pub i32);

impl ItemKind {
    /// Wire and column representation.
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Coin => 1,
            Self::Card => 2,
            Self::ExpMaterial => 3,
            Self::TimerMaterial => 4,
        }
    }

    /// Stackable kinds are held as a per-item quantity row.
    pub const fn is_stackable(self) -> bool {
        matches!(self, Self::ExpMaterial | Self::TimerMaterial)
    }
}

impl TryFrom<i32> for ItemKind {
    type Error = UnknownItemKind;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Coin),
            2 => Ok(Self::Card),
            3 => Ok(Self::ExpMaterial),
            4 => Ok(Self::TimerMaterial),
            other => Err(UnknownItemKind(other)),
        }
    }
}

impl From<ItemKind> for i32 {
    fn from(value: ItemKind) -> Self {
        value.as_i32()
    }
}

/// Item definition. Card-only and material-only columns are optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMaster {
    pub id: i64,
    pub item_type: ItemKind,
    pub name: String,
    pub description: String,
    /// Base per-second yield of a level-1 card.
    pub amount_per_sec: Option<i64>,
    pub max_level: Option<i32>,
    /// Per-second yield reached at `max_level`.
    pub max_amount_per_sec: Option<i64>,
    pub base_exp_per_level: Option<i64>,
    /// Experience granted per consumed unit of a material.
    pub gained_exp: Option<i64>,
    pub shortening_min: Option<i64>,
    pub created_at: i64,
}

/// Gacha definition with an inclusive activity window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GachaMaster {
    pub id: i64,
    pub name: String,
    pub start_at: i64,
    pub end_at: i64,
    pub display_order: i32,
    pub created_at: i64,
}

/// One weighted prize entry of a gacha.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GachaItemMaster {
    pub id: i64,
    pub gacha_id: i64,
    pub item_type: ItemKind,
    pub item_id: i64,
    pub amount: i64,
    pub weight: i64,
    pub created_at: i64,
}

/// Login bonus schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginBonusMaster {
    pub id: i64,
    pub start_at: i64,
    pub end_at: i64,
    /// Number of reward steps in one pass of the schedule.
    pub column_count: i32,
    /// Whether progress wraps to step 1 after the last column.
    pub looped: bool,
    pub created_at: i64,
}

/// Reward granted at one step of a login bonus schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginBonusRewardMaster {
    pub id: i64,
    pub login_bonus_id: i64,
    pub reward_sequence: i32,
    pub item_type: ItemKind,
    pub item_id: i64,
    pub amount: i64,
    pub created_at: i64,
}

/// Present delivered once to every user while its window is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentAllMaster {
    pub id: i64,
    pub registered_start_at: i64,
    pub registered_end_at: i64,
    pub item_type: ItemKind,
    pub item_id: i64,
    pub amount: i64,
    pub present_message: String,
    pub created_at: i64,
}

/// Every master table, as loaded from a shard for one version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasterTables {
    pub items: Vec<ItemMaster>,
    /// Ordered by `display_order`.
    pub gachas: Vec<GachaMaster>,
    /// Ordered by `id`.
    pub gacha_items: Vec<GachaItemMaster>,
    pub login_bonuses: Vec<LoginBonusMaster>,
    pub login_bonus_rewards: Vec<LoginBonusRewardMaster>,
    pub present_alls: Vec<PresentAllMaster>,
}
