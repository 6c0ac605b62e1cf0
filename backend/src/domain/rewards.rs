//! Pure reward rules shared by the game service.
//!
//! Nothing here touches storage: each function maps current state plus
//! master data to the next state so the rules can be tested exhaustively.

use rand::Rng;

use super::{GachaItemMaster, ItemKind, ItemMaster, LoginBonusMaster, UserPresent};

/// Growth factor of the experience threshold per level.
const LEVEL_EXP_GROWTH: f64 = 1.2;

/// Login bonus progress as `(last_reward_sequence, loop_count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BonusProgress {
    pub last_reward_sequence: i32,
    pub loop_count: i32,
}

impl BonusProgress {
    /// Progress of a user who has never received this bonus.
    pub const INITIAL: Self = Self {
        last_reward_sequence: 0,
        loop_count: 1,
    };
}

/// Advance login bonus progress by one step.
///
/// Returns `None` once a non-looping schedule has granted every column.
pub fn advance_login_bonus(progress: BonusProgress, bonus: &LoginBonusMaster) -> Option<BonusProgress> {
    if progress.last_reward_sequence < bonus.column_count {
        return Some(BonusProgress {
            last_reward_sequence: progress.last_reward_sequence + 1,
            ..progress
        });
    }
    bonus.looped.then_some(BonusProgress {
        last_reward_sequence: 1,
        loop_count: progress.loop_count + 1,
    })
}

/// Pick one prize by weight.
///
/// Draws an integer in `[0, total)` and walks the entries until the running
/// weight exceeds it, so each entry wins with probability `weight / total`.
/// Returns `None` when the table holds no positive weight.
pub fn draw_prize<'a, R: Rng + ?Sized>(rng: &mut R, entries: &'a [GachaItemMaster]) -> Option<&'a GachaItemMaster> {
    let total: i64 = entries.iter().map(|entry| entry.weight.max(0)).sum();
    if total <= 0 {
        return None;
    }
    let roll = rng.gen_range(0..total);
    let mut boundary = 0_i64;
    entries.iter().find(|entry| {
        boundary += entry.weight.max(0);
        roll < boundary
    })
}

/// Leveling parameters of a card template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardCurve {
    pub base_amount_per_sec: i64,
    pub max_amount_per_sec: i64,
    pub max_level: i32,
    pub base_exp_per_level: i64,
}

impl CardCurve {
    /// Read the curve from a card item master; `None` for non-card rows.
    pub fn from_item(item: &ItemMaster) -> Option<Self> {
        if item.item_type != ItemKind::Card {
            return None;
        }
        Some(Self {
            base_amount_per_sec: item.amount_per_sec?,
            max_amount_per_sec: item.max_amount_per_sec?,
            max_level: item.max_level?,
            base_exp_per_level: item.base_exp_per_level?,
        })
    }

    /// Experience required to leave `level`.
    #[expect(
        clippy::cast_precision_loss,
        reason = "experience values stay far below 2^52"
    )]
    pub fn threshold(&self, level: i32) -> f64 {
        self.base_exp_per_level as f64 * LEVEL_EXP_GROWTH.powi(level - 1)
    }

    fn yield_step(&self) -> i64 {
        if self.max_level <= 1 {
            return 0;
        }
        (self.max_amount_per_sec - self.base_amount_per_sec) / i64::from(self.max_level - 1)
    }
}

/// Card level and yield after applying accumulated experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardLevel {
    pub level: i32,
    pub amount_per_sec: i64,
}

/// Apply level-ups while `total_exp` reaches the next threshold.
///
/// Each level adds `(max - base) / (max_level - 1)` to the yield, truncated
/// to a whole coin per level. The level never exceeds the curve's maximum.
#[expect(
    clippy::cast_precision_loss,
    reason = "experience values stay far below 2^52"
)]
pub fn level_up(current: CardLevel, total_exp: i64, curve: &CardCurve) -> CardLevel {
    let mut level = current.level;
    let mut amount_per_sec = current.amount_per_sec;
    let step = curve.yield_step();
    while level < curve.max_level && curve.threshold(level) <= total_exp as f64 {
        level += 1;
        amount_per_sec = amount_per_sec.saturating_add(step);
    }
    CardLevel {
        level,
        amount_per_sec,
    }
}

/// Passive income accrual result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accrual {
    pub balance: i64,
    pub collected_at: i64,
    pub elapsed_secs: i64,
}

/// Add `elapsed × yield` to the balance and move the collection marker to `now`.
///
/// A request time earlier than the last collection accrues nothing and
/// leaves the marker in place.
pub fn accrue_reward(balance: i64, last_collected_at: i64, now: i64, yield_per_sec: i64) -> Accrual {
    let elapsed_secs = (now - last_collected_at).max(0);
    Accrual {
        balance: balance.saturating_add(elapsed_secs.saturating_mul(yield_per_sec)),
        collected_at: last_collected_at.max(now),
        elapsed_secs,
    }
}

/// Contents of several grants grouped by how they are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantBatch {
    pub coins: i64,
    /// Card template ids, one entry per card instance to create.
    pub cards: Vec<i64>,
    /// `(item_id, amount)` pairs for stackable materials.
    pub stackables: Vec<(i64, i64)>,
}

impl GrantBatch {
    /// Add one grant to the batch.
    pub fn push(&mut self, kind: ItemKind, item_id: i64, amount: i64) {
        match kind {
            ItemKind::Coin => self.coins += amount,
            ItemKind::Card => self.cards.push(item_id),
            ItemKind::ExpMaterial | ItemKind::TimerMaterial => self.stackables.push((item_id, amount)),
        }
    }

    /// Group the contents of collected presents.
    pub fn from_presents(presents: &[UserPresent]) -> Self {
        let mut batch = Self::default();
        for present in presents {
            batch.push(present.item_type, present.item_id, present.amount);
        }
        batch
    }

    /// True when applying the batch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.coins == 0 && self.cards.is_empty() && self.stackables.is_empty()
    }
}

#[cfg(test)]
#[path = "rewards_tests.rs"]
mod tests;
