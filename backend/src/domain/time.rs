//! Calendar helpers for request timestamps.
//!
//! Request times travel through the engine as unix seconds. Calendar-day
//! comparisons use a fixed UTC offset so the daily login boundary does not
//! depend on the host time zone.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

/// Default day boundary offset: +09:00.
pub const DEFAULT_DAY_OFFSET_SECS: i32 = 9 * 60 * 60;

/// Errors raised while building a [`GameCalendar`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameCalendarError {
    /// The offset lies outside the ±24h range accepted by chrono.
    #[error("day offset {secs}s is out of range")]
    OffsetOutOfRange { secs: i32 },
}

/// Maps unix timestamps onto game calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameCalendar {
    offset: FixedOffset,
}

impl GameCalendar {
    /// Build a calendar whose days start at midnight in the given UTC offset.
    pub fn new(offset_secs: i32) -> Result<Self, GameCalendarError> {
        FixedOffset::east_opt(offset_secs)
            .map(|offset| Self { offset })
            .ok_or(GameCalendarError::OffsetOutOfRange { secs: offset_secs })
    }

    /// Calendar date of a unix timestamp, if representable.
    pub fn date_of(&self, unix_secs: i64) -> Option<NaiveDate> {
        DateTime::from_timestamp(unix_secs, 0).map(|utc| utc.with_timezone(&self.offset).date_naive())
    }

    /// True when both timestamps fall on the same calendar day.
    ///
    /// Unrepresentable timestamps never compare equal, so callers fall back
    /// to the full login flow.
    pub fn same_day(&self, left: i64, right: i64) -> bool {
        match (self.date_of(left), self.date_of(right)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl Default for GameCalendar {
    fn default() -> Self {
        Self {
            offset: FixedOffset::east_opt(DEFAULT_DAY_OFFSET_SECS).unwrap_or_else(|| Utc.fix()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // 2024-03-01T14:59:59Z is 23:59:59 in +09:00.
    const LATE_EVENING: i64 = 1_709_305_199;

    #[rstest]
    #[case(LATE_EVENING, LATE_EVENING - 3_600, true)]
    #[case(LATE_EVENING, LATE_EVENING + 1, false)]
    #[case(LATE_EVENING + 1, LATE_EVENING + 86_000, true)]
    fn same_day_uses_the_configured_offset(
        #[case] left: i64,
        #[case] right: i64,
        #[case] expected: bool,
    ) {
        let calendar = GameCalendar::default();
        assert_eq!(calendar.same_day(left, right), expected);
    }

    #[rstest]
    fn utc_calendar_moves_the_boundary() {
        let calendar = GameCalendar::new(0).expect("valid offset");
        assert!(calendar.same_day(LATE_EVENING, LATE_EVENING + 1));
    }

    #[rstest]
    fn rejects_out_of_range_offsets() {
        assert_eq!(
            GameCalendar::new(90_000),
            Err(GameCalendarError::OffsetOutOfRange { secs: 90_000 })
        );
    }
}
