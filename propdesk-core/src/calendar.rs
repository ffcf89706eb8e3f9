//! Trading-day bucketing.
//!
//! A trading day is a calendar date taken in a fixed offset from UTC. Brokers
//! commonly roll their "server day" at a fixed offset (e.g. UTC+2), so the
//! offset is configurable; the default is plain UTC dates.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

const MAX_OFFSET_MINUTES: i32 = 23 * 60 + 59;

/// Maps timestamps to trading days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingCalendar {
    offset_minutes: i32,
}

impl TradingCalendar {
    pub fn utc() -> Self {
        Self::default()
    }

    /// Calendar whose day boundary sits `minutes` east of UTC.
    ///
    /// Returns `None` unless the offset is strictly within one day.
    pub fn with_offset_minutes(minutes: i32) -> Option<Self> {
        if minutes.abs() > MAX_OFFSET_MINUTES {
            return None;
        }
        Some(Self { offset_minutes: minutes })
    }

    pub fn offset_minutes(&self) -> i32 {
        self.offset_minutes
    }

    fn offset(&self) -> FixedOffset {
        // Deserialized values skip the constructor check, so clamp here.
        let minutes = self.offset_minutes.clamp(-MAX_OFFSET_MINUTES, MAX_OFFSET_MINUTES);
        FixedOffset::east_opt(minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// Trading day a timestamp falls on.
    pub fn trading_day(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.offset()).date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn utc_calendar_uses_utc_date() {
        let cal = TradingCalendar::utc();
        let ts = Utc.with_ymd_and_hms(2024, 2, 29, 23, 30, 0).unwrap();
        assert_eq!(cal.trading_day(ts), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn positive_offset_rolls_day_forward() {
        let cal = TradingCalendar::with_offset_minutes(120).unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 2, 29, 22, 30, 0).unwrap();
        assert_eq!(cal.trading_day(ts), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn negative_offset_rolls_day_back() {
        let cal = TradingCalendar::with_offset_minutes(-300).unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 3, 0, 0).unwrap();
        assert_eq!(cal.trading_day(ts), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn rejects_offsets_of_a_day_or_more() {
        assert!(TradingCalendar::with_offset_minutes(24 * 60).is_none());
        assert!(TradingCalendar::with_offset_minutes(-24 * 60).is_none());
        assert!(TradingCalendar::with_offset_minutes(MAX_OFFSET_MINUTES).is_some());
    }
}
