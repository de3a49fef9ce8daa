//! Calendar-day arithmetic in the service timezone.
//!
//! The offset is captured once when the clock is built and never changes
//! afterwards, so every day boundary is exactly 24 hours long and a day
//! window partitions time without gaps or overlaps.

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveTime, Offset, Utc};

/// Clock that knows where calendar days start in the service timezone
#[derive(Debug, Clone, Copy)]
pub struct ServiceClock {
    offset: FixedOffset,
    pinned: Option<DateTime<Utc>>,
}

impl ServiceClock {
    /// Clock using the host's current UTC offset
    pub fn local() -> Self {
        Self::with_offset(*Local::now().offset())
    }

    /// Clock with day boundaries at UTC midnight
    pub fn utc() -> Self {
        Self::with_offset(Utc.fix())
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            offset,
            pinned: None,
        }
    }

    /// Clock with an offset given in minutes east of UTC
    ///
    /// Returns `None` when the offset is out of range (more than a day).
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(Self::with_offset)
    }

    /// Clock frozen at `at`
    pub fn fixed(offset: FixedOffset, at: DateTime<Utc>) -> Self {
        Self {
            offset,
            pinned: Some(at),
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.pinned.unwrap_or_else(Utc::now)
    }

    /// Calendar date that `instant` falls on
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    pub fn today(&self) -> NaiveDate {
        self.date_of(self.now())
    }

    /// First instant of `date`
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let local_midnight = date.and_time(NaiveTime::MIN).and_utc();
        local_midnight - Duration::seconds(i64::from(self.offset.local_minus_utc()))
    }

    /// Half-open `[start, end)` range covering `date`
    pub fn day_range(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.start_of_day(date);
        (start, start + Duration::days(1))
    }

    /// The `window_days` dates ending today, oldest first
    pub fn trailing_days(&self, window_days: u32) -> Vec<NaiveDate> {
        let today = self.today();
        (0..i64::from(window_days))
            .rev()
            .map(|back| today - Duration::days(back))
            .collect()
    }
}

impl Default for ServiceClock {
    fn default() -> Self {
        Self::local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    #[test]
    fn test_start_of_day_honours_offset() {
        let clock = ServiceClock::with_offset(kst());
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();

        // 00:00 in UTC+9 is 15:00 UTC the previous day
        let expected = Utc.with_ymd_and_hms(2026, 3, 9, 15, 0, 0).unwrap();
        assert_eq!(clock.start_of_day(date), expected);
    }

    #[test]
    fn test_today_uses_service_offset() {
        // 20:00 UTC on the 9th is already the 10th in UTC+9
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 20, 0, 0).unwrap();
        let clock = ServiceClock::fixed(kst(), at);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());

        let utc_clock = ServiceClock::fixed(Utc.fix(), at);
        assert_eq!(utc_clock.today(), NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
    }

    #[test]
    fn test_consecutive_day_ranges_are_contiguous() {
        let clock = ServiceClock::with_offset(kst());
        let first = NaiveDate::from_ymd_opt(2026, 2, 27).unwrap();

        let mut previous_end = None;
        for offset in 0..5 {
            let (start, end) = clock.day_range(first + Duration::days(offset));
            if let Some(prev) = previous_end {
                assert_eq!(start, prev);
            }
            assert_eq!(end - start, Duration::days(1));
            previous_end = Some(end);
        }
    }

    #[test]
    fn test_trailing_days_oldest_first() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 12, 0, 0).unwrap();
        let clock = ServiceClock::fixed(Utc.fix(), at);

        let days = clock.trailing_days(3);
        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            ]
        );
        assert!(clock.trailing_days(0).is_empty());
    }

    #[test]
    fn test_from_offset_minutes_bounds() {
        assert!(ServiceClock::from_offset_minutes(540).is_some());
        assert!(ServiceClock::from_offset_minutes(-300).is_some());
        assert!(ServiceClock::from_offset_minutes(24 * 60).is_none());
    }

    #[test]
    fn test_date_of_boundary_belongs_to_new_day() {
        let clock = ServiceClock::with_offset(kst());
        let date = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let (start, end) = clock.day_range(date);

        assert_eq!(clock.date_of(start), date);
        assert_eq!(clock.date_of(end - Duration::milliseconds(1)), date);
        assert_eq!(clock.date_of(end), date + Duration::days(1));
    }
}
