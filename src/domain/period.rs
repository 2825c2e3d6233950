use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime};

/// A calendar month, the unit over which ROI statistics are derived.
///
/// Stored as the first day of the month so every instance is a valid
/// calendar position. Bounds are half open: a timestamp belongs to the
/// period when `start() <= t < end_exclusive()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    first_day: NaiveDate,
}

impl Period {
    /// Period for a given year and month. `None` when the month is not 1-12
    /// or the year is outside the supported calendar range.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|first_day| Self { first_day })
    }

    /// The period a timestamp falls into.
    pub fn of(timestamp: NaiveDateTime) -> Self {
        // Day 1 exists for every month a valid timestamp can carry.
        let first_day = timestamp
            .date()
            .with_day(1)
            .unwrap_or_else(|| timestamp.date());
        Self { first_day }
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    /// English month name, capitalized, as it appears in ROI identities.
    pub fn month_name(&self) -> &'static str {
        chrono::Month::try_from(self.first_day.month() as u8)
            .map(|m| m.name())
            .unwrap_or("Unknown")
    }

    /// First instant of the month.
    pub fn start(&self) -> NaiveDateTime {
        self.first_day.and_time(NaiveTime::MIN)
    }

    /// First instant of the following month, clipped at the calendar's edge.
    pub fn end_exclusive(&self) -> NaiveDateTime {
        self.first_day
            .checked_add_months(Months::new(1))
            .map(|d| d.and_time(NaiveTime::MIN))
            .unwrap_or(NaiveDateTime::MAX)
    }

    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        self.start() <= timestamp && timestamp < self.end_exclusive()
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.month_name(), self.year())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_month() {
        assert!(Period::new(2025, 0).is_none());
        assert!(Period::new(2025, 13).is_none());
        assert!(Period::new(2025, 12).is_some());
    }

    #[test]
    fn test_of_normalizes_to_first_day() {
        let period = Period::of(at(2025, 1, 17, 14, 30, 0));
        assert_eq!(period, Period::new(2025, 1).unwrap());
        assert_eq!(period.start(), at(2025, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_leap_february_bounds() {
        let period = Period::new(2024, 2).unwrap();
        assert!(period.contains(at(2024, 2, 29, 23, 59, 59)));
        assert!(!period.contains(at(2024, 3, 1, 0, 0, 0)));
        assert_eq!(period.end_exclusive(), at(2024, 3, 1, 0, 0, 0));
    }

    #[test]
    fn test_december_wraps_into_next_year() {
        let period = Period::new(2025, 12).unwrap();
        assert_eq!(period.end_exclusive(), at(2026, 1, 1, 0, 0, 0));
        assert!(period.contains(at(2025, 12, 31, 23, 0, 0)));
    }

    #[test]
    fn test_display_and_month_name() {
        let period = Period::new(2025, 1).unwrap();
        assert_eq!(period.month_name(), "January");
        assert_eq!(period.to_string(), "January 2025");
        assert_eq!(Period::new(2025, 9).unwrap().month_name(), "September");
    }

    #[test]
    fn test_ordering_follows_calendar() {
        let jan = Period::new(2025, 1).unwrap();
        let feb = Period::new(2025, 2).unwrap();
        let dec_prev = Period::new(2024, 12).unwrap();
        assert!(dec_prev < jan);
        assert!(jan < feb);
    }
}
