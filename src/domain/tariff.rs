use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Tariff bucket assigned to a reading from its hour of day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TariffBucket {
    Low,
    High,
}

impl std::fmt::Display for TariffBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::High => "high",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for TariffBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "high" => Ok(Self::High),
            _ => Err(format!("Invalid tariff bucket: {}", s)),
        }
    }
}

/// Billing policy: the per-bucket rates and the overnight low-tariff window.
///
/// The window wraps midnight, running from `low_start_hour` (inclusive)
/// through `low_end_hour` (exclusive) the next morning. Rates multiply the
/// monthly mean energy of their bucket, not the per-reading values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TariffPolicy {
    pub low_rate: f64,
    pub high_rate: f64,
    pub low_start_hour: u32,
    pub low_end_hour: u32,
}

impl Default for TariffPolicy {
    fn default() -> Self {
        Self {
            low_rate: 0.1,
            high_rate: 0.3,
            low_start_hour: 23,
            low_end_hour: 6,
        }
    }
}

impl TariffPolicy {
    /// Classify a timestamp into its tariff bucket.
    ///
    /// Only the hour matters; minutes and seconds never change the bucket.
    pub fn classify(&self, timestamp: NaiveDateTime) -> TariffBucket {
        let hour = timestamp.time().hour();
        if hour >= self.low_start_hour || hour < self.low_end_hour {
            TariffBucket::Low
        } else {
            TariffBucket::High
        }
    }

    /// Billing rate for a bucket.
    pub fn rate(&self, bucket: TariffBucket) -> f64 {
        match bucket {
            TariffBucket::Low => self.low_rate,
            TariffBucket::High => self.high_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rstest::rstest;

    fn at_hour(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 5)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    #[rstest]
    #[case(23, TariffBucket::Low)]
    #[case(0, TariffBucket::Low)]
    #[case(2, TariffBucket::Low)]
    #[case(5, TariffBucket::Low)]
    #[case(6, TariffBucket::High)]
    #[case(12, TariffBucket::High)]
    #[case(22, TariffBucket::High)]
    fn test_classify_default_window(#[case] hour: u32, #[case] expected: TariffBucket) {
        let policy = TariffPolicy::default();
        assert_eq!(policy.classify(at_hour(hour, 0, 0)), expected);
    }

    #[test]
    fn test_classify_boundaries_ignore_minutes() {
        let policy = TariffPolicy::default();
        // 05:59:59 is still inside the window, 06:00:00 is not.
        assert_eq!(policy.classify(at_hour(5, 59, 59)), TariffBucket::Low);
        assert_eq!(policy.classify(at_hour(6, 0, 0)), TariffBucket::High);
        // 22:59:59 is outside, 23:00:00 opens the window.
        assert_eq!(policy.classify(at_hour(22, 59, 59)), TariffBucket::High);
        assert_eq!(policy.classify(at_hour(23, 0, 0)), TariffBucket::Low);
    }

    #[test]
    fn test_classify_custom_window() {
        let policy = TariffPolicy {
            low_start_hour: 22,
            low_end_hour: 7,
            ..TariffPolicy::default()
        };
        assert_eq!(policy.classify(at_hour(22, 15, 0)), TariffBucket::Low);
        assert_eq!(policy.classify(at_hour(6, 30, 0)), TariffBucket::Low);
        assert_eq!(policy.classify(at_hour(7, 0, 0)), TariffBucket::High);
    }

    #[test]
    fn test_rate_lookup() {
        let policy = TariffPolicy::default();
        assert!((policy.rate(TariffBucket::Low) - 0.1).abs() < 1e-12);
        assert!((policy.rate(TariffBucket::High) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_bucket_display_round_trip() {
        assert_eq!(TariffBucket::Low.to_string(), "low");
        assert_eq!("HIGH".parse::<TariffBucket>().unwrap(), TariffBucket::High);
        assert!("peak".parse::<TariffBucket>().is_err());
    }

    proptest! {
        #[test]
        fn classify_matches_hour_predicate(
            hour in 0u32..24,
            minute in 0u32..60,
            second in 0u32..60,
        ) {
            let policy = TariffPolicy::default();
            let bucket = policy.classify(at_hour(hour, minute, second));
            let in_window = hour >= 23 || hour < 6;
            prop_assert_eq!(bucket == TariffBucket::Low, in_window);
        }
    }
}
