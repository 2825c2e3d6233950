use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::tariff::TariffBucket;

/// Lifecycle state of a reading.
///
/// Drafts live only in memory; the store only ever holds submitted and
/// cancelled rows. Cancelled is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    Draft,
    Submitted,
    Cancelled,
}

impl std::fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for ReadingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "submitted" => Ok(Self::Submitted),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid reading status: {}", s)),
        }
    }
}

/// A power-consumption reading as captured, before it enters the ledger.
///
/// Quantities must be finite: a range rule cannot reject NaN (every
/// comparison with NaN is false), so both fields carry an explicit
/// finiteness rule on top of it.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReadingDraft {
    #[validate(length(min = 1, message = "customer must not be empty"))]
    pub customer: String,
    pub timestamp: NaiveDateTime,
    #[validate(
        range(min = 0.0, message = "active power must be non-negative"),
        custom(function = finite_quantity, message = "active power must be finite")
    )]
    pub active_power_kw: f64,
    #[validate(
        range(min = 0.0, message = "reactive energy must be non-negative"),
        custom(function = finite_quantity, message = "reactive energy must be finite")
    )]
    pub reactive_energy_kwh: f64,
}

fn finite_quantity(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new("finite"))
    }
}

/// A ledger entry. Identity and tariff bucket are fixed at submission and
/// never change afterwards; only the status may move to cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub id: String,
    pub customer: String,
    pub timestamp: NaiveDateTime,
    pub active_power_kw: f64,
    pub reactive_energy_kwh: f64,
    pub tariff_bucket: TariffBucket,
    pub status: ReadingStatus,
}

impl Reading {
    /// Ledger identity: `{customer}-{year}-{ordinal}` where the ordinal is
    /// one past the number of readings the customer already has, across all
    /// statuses and years. Unique per customer only.
    pub fn make_id(customer: &str, timestamp: NaiveDateTime, prior_count: u64) -> String {
        format!("{}-{}-{}", customer, timestamp.year(), prior_count + 1)
    }

    /// Build the submitted entry for a validated draft.
    pub fn submitted(draft: ReadingDraft, id: String, bucket: TariffBucket) -> Self {
        Self {
            id,
            customer: draft.customer,
            timestamp: draft.timestamp,
            active_power_kw: draft.active_power_kw,
            reactive_energy_kwh: draft.reactive_energy_kwh,
            tariff_bucket: bucket,
            status: ReadingStatus::Submitted,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn draft(customer: &str) -> ReadingDraft {
        ReadingDraft {
            customer: customer.to_string(),
            timestamp: ts(2025, 1, 5, 2),
            active_power_kw: 1.0,
            reactive_energy_kwh: 2.0,
        }
    }

    #[test]
    fn test_make_id_uses_year_and_next_ordinal() {
        assert_eq!(Reading::make_id("ACME", ts(2025, 1, 5, 2), 0), "ACME-2025-1");
        assert_eq!(Reading::make_id("ACME", ts(2025, 3, 1, 9), 4), "ACME-2025-5");
        // The ordinal keeps counting across a year boundary.
        assert_eq!(Reading::make_id("ACME", ts(2026, 1, 1, 9), 5), "ACME-2026-6");
    }

    #[test]
    fn test_submitted_carries_draft_fields() {
        let reading = Reading::submitted(draft("ACME"), "ACME-2025-1".to_string(), TariffBucket::Low);
        assert_eq!(reading.id, "ACME-2025-1");
        assert_eq!(reading.customer, "ACME");
        assert_eq!(reading.status, ReadingStatus::Submitted);
        assert_eq!(reading.tariff_bucket, TariffBucket::Low);
    }

    #[test]
    fn test_draft_validation() {
        assert!(draft("ACME").validate().is_ok());

        let mut bad = draft("ACME");
        bad.customer = String::new();
        assert!(bad.validate().is_err());

        let mut bad = draft("ACME");
        bad.active_power_kw = -0.1;
        assert!(bad.validate().is_err());

        let mut bad = draft("ACME");
        bad.reactive_energy_kwh = f64::NAN;
        assert!(bad.validate().is_err());

        let mut bad = draft("ACME");
        bad.active_power_kw = f64::NAN;
        assert!(bad.validate().is_err());

        let mut bad = draft("ACME");
        bad.active_power_kw = f64::INFINITY;
        assert!(bad.validate().is_err());

        let mut bad = draft("ACME");
        bad.reactive_energy_kwh = f64::NEG_INFINITY;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_status_round_trip() {
        assert_eq!(ReadingStatus::Submitted.to_string(), "submitted");
        assert_eq!("cancelled".parse::<ReadingStatus>().unwrap(), ReadingStatus::Cancelled);
        assert_eq!("Canceled".parse::<ReadingStatus>().unwrap(), ReadingStatus::Cancelled);
        assert!("void".parse::<ReadingStatus>().is_err());
    }
}
