//! Average-consumption report across all customers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use itertools::Itertools;
use serde::Serialize;

use crate::error::LedgerError;
use crate::store::{ConsumptionStore, ReadingQuery};

/// Optional date window for the report. Dates are inclusive on both ends;
/// an absent bound leaves that side open, which is the default view.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ReportRange {
    fn start(&self) -> Option<NaiveDateTime> {
        self.from.map(|d| d.and_time(NaiveTime::MIN))
    }

    fn until_exclusive(&self) -> Option<NaiveDateTime> {
        // An inclusive end date becomes an exclusive bound at the next
        // midnight; at the calendar's edge the side just stays open.
        self.to
            .and_then(|d| d.succ_opt())
            .map(|d| d.and_time(NaiveTime::MIN))
    }
}

/// One report row: a customer and their mean consumption over the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub customer: String,
    pub full_name: String,
    pub average_power_kw: f64,
    pub average_energy_kwh: f64,
}

pub struct ConsumptionReport {
    store: Arc<dyn ConsumptionStore>,
}

impl ConsumptionReport {
    pub fn new(store: Arc<dyn ConsumptionStore>) -> Self {
        Self { store }
    }

    /// Mean power and energy per customer over the window's submitted
    /// readings, ordered by customer. Customers without readings in the
    /// window are omitted; a customer row missing from the registry falls
    /// back to its id for the display name.
    pub async fn execute(&self, range: ReportRange) -> Result<Vec<ReportRow>, LedgerError> {
        let readings = self
            .store
            .submitted_readings(ReadingQuery {
                customer: None,
                from: range.start(),
                until: range.until_exclusive(),
            })
            .await?;
        let names: HashMap<String, String> = self
            .store
            .customers()
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c.full_name()))
            .collect();

        let mut rows: Vec<ReportRow> = readings
            .into_iter()
            .into_group_map_by(|r| r.customer.clone())
            .into_iter()
            .map(|(customer, group)| {
                let n = group.len() as f64;
                let power: f64 = group.iter().map(|r| r.active_power_kw).sum();
                let energy: f64 = group.iter().map(|r| r.reactive_energy_kwh).sum();
                let full_name = names.get(&customer).cloned().unwrap_or_else(|| customer.clone());
                ReportRow {
                    customer,
                    full_name,
                    average_power_kw: power / n,
                    average_energy_kwh: energy / n,
                }
            })
            .collect();
        rows.sort_by(|a, b| a.customer.cmp(&b.customer));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Customer, Reading, ReadingStatus, TariffBucket};
    use crate::store::MemoryStore;

    fn ts(m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn reading(id: &str, customer: &str, t: NaiveDateTime, power: f64, energy: f64) -> Reading {
        Reading {
            id: id.to_string(),
            customer: customer.to_string(),
            timestamp: t,
            active_power_kw: power,
            reactive_energy_kwh: energy,
            tariff_bucket: TariffBucket::High,
            status: ReadingStatus::Submitted,
        }
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_customer(&Customer::new("ACME", "Ada", "Lovelace", ""))
            .await
            .unwrap();
        store
            .insert_reading(&reading("ACME-2025-1", "ACME", ts(1, 5), 1.0, 2.0))
            .await
            .unwrap();
        store
            .insert_reading(&reading("ACME-2025-2", "ACME", ts(2, 5), 3.0, 4.0))
            .await
            .unwrap();
        // No registry row for GLOBEX.
        store
            .insert_reading(&reading("GLOBEX-2025-1", "GLOBEX", ts(1, 20), 5.0, 6.0))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_default_range_covers_everything() {
        let report = ConsumptionReport::new(seeded_store().await);
        let rows = report.execute(ReportRange::default()).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].customer, "ACME");
        assert_eq!(rows[0].full_name, "Ada Lovelace");
        assert!((rows[0].average_power_kw - 2.0).abs() < 1e-9);
        assert!((rows[0].average_energy_kwh - 3.0).abs() < 1e-9);
        assert_eq!(rows[1].customer, "GLOBEX");
        assert_eq!(rows[1].full_name, "GLOBEX");
    }

    #[tokio::test]
    async fn test_range_bounds_are_inclusive_dates() {
        let report = ConsumptionReport::new(seeded_store().await);
        let range = ReportRange {
            from: Some(NaiveDate::from_ymd_opt(2025, 1, 5).unwrap()),
            to: Some(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()),
        };
        let rows = report.execute(range).await.unwrap();

        // Only the two January readings fall inside the window.
        assert_eq!(rows.len(), 2);
        assert!((rows[0].average_power_kw - 1.0).abs() < 1e-9);
        assert!((rows[1].average_power_kw - 5.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_window_without_readings_is_empty() {
        let report = ConsumptionReport::new(seeded_store().await);
        let range = ReportRange {
            from: Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            to: Some(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()),
        };
        assert!(report.execute(range).await.unwrap().is_empty());
    }
}
