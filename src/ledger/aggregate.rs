//! Monthly aggregation over submitted readings.

use std::sync::Arc;

use crate::domain::{Period, Reading, RoiFigures, TariffBucket, TariffPolicy};
use crate::error::LedgerError;
use crate::store::{ConsumptionStore, ReadingQuery};

/// Statistics derived from one customer's submitted readings in one month.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodAggregate {
    pub reading_count: usize,
    /// Mean reactive energy of the low-bucket readings; 0.0 when none.
    pub low_tariff_mean: f64,
    /// Mean reactive energy of the high-bucket readings; 0.0 when none.
    pub high_tariff_mean: f64,
    pub figures: RoiFigures,
}

#[derive(Clone)]
pub struct MonthlyAggregator {
    store: Arc<dyn ConsumptionStore>,
    policy: TariffPolicy,
}

impl MonthlyAggregator {
    pub fn new(store: Arc<dyn ConsumptionStore>, policy: TariffPolicy) -> Self {
        Self { store, policy }
    }

    /// Aggregate the customer's month. `Ok(None)` when the period holds no
    /// submitted readings. Reads only; never writes.
    pub async fn aggregate(
        &self,
        customer: &str,
        period: Period,
    ) -> Result<Option<PeriodAggregate>, LedgerError> {
        let readings = self
            .store
            .submitted_readings(ReadingQuery::for_period(customer, period))
            .await?;
        Ok(compute(&readings, &self.policy))
    }
}

fn mean<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Pure aggregation over one period's readings.
///
/// Buckets come from the stored readings, assigned at submission, not from
/// re-classifying timestamps here.
fn compute(readings: &[Reading], policy: &TariffPolicy) -> Option<PeriodAggregate> {
    if readings.is_empty() {
        return None;
    }

    let average_power_kw = mean(readings.iter().map(|r| r.active_power_kw));
    let average_energy_kwh = mean(readings.iter().map(|r| r.reactive_energy_kwh));

    let low_tariff_mean = mean(
        readings
            .iter()
            .filter(|r| r.tariff_bucket == TariffBucket::Low)
            .map(|r| r.reactive_energy_kwh),
    );
    let high_tariff_mean = mean(
        readings
            .iter()
            .filter(|r| r.tariff_bucket == TariffBucket::High)
            .map(|r| r.reactive_energy_kwh),
    );

    Some(PeriodAggregate {
        reading_count: readings.len(),
        low_tariff_mean,
        high_tariff_mean,
        figures: RoiFigures {
            average_power_kw,
            average_energy_kwh,
            low_tariff_value: policy.rate(TariffBucket::Low) * low_tariff_mean,
            high_tariff_value: policy.rate(TariffBucket::High) * high_tariff_mean,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ReadingStatus;
    use crate::store::MemoryStore;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn reading(
        id: &str,
        t: NaiveDateTime,
        power: f64,
        energy: f64,
        bucket: TariffBucket,
    ) -> Reading {
        Reading {
            id: id.to_string(),
            customer: "ACME".to_string(),
            timestamp: t,
            active_power_kw: power,
            reactive_energy_kwh: energy,
            tariff_bucket: bucket,
            status: ReadingStatus::Submitted,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_compute_means_and_bucket_values() {
        let readings = vec![
            reading("ACME-2025-1", ts(5, 2), 1.0, 2.0, TariffBucket::Low),
            reading("ACME-2025-2", ts(5, 12), 3.0, 4.0, TariffBucket::High),
        ];
        let agg = compute(&readings, &TariffPolicy::default()).unwrap();

        assert_eq!(agg.reading_count, 2);
        assert!(close(agg.figures.average_power_kw, 2.0));
        assert!(close(agg.figures.average_energy_kwh, 3.0));
        assert!(close(agg.low_tariff_mean, 2.0));
        assert!(close(agg.high_tariff_mean, 4.0));
        assert!(close(agg.figures.low_tariff_value, 0.2));
        assert!(close(agg.figures.high_tariff_value, 1.2));
    }

    #[test]
    fn test_compute_empty_bucket_contributes_zero() {
        let readings = vec![
            reading("ACME-2025-1", ts(5, 12), 1.0, 2.0, TariffBucket::High),
            reading("ACME-2025-2", ts(6, 14), 3.0, 6.0, TariffBucket::High),
        ];
        let agg = compute(&readings, &TariffPolicy::default()).unwrap();

        assert!(close(agg.low_tariff_mean, 0.0));
        assert!(close(agg.figures.low_tariff_value, 0.0));
        assert!(close(agg.high_tariff_mean, 4.0));
        assert!(close(agg.figures.high_tariff_value, 1.2));
    }

    #[test]
    fn test_compute_empty_period_is_none() {
        assert!(compute(&[], &TariffPolicy::default()).is_none());
    }

    #[tokio::test]
    async fn test_aggregate_scopes_to_customer_and_period() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_reading(&reading("ACME-2025-1", ts(5, 2), 1.0, 2.0, TariffBucket::Low))
            .await
            .unwrap();
        store
            .insert_reading(&reading("ACME-2025-2", ts(5, 12), 3.0, 4.0, TariffBucket::High))
            .await
            .unwrap();
        // Cancelled readings never contribute.
        let mut cancelled = reading("ACME-2025-3", ts(9, 12), 100.0, 100.0, TariffBucket::High);
        cancelled.status = ReadingStatus::Cancelled;
        store.insert_reading(&cancelled).await.unwrap();
        // Another customer's reading in the same month.
        let mut other = reading("OTHER-2025-1", ts(5, 12), 50.0, 50.0, TariffBucket::High);
        other.customer = "OTHER".to_string();
        store.insert_reading(&other).await.unwrap();

        let aggregator = MonthlyAggregator::new(store, TariffPolicy::default());
        let period = Period::new(2025, 1).unwrap();
        let agg = aggregator.aggregate("ACME", period).await.unwrap().unwrap();

        assert_eq!(agg.reading_count, 2);
        assert!(close(agg.figures.average_power_kw, 2.0));

        let empty = aggregator
            .aggregate("ACME", Period::new(2025, 2).unwrap())
            .await
            .unwrap();
        assert!(empty.is_none());
    }
}
