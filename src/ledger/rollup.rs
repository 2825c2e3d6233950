//! Lifetime consumption averages on the customer profile.

use std::sync::Arc;

use tracing::debug;

use crate::domain::Reading;
use crate::error::LedgerError;
use crate::store::{ConsumptionStore, ReadingQuery};

/// Maintains the per-customer lifetime averages after each submission.
#[derive(Clone)]
pub struct CustomerRollup {
    store: Arc<dyn ConsumptionStore>,
}

impl CustomerRollup {
    pub fn new(store: Arc<dyn ConsumptionStore>) -> Self {
        Self { store }
    }

    /// Recompute both averages over all of the customer's submitted
    /// readings and write them to the profile.
    pub async fn update(&self, customer: &str) -> Result<(), LedgerError> {
        let readings = self
            .store
            .submitted_readings(ReadingQuery::for_customer(customer))
            .await?;
        let (average_power_kw, average_energy_kwh) = lifetime_averages(&readings);
        self.store
            .set_customer_averages(customer, average_power_kw, average_energy_kwh)
            .await?;
        debug!(
            customer = %customer,
            readings = readings.len(),
            average_power_kw,
            average_energy_kwh,
            "updated customer averages"
        );
        Ok(())
    }
}

/// Means over all readings; (0.0, 0.0) for an empty ledger.
fn lifetime_averages(readings: &[Reading]) -> (f64, f64) {
    if readings.is_empty() {
        return (0.0, 0.0);
    }
    let n = readings.len() as f64;
    let power: f64 = readings.iter().map(|r| r.active_power_kw).sum();
    let energy: f64 = readings.iter().map(|r| r.reactive_energy_kwh).sum();
    (power / n, energy / n)
}
