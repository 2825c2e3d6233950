//! Reconciliation of derived monthly ROI records.

use std::sync::Arc;

use tracing::info;

use crate::domain::{MonthlyRoi, Period, TariffPolicy};
use crate::error::LedgerError;
use crate::store::ConsumptionStore;

use super::aggregate::MonthlyAggregator;

/// What a reconcile pass did to the period's ROI record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoiOutcome {
    Created,
    Updated,
    Removed,
    /// No submitted readings and no record to remove.
    Absent,
}

/// Sole writer of monthly ROI records.
///
/// Runs inside the owning customer's exclusive scope; callers hold the scope
/// guard across the triggering write and this derivation.
#[derive(Clone)]
pub struct RoiReconciler {
    store: Arc<dyn ConsumptionStore>,
    aggregator: MonthlyAggregator,
}

impl RoiReconciler {
    pub fn new(store: Arc<dyn ConsumptionStore>, policy: TariffPolicy) -> Self {
        let aggregator = MonthlyAggregator::new(store.clone(), policy);
        Self { store, aggregator }
    }

    /// Re-derive the record for one customer-month from current ledger
    /// state: upsert when the period has submitted readings, remove the
    /// record when it no longer has any.
    pub async fn reconcile(
        &self,
        customer: &str,
        period: Period,
    ) -> Result<RoiOutcome, LedgerError> {
        let aggregate = self.aggregator.aggregate(customer, period).await?;
        let existing = self.store.roi_for_period(customer, period).await?;

        let outcome = match (aggregate, existing) {
            (Some(aggregate), Some(existing)) => {
                self.store
                    .set_roi_figures(&existing.id, aggregate.figures)
                    .await?;
                RoiOutcome::Updated
            }
            (Some(aggregate), None) => {
                let prior_count = self.store.count_roi(customer).await?;
                let roi = MonthlyRoi::new(customer, period, aggregate.figures, prior_count);
                self.store.insert_roi(&roi).await?;
                RoiOutcome::Created
            }
            (None, Some(existing)) => {
                self.store.delete_roi(&existing.id).await?;
                RoiOutcome::Removed
            }
            (None, None) => RoiOutcome::Absent,
        };

        info!(
            customer = %customer,
            period = %period,
            outcome = ?outcome,
            "reconciled monthly ROI"
        );
        Ok(outcome)
    }
}
