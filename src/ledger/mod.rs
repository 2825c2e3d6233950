//! Ledger service: the submit/cancel state machine and its derivations.

pub mod aggregate;
pub mod reconcile;
pub mod rollup;

pub use aggregate::{MonthlyAggregator, PeriodAggregate};
pub use reconcile::{RoiOutcome, RoiReconciler};
pub use rollup::CustomerRollup;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::OwnedMutexGuard;
use tracing::info;
use validator::Validate;

use crate::clock::Clock;
use crate::domain::{Customer, Period, Reading, ReadingDraft, ReadingStatus, TariffPolicy};
use crate::error::LedgerError;
use crate::store::{ConsumptionStore, ReadingQuery};

/// Registry of per-customer exclusive scopes.
///
/// A guard covers one customer's whole validate-derive-write sequence;
/// operations on different customers never contend. Entries are never
/// removed; the customer set is small and stable.
struct ScopeLocks {
    inner: parking_lot::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ScopeLocks {
    fn new() -> Self {
        Self {
            inner: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    async fn acquire(&self, customer: &str) -> OwnedMutexGuard<()> {
        let scope = {
            let mut map = self.inner.lock();
            map.entry(customer.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        scope.lock_owned().await
    }
}

/// Coordinates the reading lifecycle over the storage and clock seams.
///
/// Every mutating operation validates first and writes only once nothing can
/// fail, under the owning customer's exclusive scope, so a returned error
/// means stored state is untouched.
pub struct LedgerService {
    store: Arc<dyn ConsumptionStore>,
    clock: Arc<dyn Clock>,
    policy: TariffPolicy,
    aggregator: MonthlyAggregator,
    reconciler: RoiReconciler,
    rollup: CustomerRollup,
    scopes: ScopeLocks,
}

impl LedgerService {
    pub fn new(
        store: Arc<dyn ConsumptionStore>,
        clock: Arc<dyn Clock>,
        policy: TariffPolicy,
    ) -> Self {
        Self {
            aggregator: MonthlyAggregator::new(store.clone(), policy.clone()),
            reconciler: RoiReconciler::new(store.clone(), policy.clone()),
            rollup: CustomerRollup::new(store.clone()),
            scopes: ScopeLocks::new(),
            store,
            clock,
            policy,
        }
    }

    /// Register a customer and, when an email was captured, the user link
    /// that scopes that user's queries to this customer.
    pub async fn register_customer(&self, customer: Customer) -> Result<(), LedgerError> {
        if customer.id.trim().is_empty() {
            return Err(LedgerError::Validation(
                "customer id must not be empty".to_string(),
            ));
        }
        self.store.insert_customer(&customer).await?;
        if !customer.email.is_empty() {
            self.store.link_user(&customer.email, &customer.id).await?;
        }
        info!(customer = %customer.id, "registered customer");
        Ok(())
    }

    /// Submit a draft reading.
    ///
    /// Validates the draft, assigns identity and tariff bucket, persists the
    /// entry, then re-derives the month's ROI record and the customer's
    /// lifetime averages.
    pub async fn submit(&self, draft: ReadingDraft) -> Result<Reading, LedgerError> {
        draft.validate()?;
        let _scope = self.scopes.acquire(&draft.customer).await;

        if self.store.customer(&draft.customer).await?.is_none() {
            return Err(LedgerError::NotFound(format!(
                "Customer {}",
                draft.customer
            )));
        }
        let now = self.clock.now();
        if draft.timestamp > now {
            return Err(LedgerError::Validation(format!(
                "reading timestamp {} is in the future (now {})",
                draft.timestamp, now
            )));
        }
        if self
            .store
            .measurement_exists(
                &draft.customer,
                draft.timestamp,
                draft.active_power_kw,
                draft.reactive_energy_kwh,
            )
            .await?
        {
            return Err(LedgerError::Duplicate(format!(
                "Identical submitted measurement for customer {} at {}",
                draft.customer, draft.timestamp
            )));
        }

        let bucket = self.policy.classify(draft.timestamp);
        let prior_count = self.store.count_readings(&draft.customer).await?;
        let id = Reading::make_id(&draft.customer, draft.timestamp, prior_count);
        let reading = Reading::submitted(draft, id, bucket);
        self.store.insert_reading(&reading).await?;

        let period = Period::of(reading.timestamp);
        let outcome = self.reconciler.reconcile(&reading.customer, period).await?;
        self.rollup.update(&reading.customer).await?;

        info!(
            reading = %reading.id,
            customer = %reading.customer,
            bucket = %reading.tariff_bucket,
            roi = ?outcome,
            "submitted reading"
        );
        Ok(reading)
    }

    /// Cancel a submitted reading and re-derive the affected month.
    pub async fn cancel(&self, reading_id: &str) -> Result<(), LedgerError> {
        let probe = self
            .store
            .reading(reading_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("Reading {}", reading_id)))?;
        // A reading's customer never changes, so the scope taken from the
        // probe stays correct; only the status needs re-reading under it.
        let _scope = self.scopes.acquire(&probe.customer).await;
        let reading = self
            .store
            .reading(reading_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("Reading {}", reading_id)))?;
        if reading.status != ReadingStatus::Submitted {
            return Err(LedgerError::Validation(format!(
                "reading {} is {}, only submitted readings can be cancelled",
                reading.id, reading.status
            )));
        }

        self.store
            .set_reading_status(reading_id, ReadingStatus::Cancelled)
            .await?;
        let period = Period::of(reading.timestamp);
        let outcome = self.reconciler.reconcile(&reading.customer, period).await?;

        info!(
            reading = %reading.id,
            customer = %reading.customer,
            roi = ?outcome,
            "cancelled reading"
        );
        Ok(())
    }

    /// Submitted readings of one customer's calendar month, in timestamp
    /// order.
    pub async fn query_period(
        &self,
        customer: &str,
        period: Period,
    ) -> Result<Vec<Reading>, LedgerError> {
        self.store
            .submitted_readings(ReadingQuery::for_period(customer, period))
            .await
    }

    /// Aggregate a customer's month without touching stored state.
    pub async fn aggregate(
        &self,
        customer: &str,
        period: Period,
    ) -> Result<Option<PeriodAggregate>, LedgerError> {
        self.aggregator.aggregate(customer, period).await
    }

    /// Re-derive a month's ROI record outside the submit/cancel flow.
    pub async fn reconcile(
        &self,
        customer: &str,
        period: Period,
    ) -> Result<RoiOutcome, LedgerError> {
        if self.store.customer(customer).await?.is_none() {
            return Err(LedgerError::NotFound(format!("Customer {}", customer)));
        }
        let _scope = self.scopes.acquire(customer).await;
        self.reconciler.reconcile(customer, period).await
    }

    /// Customer profile with its current lifetime averages.
    pub async fn customer_profile(&self, id: &str) -> Result<Customer, LedgerError> {
        self.store
            .customer(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("Customer {}", id)))
    }

    pub async fn reading(&self, id: &str) -> Result<Option<Reading>, LedgerError> {
        self.store.reading(id).await
    }
}
