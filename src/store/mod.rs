//! Persistence seam for the consumption ledger.
//!
//! Callers run their validation reads before any write, under the owning
//! customer's scope, so implementations only need per-call atomicity.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::domain::{Customer, MonthlyRoi, Period, Reading, ReadingStatus, RoiFigures};
use crate::error::LedgerError;

pub mod memory;
#[cfg(feature = "db")]
pub mod pg;

pub use memory::MemoryStore;
#[cfg(feature = "db")]
pub use pg::PgStore;

/// Filters for submitted-reading queries. Absent bounds mean unbounded,
/// which is the report's default window. `until` is exclusive.
#[derive(Debug, Clone, Default)]
pub struct ReadingQuery {
    pub customer: Option<String>,
    pub from: Option<NaiveDateTime>,
    pub until: Option<NaiveDateTime>,
}

impl ReadingQuery {
    /// Everything submitted for one customer.
    pub fn for_customer(customer: &str) -> Self {
        Self {
            customer: Some(customer.to_string()),
            ..Self::default()
        }
    }

    /// One customer's calendar month.
    pub fn for_period(customer: &str, period: Period) -> Self {
        Self {
            customer: Some(customer.to_string()),
            from: Some(period.start()),
            until: Some(period.end_exclusive()),
        }
    }
}

#[async_trait]
pub trait ConsumptionStore: Send + Sync {
    // Customers
    async fn insert_customer(&self, customer: &Customer) -> Result<(), LedgerError>;
    async fn customer(&self, id: &str) -> Result<Option<Customer>, LedgerError>;
    async fn customers(&self) -> Result<Vec<Customer>, LedgerError>;
    async fn set_customer_averages(
        &self,
        id: &str,
        average_power_kw: f64,
        average_energy_kwh: f64,
    ) -> Result<(), LedgerError>;

    // User-to-customer permission links
    async fn link_user(&self, email: &str, customer_id: &str) -> Result<(), LedgerError>;
    async fn customer_for_user(&self, email: &str) -> Result<Option<String>, LedgerError>;

    // Readings
    async fn insert_reading(&self, reading: &Reading) -> Result<(), LedgerError>;
    async fn reading(&self, id: &str) -> Result<Option<Reading>, LedgerError>;
    async fn set_reading_status(&self, id: &str, status: ReadingStatus)
        -> Result<(), LedgerError>;
    /// Number of readings the customer has, across all statuses.
    async fn count_readings(&self, customer_id: &str) -> Result<u64, LedgerError>;
    /// Whether a submitted reading with this exact measurement exists.
    async fn measurement_exists(
        &self,
        customer_id: &str,
        timestamp: NaiveDateTime,
        active_power_kw: f64,
        reactive_energy_kwh: f64,
    ) -> Result<bool, LedgerError>;
    /// Submitted readings matching the query, ordered by timestamp.
    async fn submitted_readings(&self, query: ReadingQuery) -> Result<Vec<Reading>, LedgerError>;

    // Monthly ROI records
    async fn insert_roi(&self, roi: &MonthlyRoi) -> Result<(), LedgerError>;
    async fn roi_for_period(
        &self,
        customer_id: &str,
        period: Period,
    ) -> Result<Option<MonthlyRoi>, LedgerError>;
    async fn set_roi_figures(&self, id: &str, figures: RoiFigures) -> Result<(), LedgerError>;
    async fn delete_roi(&self, id: &str) -> Result<(), LedgerError>;
    async fn count_roi(&self, customer_id: &str) -> Result<u64, LedgerError>;
    /// All ROI records, ordered by customer then period.
    async fn list_roi(&self) -> Result<Vec<MonthlyRoi>, LedgerError>;
}
