//! In-memory store used by tests and the default (non-`db`) build.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::RwLock;

use crate::domain::{Customer, MonthlyRoi, Period, Reading, ReadingStatus, RoiFigures};
use crate::error::LedgerError;

use super::{ConsumptionStore, ReadingQuery};

#[derive(Default)]
struct State {
    customers: HashMap<String, Customer>,
    // email -> customer id
    user_links: HashMap<String, String>,
    readings: HashMap<String, Reading>,
    rois: HashMap<String, MonthlyRoi>,
    // (customer, year, month) -> roi id
    roi_keys: HashMap<(String, i32, u32), String>,
}

/// Ledger store holding everything behind one async lock. Each method takes
/// the lock for its whole body, so every call is atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConsumptionStore for MemoryStore {
    async fn insert_customer(&self, customer: &Customer) -> Result<(), LedgerError> {
        let mut state = self.inner.write().await;
        if state.customers.contains_key(&customer.id) {
            return Err(LedgerError::Duplicate(format!(
                "Customer {} already exists",
                customer.id
            )));
        }
        state.customers.insert(customer.id.clone(), customer.clone());
        Ok(())
    }

    async fn customer(&self, id: &str) -> Result<Option<Customer>, LedgerError> {
        let state = self.inner.read().await;
        Ok(state.customers.get(id).cloned())
    }

    async fn customers(&self) -> Result<Vec<Customer>, LedgerError> {
        let state = self.inner.read().await;
        let mut all: Vec<Customer> = state.customers.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn set_customer_averages(
        &self,
        id: &str,
        average_power_kw: f64,
        average_energy_kwh: f64,
    ) -> Result<(), LedgerError> {
        let mut state = self.inner.write().await;
        let customer = state
            .customers
            .get_mut(id)
            .ok_or_else(|| LedgerError::NotFound(format!("Customer {}", id)))?;
        customer.average_power_kw = average_power_kw;
        customer.average_energy_kwh = average_energy_kwh;
        Ok(())
    }

    async fn link_user(&self, email: &str, customer_id: &str) -> Result<(), LedgerError> {
        let mut state = self.inner.write().await;
        // Re-linking an email replaces the previous link.
        state
            .user_links
            .insert(email.to_string(), customer_id.to_string());
        Ok(())
    }

    async fn customer_for_user(&self, email: &str) -> Result<Option<String>, LedgerError> {
        let state = self.inner.read().await;
        Ok(state.user_links.get(email).cloned())
    }

    async fn insert_reading(&self, reading: &Reading) -> Result<(), LedgerError> {
        let mut state = self.inner.write().await;
        if state.readings.contains_key(&reading.id) {
            return Err(LedgerError::Duplicate(format!(
                "Reading {} already exists",
                reading.id
            )));
        }
        let clash = state.readings.values().any(|r| {
            r.status == ReadingStatus::Submitted
                && r.customer == reading.customer
                && r.timestamp == reading.timestamp
                && r.active_power_kw == reading.active_power_kw
                && r.reactive_energy_kwh == reading.reactive_energy_kwh
        });
        if clash {
            return Err(LedgerError::Duplicate(format!(
                "Identical submitted measurement for customer {} at {}",
                reading.customer, reading.timestamp
            )));
        }
        state.readings.insert(reading.id.clone(), reading.clone());
        Ok(())
    }

    async fn reading(&self, id: &str) -> Result<Option<Reading>, LedgerError> {
        let state = self.inner.read().await;
        Ok(state.readings.get(id).cloned())
    }

    async fn set_reading_status(
        &self,
        id: &str,
        status: ReadingStatus,
    ) -> Result<(), LedgerError> {
        let mut state = self.inner.write().await;
        let reading = state
            .readings
            .get_mut(id)
            .ok_or_else(|| LedgerError::NotFound(format!("Reading {}", id)))?;
        reading.status = status;
        Ok(())
    }

    async fn count_readings(&self, customer_id: &str) -> Result<u64, LedgerError> {
        let state = self.inner.read().await;
        let count = state
            .readings
            .values()
            .filter(|r| r.customer == customer_id)
            .count();
        Ok(count as u64)
    }

    async fn measurement_exists(
        &self,
        customer_id: &str,
        timestamp: NaiveDateTime,
        active_power_kw: f64,
        reactive_energy_kwh: f64,
    ) -> Result<bool, LedgerError> {
        let state = self.inner.read().await;
        Ok(state.readings.values().any(|r| {
            r.status == ReadingStatus::Submitted
                && r.customer == customer_id
                && r.timestamp == timestamp
                && r.active_power_kw == active_power_kw
                && r.reactive_energy_kwh == reactive_energy_kwh
        }))
    }

    async fn submitted_readings(&self, query: ReadingQuery) -> Result<Vec<Reading>, LedgerError> {
        let state = self.inner.read().await;
        let mut matched: Vec<Reading> = state
            .readings
            .values()
            .filter(|r| r.status == ReadingStatus::Submitted)
            .filter(|r| query.customer.as_deref().map_or(true, |c| r.customer == c))
            .filter(|r| query.from.map_or(true, |from| r.timestamp >= from))
            .filter(|r| query.until.map_or(true, |until| r.timestamp < until))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(matched)
    }

    async fn insert_roi(&self, roi: &MonthlyRoi) -> Result<(), LedgerError> {
        let mut state = self.inner.write().await;
        let key = (roi.customer.clone(), roi.year, roi.month);
        if state.rois.contains_key(&roi.id) || state.roi_keys.contains_key(&key) {
            return Err(LedgerError::Duplicate(format!(
                "ROI record for {} {}-{:02} already exists",
                roi.customer, roi.year, roi.month
            )));
        }
        state.roi_keys.insert(key, roi.id.clone());
        state.rois.insert(roi.id.clone(), roi.clone());
        Ok(())
    }

    async fn roi_for_period(
        &self,
        customer_id: &str,
        period: Period,
    ) -> Result<Option<MonthlyRoi>, LedgerError> {
        let state = self.inner.read().await;
        let key = (customer_id.to_string(), period.year(), period.month());
        Ok(state
            .roi_keys
            .get(&key)
            .and_then(|id| state.rois.get(id))
            .cloned())
    }

    async fn set_roi_figures(&self, id: &str, figures: RoiFigures) -> Result<(), LedgerError> {
        let mut state = self.inner.write().await;
        let roi = state
            .rois
            .get_mut(id)
            .ok_or_else(|| LedgerError::NotFound(format!("ROI record {}", id)))?;
        roi.apply(figures);
        Ok(())
    }

    async fn delete_roi(&self, id: &str) -> Result<(), LedgerError> {
        let mut state = self.inner.write().await;
        let roi = state
            .rois
            .remove(id)
            .ok_or_else(|| LedgerError::NotFound(format!("ROI record {}", id)))?;
        state
            .roi_keys
            .remove(&(roi.customer.clone(), roi.year, roi.month));
        Ok(())
    }

    async fn count_roi(&self, customer_id: &str) -> Result<u64, LedgerError> {
        let state = self.inner.read().await;
        let count = state
            .rois
            .values()
            .filter(|r| r.customer == customer_id)
            .count();
        Ok(count as u64)
    }

    async fn list_roi(&self) -> Result<Vec<MonthlyRoi>, LedgerError> {
        let state = self.inner.read().await;
        let mut all: Vec<MonthlyRoi> = state.rois.values().cloned().collect();
        all.sort_by(|a, b| {
            a.customer
                .cmp(&b.customer)
                .then_with(|| (a.year, a.month).cmp(&(b.year, b.month)))
        });
        Ok(all)
    }
}
