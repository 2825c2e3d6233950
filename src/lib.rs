//! Customer power-consumption ledger with monthly tariff ROI reconciliation.
//!
//! Readings enter through [`ledger::LedgerService::submit`], which assigns
//! identity and a tariff bucket, persists the entry, then re-derives the
//! month's [`domain::MonthlyRoi`] record and the customer's lifetime
//! averages. Cancellation reverses the derivation; nothing else ever writes
//! the derived records.

pub mod access;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod import;
pub mod ledger;
pub mod report;
pub mod store;
pub mod telemetry;
