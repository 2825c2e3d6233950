//! CSV ingestion of readings into the ledger.
//!
//! Rows that fail parsing or submission are logged and skipped; only
//! storage failures abort the run.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::{Customer, ReadingDraft};
use crate::error::LedgerError;
use crate::ledger::LedgerService;

/// One CSV row. Header: customer,timestamp,active_power_kw,reactive_energy_kwh
#[derive(Debug, Deserialize)]
struct CsvReading {
    customer: String,
    timestamp: String,
    active_power_kw: f64,
    reactive_energy_kwh: f64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub submitted: usize,
    pub skipped: usize,
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .map_err(|e| format!("invalid timestamp {:?}: {}", s, e))
}

/// Submit every reading in the file, registering customers on first sight.
pub async fn import_readings(service: &LedgerService, path: &Path) -> Result<ImportStats> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening readings file {}", path.display()))?;

    let mut stats = ImportStats::default();
    let mut known: HashSet<String> = HashSet::new();

    for (row, record) in reader.deserialize::<CsvReading>().enumerate() {
        let line = row + 2; // header is line 1
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(line, error = %e, "skipped malformed row");
                stats.skipped += 1;
                continue;
            }
        };
        let timestamp = match parse_timestamp(&record.timestamp) {
            Ok(timestamp) => timestamp,
            Err(e) => {
                warn!(line, error = %e, "skipped row");
                stats.skipped += 1;
                continue;
            }
        };

        if !known.contains(&record.customer) {
            match service.customer_profile(&record.customer).await {
                Ok(_) => {}
                Err(LedgerError::NotFound(_)) => {
                    let registered = service
                        .register_customer(Customer::new(&record.customer, "", "", ""))
                        .await;
                    match registered {
                        Ok(()) => {
                            info!(customer = %record.customer, "registered customer from import");
                        }
                        Err(e @ LedgerError::Storage(_)) => return Err(e.into()),
                        Err(e) => {
                            warn!(line, error = %e, "skipped reading");
                            stats.skipped += 1;
                            continue;
                        }
                    }
                }
                Err(e) => return Err(e.into()),
            }
            known.insert(record.customer.clone());
        }

        let draft = ReadingDraft {
            customer: record.customer,
            timestamp,
            active_power_kw: record.active_power_kw,
            reactive_energy_kwh: record.reactive_energy_kwh,
        };
        match service.submit(draft).await {
            Ok(reading) => {
                info!(line, reading = %reading.id, "submitted");
                stats.submitted += 1;
            }
            Err(e @ LedgerError::Storage(_)) => return Err(e.into()),
            Err(e) => {
                warn!(line, error = %e, "skipped reading");
                stats.skipped += 1;
            }
        }
    }

    Ok(stats)
}
