use serde::{Deserialize, Serialize};

use super::period::Period;

/// The four derived figures of a monthly ROI record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoiFigures {
    pub average_power_kw: f64,
    pub average_energy_kwh: f64,
    pub low_tariff_value: f64,
    pub high_tariff_value: f64,
}

/// Derived monthly record for one customer and calendar month.
///
/// Written only by reconciliation; at most one exists per
/// (customer, year, month).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyRoi {
    pub id: String,
    pub customer: String,
    pub year: i32,
    pub month: u32,
    pub average_power_kw: f64,
    pub average_energy_kwh: f64,
    pub low_tariff_value: f64,
    pub high_tariff_value: f64,
}

impl MonthlyRoi {
    /// Identity: `{customer}-{MonthName}-{year}-{ordinal}` where the ordinal
    /// is one past the customer's existing ROI record count. Stable once
    /// assigned, even though later counts change.
    pub fn make_id(customer: &str, period: Period, prior_count: u64) -> String {
        format!(
            "{}-{}-{}-{}",
            customer,
            period.month_name(),
            period.year(),
            prior_count + 1
        )
    }

    pub fn new(customer: &str, period: Period, figures: RoiFigures, prior_count: u64) -> Self {
        Self {
            id: Self::make_id(customer, period, prior_count),
            customer: customer.to_string(),
            year: period.year(),
            month: period.month(),
            average_power_kw: figures.average_power_kw,
            average_energy_kwh: figures.average_energy_kwh,
            low_tariff_value: figures.low_tariff_value,
            high_tariff_value: figures.high_tariff_value,
        }
    }

    pub fn figures(&self) -> RoiFigures {
        RoiFigures {
            average_power_kw: self.average_power_kw,
            average_energy_kwh: self.average_energy_kwh,
            low_tariff_value: self.low_tariff_value,
            high_tariff_value: self.high_tariff_value,
        }
    }

    /// Overwrite the derived figures in place, keeping identity and key.
    pub fn apply(&mut self, figures: RoiFigures) {
        self.average_power_kw = figures.average_power_kw;
        self.average_energy_kwh = figures.average_energy_kwh;
        self.low_tariff_value = figures.low_tariff_value;
        self.high_tariff_value = figures.high_tariff_value;
    }

    pub fn period(&self) -> Option<Period> {
        Period::new(self.year, self.month)
    }
}
