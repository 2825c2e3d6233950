use serde::{Deserialize, Serialize};

/// A registered customer with rolled-up lifetime consumption averages.
///
/// The averages cover the customer's submitted readings only and are
/// rewritten wholesale by the rollup after every submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub average_power_kw: f64,
    pub average_energy_kwh: f64,
}

impl Customer {
    pub fn new(id: &str, first_name: &str, last_name: &str, email: &str) -> Self {
        Self {
            id: id.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            average_power_kw: 0.0,
            average_energy_kwh: 0.0,
        }
    }

    /// Display name used by reports; falls back to the id when no name
    /// parts were captured.
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.id.clone()
        } else {
            name.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_customer_starts_with_zero_averages() {
        let customer = Customer::new("ACME", "Ada", "Lovelace", "ada@example.com");
        assert_eq!(customer.average_power_kw, 0.0);
        assert_eq!(customer.average_energy_kwh, 0.0);
    }

    #[test]
    fn test_full_name() {
        assert_eq!(
            Customer::new("ACME", "Ada", "Lovelace", "").full_name(),
            "Ada Lovelace"
        );
        assert_eq!(Customer::new("ACME", "Ada", "", "").full_name(), "Ada");
        assert_eq!(Customer::new("ACME", "", "", "").full_name(), "ACME");
    }
}
