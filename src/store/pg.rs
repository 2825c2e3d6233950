//! Postgres-backed store (`db` feature).
//!
//! Schema is applied out-of-band via `sql/schema/ledger.sql`. Uniqueness of
//! submitted measurements and of the (customer, year, month) ROI key is
//! enforced by the schema's unique indexes; violations surface as
//! [`LedgerError::Duplicate`].

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::domain::{Customer, MonthlyRoi, Period, Reading, ReadingStatus, RoiFigures};
use crate::error::LedgerError;

use super::{ConsumptionStore, ReadingQuery};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str) -> Result<Self, LedgerError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: String,
    first_name: String,
    last_name: String,
    email: String,
    average_power_kw: f64,
    average_energy_kwh: f64,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            average_power_kw: row.average_power_kw,
            average_energy_kwh: row.average_energy_kwh,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReadingRow {
    id: String,
    customer_id: String,
    timestamp: NaiveDateTime,
    active_power_kw: f64,
    reactive_energy_kwh: f64,
    tariff_bucket: String,
    status: String,
}

impl ReadingRow {
    fn into_domain(self) -> Result<Reading, LedgerError> {
        let tariff_bucket = self
            .tariff_bucket
            .parse()
            .map_err(|e: String| LedgerError::Storage(format!("Reading {}: {}", self.id, e)))?;
        let status = self
            .status
            .parse::<ReadingStatus>()
            .map_err(|e| LedgerError::Storage(format!("Reading {}: {}", self.id, e)))?;
        Ok(Reading {
            id: self.id,
            customer: self.customer_id,
            timestamp: self.timestamp,
            active_power_kw: self.active_power_kw,
            reactive_energy_kwh: self.reactive_energy_kwh,
            tariff_bucket,
            status,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RoiRow {
    id: String,
    customer_id: String,
    year: i32,
    month: i32,
    average_power_kw: f64,
    average_energy_kwh: f64,
    low_tariff_value: f64,
    high_tariff_value: f64,
}

impl RoiRow {
    fn into_domain(self) -> Result<MonthlyRoi, LedgerError> {
        let month = u32::try_from(self.month).map_err(|_| {
            LedgerError::Storage(format!("Invalid month {} in ROI {}", self.month, self.id))
        })?;
        Ok(MonthlyRoi {
            id: self.id,
            customer: self.customer_id,
            year: self.year,
            month,
            average_power_kw: self.average_power_kw,
            average_energy_kwh: self.average_energy_kwh,
            low_tariff_value: self.low_tariff_value,
            high_tariff_value: self.high_tariff_value,
        })
    }
}

const READING_COLUMNS: &str = r#"id, customer_id, "timestamp", active_power_kw, reactive_energy_kwh, tariff_bucket, status"#;

#[async_trait]
impl ConsumptionStore for PgStore {
    async fn insert_customer(&self, customer: &Customer) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, first_name, last_name, email, average_power_kw, average_energy_kwh)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.email)
        .bind(customer.average_power_kw)
        .bind(customer.average_energy_kwh)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn customer(&self, id: &str) -> Result<Option<Customer>, LedgerError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            "SELECT id, first_name, last_name, email, average_power_kw, average_energy_kwh
             FROM customers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Customer::from))
    }

    async fn customers(&self) -> Result<Vec<Customer>, LedgerError> {
        let rows = sqlx::query_as::<_, CustomerRow>(
            "SELECT id, first_name, last_name, email, average_power_kw, average_energy_kwh
             FROM customers ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Customer::from).collect())
    }

    async fn set_customer_averages(
        &self,
        id: &str,
        average_power_kw: f64,
        average_energy_kwh: f64,
    ) -> Result<(), LedgerError> {
        let result = sqlx::query(
            "UPDATE customers SET average_power_kw = $2, average_energy_kwh = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(average_power_kw)
        .bind(average_energy_kwh)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound(format!("Customer {}", id)));
        }
        Ok(())
    }

    async fn link_user(&self, email: &str, customer_id: &str) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO user_links (email, customer_id) VALUES ($1, $2)
            ON CONFLICT (email) DO UPDATE SET customer_id = EXCLUDED.customer_id
            "#,
        )
        .bind(email)
        .bind(customer_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn customer_for_user(&self, email: &str) -> Result<Option<String>, LedgerError> {
        let customer = sqlx::query_scalar::<_, String>(
            "SELECT customer_id FROM user_links WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }

    async fn insert_reading(&self, reading: &Reading) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO readings (id, customer_id, "timestamp", active_power_kw, reactive_energy_kwh, tariff_bucket, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&reading.id)
        .bind(&reading.customer)
        .bind(reading.timestamp)
        .bind(reading.active_power_kw)
        .bind(reading.reactive_energy_kwh)
        .bind(reading.tariff_bucket.to_string())
        .bind(reading.status.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn reading(&self, id: &str) -> Result<Option<Reading>, LedgerError> {
        let row = sqlx::query_as::<_, ReadingRow>(&format!(
            "SELECT {} FROM readings WHERE id = $1",
            READING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ReadingRow::into_domain).transpose()
    }

    async fn set_reading_status(
        &self,
        id: &str,
        status: ReadingStatus,
    ) -> Result<(), LedgerError> {
        let result = sqlx::query("UPDATE readings SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound(format!("Reading {}", id)));
        }
        Ok(())
    }

    async fn count_readings(&self, customer_id: &str) -> Result<u64, LedgerError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM readings WHERE customer_id = $1",
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn measurement_exists(
        &self,
        customer_id: &str,
        timestamp: NaiveDateTime,
        active_power_kw: f64,
        reactive_energy_kwh: f64,
    ) -> Result<bool, LedgerError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM readings
                WHERE status = 'submitted'
                  AND customer_id = $1
                  AND "timestamp" = $2
                  AND active_power_kw = $3
                  AND reactive_energy_kwh = $4
            )
            "#,
        )
        .bind(customer_id)
        .bind(timestamp)
        .bind(active_power_kw)
        .bind(reactive_energy_kwh)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn submitted_readings(&self, query: ReadingQuery) -> Result<Vec<Reading>, LedgerError> {
        let rows = sqlx::query_as::<_, ReadingRow>(&format!(
            r#"
            SELECT {} FROM readings
            WHERE status = 'submitted'
              AND ($1::text IS NULL OR customer_id = $1)
              AND ($2::timestamp IS NULL OR "timestamp" >= $2)
              AND ($3::timestamp IS NULL OR "timestamp" < $3)
            ORDER BY "timestamp", id
            "#,
            READING_COLUMNS
        ))
        .bind(query.customer)
        .bind(query.from)
        .bind(query.until)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ReadingRow::into_domain).collect()
    }

    async fn insert_roi(&self, roi: &MonthlyRoi) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO monthly_roi (id, customer_id, year, month, average_power_kw, average_energy_kwh, low_tariff_value, high_tariff_value)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&roi.id)
        .bind(&roi.customer)
        .bind(roi.year)
        .bind(roi.month as i32)
        .bind(roi.average_power_kw)
        .bind(roi.average_energy_kwh)
        .bind(roi.low_tariff_value)
        .bind(roi.high_tariff_value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn roi_for_period(
        &self,
        customer_id: &str,
        period: Period,
    ) -> Result<Option<MonthlyRoi>, LedgerError> {
        let row = sqlx::query_as::<_, RoiRow>(
            "SELECT id, customer_id, year, month, average_power_kw, average_energy_kwh, low_tariff_value, high_tariff_value
             FROM monthly_roi WHERE customer_id = $1 AND year = $2 AND month = $3",
        )
        .bind(customer_id)
        .bind(period.year())
        .bind(period.month() as i32)
        .fetch_optional(&self.pool)
        .await?;
        row.map(RoiRow::into_domain).transpose()
    }

    async fn set_roi_figures(&self, id: &str, figures: RoiFigures) -> Result<(), LedgerError> {
        let result = sqlx::query(
            r#"
            UPDATE monthly_roi
            SET average_power_kw = $2, average_energy_kwh = $3, low_tariff_value = $4, high_tariff_value = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(figures.average_power_kw)
        .bind(figures.average_energy_kwh)
        .bind(figures.low_tariff_value)
        .bind(figures.high_tariff_value)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound(format!("ROI record {}", id)));
        }
        Ok(())
    }

    async fn delete_roi(&self, id: &str) -> Result<(), LedgerError> {
        let result = sqlx::query("DELETE FROM monthly_roi WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound(format!("ROI record {}", id)));
        }
        Ok(())
    }

    async fn count_roi(&self, customer_id: &str) -> Result<u64, LedgerError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM monthly_roi WHERE customer_id = $1",
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn list_roi(&self) -> Result<Vec<MonthlyRoi>, LedgerError> {
        let rows = sqlx::query_as::<_, RoiRow>(
            "SELECT id, customer_id, year, month, average_power_kw, average_energy_kwh, low_tariff_value, high_tariff_value
             FROM monthly_roi ORDER BY customer_id, year, month",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(RoiRow::into_domain).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Full store behavior is covered against MemoryStore; these only run
    // against a real database.
    #[tokio::test]
    #[ignore = "requires a Postgres instance with sql/schema/ledger.sql applied"]
    async fn test_connect_and_round_trip() {
        let url = std::env::var("SOLAR_ROI__DB__URL")
            .unwrap_or_else(|_| "postgres://localhost/solar_roi".to_string());
        let store = PgStore::connect(&url).await.unwrap();

        let customer = Customer::new("PGTEST", "Pg", "Test", "pg@example.com");
        store.insert_customer(&customer).await.unwrap();
        let fetched = store.customer("PGTEST").await.unwrap().unwrap();
        assert_eq!(fetched.id, "PGTEST");
    }
}
