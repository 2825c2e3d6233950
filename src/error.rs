use thiserror::Error;

/// Errors raised by ledger operations.
///
/// Every failure is raised before any persistent mutation, so an `Err` from
/// a ledger call means stored state is exactly what it was before the call.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Short error kind used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "validation",
            LedgerError::Duplicate(_) => "duplicate",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::Storage(_) => "storage",
        }
    }
}

// Conversion from common error types

impl From<validator::ValidationErrors> for LedgerError {
    fn from(errors: validator::ValidationErrors) -> Self {
        LedgerError::Validation(errors.to_string())
    }
}

impl From<anyhow::Error> for LedgerError {
    fn from(error: anyhow::Error) -> Self {
        LedgerError::Storage(error.to_string())
    }
}

#[cfg(feature = "db")]
impl From<sqlx::Error> for LedgerError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => LedgerError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                LedgerError::Duplicate(db_err.to_string())
            }
            sqlx::Error::Database(db_err) => {
                LedgerError::Storage(format!("Database error: {}", db_err))
            }
            _ => LedgerError::Storage(format!("Database error: {}", error)),
        }
    }
}
