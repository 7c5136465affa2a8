//! Typed failures surfaced to the authentication/authorization service.

use chrono::{DateTime, Utc};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Constraint violation: duplicate name/username/identity triple,
    /// missing required field, or a value exceeding its length limit.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced id does not resolve to a non-deleted row.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Hard deletion attempted on a row still referenced through a
    /// RESTRICT foreign key.
    #[error("referential integrity violation: {0}")]
    ReferentialIntegrity(String),

    /// Login or OTP attempted while in a locked state. Callers translate
    /// this into a generic "too many attempts" response without exposing
    /// counters or exact unlock precision.
    #[error("locked until {until}")]
    Locked { until: DateTime<Utc> },

    /// A counter update lost its optimistic check mid-transaction; the
    /// caller should retry the transaction.
    #[error("concurrent update conflict, retry the transaction")]
    ConcurrencyConflict,

    #[error("configuration error: {0}")]
    Config(anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        ServiceError::NotFound { entity, id }
    }

    /// Map a driver error from a write, translating unique-index violations
    /// into validation failures and foreign-key violations into referential
    /// integrity failures.
    ///
    /// SQLite reports `ON DELETE RESTRICT` violations with extended code
    /// 1811, which the driver does not classify as a foreign-key violation,
    /// so the message is matched as well.
    pub(crate) fn from_write(err: sqlx::Error, what: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ServiceError::Validation(format!("duplicate {what}"))
            }
            sqlx::Error::Database(db)
                if db.is_foreign_key_violation() || db.message().contains("FOREIGN KEY") =>
            {
                ServiceError::ReferentialIntegrity(format!("{what}: {db}"))
            }
            _ => ServiceError::Database(err),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ServiceError::Validation(errors.to_string())
    }
}
