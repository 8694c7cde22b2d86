//! # Storage Errors
//!
//! Every repository and [`crate::UnitOfWork`] call returns [`DbResult`].
//!
//! ```text
//! sqlx::Error ──► DbError ──► CheckoutError::Transaction ──► HTTP 500
//!                  │                (engine rolls back)      (details logged,
//!                  │                                          generic body)
//!                  └─ constraint failures keep the column list SQLite reports
//! ```
//!
//! A stock or coupon shortfall is not an error here. Conditional updates
//! report whether they applied and the checkout engine decides what a miss
//! means for the shopper.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the write. `field` is SQLite's column list,
    /// e.g. `orders.user_id, orders.idempotency_key`.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A CHECK rejected the write: a counter went negative or past its cap.
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// BEGIN, COMMIT or ROLLBACK itself failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// No pooled connection freed up within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A stored value could not be turned back into a domain type.
    #[error("Corrupt {column} value '{value}'")]
    Corrupt { column: String, value: String },

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn corrupt(column: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::Corrupt {
            column: column.into(),
            value: value.into(),
        }
    }

    /// `true` for a UNIQUE failure whose column list names `column`
    /// (`table.column`).
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        match self {
            DbError::UniqueViolation { field, .. } => field.split(", ").any(|c| c == column),
            _ => false,
        }
    }

    /// Sorts an SQLite error message into a constraint variant.
    ///
    /// ```text
    /// "UNIQUE constraint failed: orders.order_number"   → UniqueViolation
    /// "FOREIGN KEY constraint failed"                   → ForeignKeyViolation
    /// "CHECK constraint failed: stock_quantity >= 0"    → CheckViolation
    /// anything else                                     → QueryFailed
    /// ```
    fn from_sqlite_message(message: &str) -> Self {
        if let Some(columns) = message.strip_prefix("UNIQUE constraint failed: ") {
            DbError::duplicate(columns, "unknown")
        } else if message.starts_with("FOREIGN KEY constraint failed") {
            DbError::ForeignKeyViolation {
                message: message.to_string(),
            }
        } else if message.starts_with("CHECK constraint failed") {
            DbError::CheckViolation {
                message: message.to_string(),
            }
        } else {
            DbError::QueryFailed(message.to_string())
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => DbError::from_sqlite_message(db_err.message()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            sqlx::Error::ColumnDecode { index, source } => DbError::corrupt(index, source.to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::corrupt("json", err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================
