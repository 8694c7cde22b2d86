//! # Checkout Errors
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CheckoutError                                                          │
//! │  ├── Rejected(CoreError)   business rule, nothing persisted  → 400     │
//! │  ├── Transaction(DbError)  persistence failure, rolled back  → 500     │
//! │  └── Settings(String)      settings provider unavailable     → 500     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A commit-time stock or coupon shortfall is a `Rejected`, not a
//! `Transaction`: losing a race is a normal business outcome.

use thiserror::Error;

use stitch_core::{CoreError, ValidationError};
use stitch_db::DbError;

#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A business rule rejected the request.
    #[error(transparent)]
    Rejected(#[from] CoreError),

    /// Unexpected persistence failure.
    #[error("Checkout transaction failed: {0}")]
    Transaction(#[from] DbError),

    /// The settings provider could not supply store settings.
    #[error("Store settings unavailable: {0}")]
    Settings(String),
}

impl From<ValidationError> for CheckoutError {
    fn from(err: ValidationError) -> Self {
        CheckoutError::Rejected(CoreError::Validation(err))
    }
}

impl CheckoutError {
    /// The business error, if this is a rejection.
    pub fn as_rejection(&self) -> Option<&CoreError> {
        match self {
            CheckoutError::Rejected(err) => Some(err),
            _ => None,
        }
    }
}

pub type CheckoutResult<T> = Result<T, CheckoutError>;
