//! Error types for the Storefront API.
//!
//! Every failure leaves the server as a JSON body:
//!
//! ```text
//! HTTP/1.1 400 Bad Request
//! { "code": "INSUFFICIENT_STOCK",
//!   "message": "Insufficient stock for Linen Shirt (M/White): available 1, requested 2" }
//! ```
//!
//! | Source                                  | Status | Code                 |
//! |-----------------------------------------|--------|----------------------|
//! | business rule / validation              | 400    | `CoreError::code()`  |
//! | unknown order or cart line              | 404    | `ORDER_NOT_FOUND`, ..|
//! | missing or bad bearer token             | 401    | `UNAUTHORIZED`       |
//! | malformed JSON body or header           | 400    | `INVALID_REQUEST`    |
//! | checkout exceeded its time budget       | 504    | `CHECKOUT_TIMEOUT`   |
//! | persistence / settings / internal       | 500    | `INTERNAL_ERROR`     |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use stitch_checkout::CheckoutError;
use stitch_core::CoreError;
use stitch_db::DbError;

/// Storefront API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Checkout did not finish in time; its outcome is unknown")]
    CheckoutTimeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Checkout(CheckoutError::Rejected(err))
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Checkout(CheckoutError::Rejected(err)) => match err {
                CoreError::OrderNotFound(_) | CoreError::CartItemNotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_REQUEST,
            },
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::CheckoutTimeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Checkout(_) | ApiError::Database(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Checkout(CheckoutError::Rejected(err)) => err.code(),
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::InvalidRequest(_) => "INVALID_REQUEST",
            ApiError::CheckoutTimeout => "CHECKOUT_TIMEOUT",
            ApiError::Checkout(_) | ApiError::Database(_) | ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Don't expose internal error details to clients
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            code: self.code(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
