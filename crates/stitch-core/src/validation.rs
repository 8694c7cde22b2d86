//! # Input Checks
//!
//! Cheap shape checks on ids, quantities and free text.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (axum)                                        │
//! │  ├── JSON shape / required fields (serde)                              │
//! │  └── Unknown payment method names rejected on deserialize              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Ids, quantities, notes, idempotency keys                          │
//! │  └── Runs before any database access                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (quantity >= 0), CHECK (used_count <= usage_limit)          │
//! │  ├── UNIQUE constraints                                                │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stitch_core::validation::{validate_id, validate_quantity};
//!
//! assert!(validate_id("shippingAddressId", "550e8400-e29b-41d4-a716-446655440000").is_ok());
//! assert!(validate_quantity(5).is_ok());
//! ```

use crate::error::ValidationError;
use crate::{MAX_CART_ITEMS, MAX_IDEMPOTENCY_KEY_LENGTH, MAX_ITEM_QUANTITY, MAX_NOTES_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Requires a non-blank record id, naming the field on failure.
///
/// Ids are opaque here. Whether one names a real row (and one the caller
/// owns) is answered by the lookup, which reports the matching not-found
/// error.
///
/// ## Example
/// ```rust
/// use stitch_core::validation::validate_id;
///
/// assert!(validate_id("couponId", "SUMMER10").is_ok());
/// assert!(validate_id("couponId", "  ").is_err());
/// ```
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a client-supplied idempotency key.
///
/// ## Rules
/// - 1 to 100 characters after trimming
/// - Printable ASCII only (it travels as an HTTP header)
pub fn validate_idempotency_key(key: &str) -> ValidationResult<String> {
    let key = key.trim();

    if key.is_empty() {
        return Err(ValidationError::Required {
            field: "Idempotency-Key".to_string(),
        });
    }

    if key.len() > MAX_IDEMPOTENCY_KEY_LENGTH {
        return Err(ValidationError::TooLong {
            field: "Idempotency-Key".to_string(),
            max: MAX_IDEMPOTENCY_KEY_LENGTH,
        });
    }

    if !key.chars().all(|c| c.is_ascii_graphic()) {
        return Err(ValidationError::InvalidFormat {
            field: "Idempotency-Key".to_string(),
            reason: "must contain printable ASCII characters only".to_string(),
        });
    }

    Ok(key.to_string())
}

// =============================================================================
// Text Validators
// =============================================================================

/// Normalizes optional order notes.
///
/// Blank notes become `None`; anything longer than [`MAX_NOTES_LENGTH`]
/// characters is rejected.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if notes.chars().count() > MAX_NOTES_LENGTH {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LENGTH,
        });
    }

    Ok(Some(notes.to_string()))
}

/// Validates an optional size/color selector value.
pub fn validate_attribute(field: &str, value: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    if value.len() > 50 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 50,
        });
    }

    Ok(Some(value.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates cart size before adding a new distinct line.
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
