//! # Persistence Boundary Conversions
//!
//! Money and decimal values are stored as TEXT. This module is the only
//! place that turns those strings back into [`Money`] / [`Decimal`]; a value
//! that fails to parse surfaces as [`DbError::Corrupt`] naming the column.
//!
//! ```text
//! ┌────────────────────┐   to_storage_string()   ┌──────────────────────┐
//! │  Money (Decimal)   │ ──────────────────────► │  TEXT "46000.5"      │
//! │                    │ ◄────────────────────── │                      │
//! └────────────────────┘   money(column, text)   └──────────────────────┘
//! ```

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::str::FromStr;

use stitch_core::Money;

use crate::error::{DbError, DbResult};

pub(crate) fn money(column: &str, raw: &str) -> DbResult<Money> {
    raw.parse::<Money>()
        .map_err(|_| DbError::corrupt(column, raw))
}

pub(crate) fn optional_money(column: &str, raw: Option<&str>) -> DbResult<Option<Money>> {
    raw.map(|r| money(column, r)).transpose()
}

pub(crate) fn decimal(column: &str, raw: &str) -> DbResult<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|_| DbError::corrupt(column, raw))
}

pub(crate) fn json<T: DeserializeOwned>(column: &str, raw: &str) -> DbResult<T> {
    serde_json::from_str(raw).map_err(|_| DbError::corrupt(column, raw))
}

pub(crate) fn optional_money_text(value: Option<Money>) -> Option<String> {
    value.map(|m| m.to_storage_string())
}
