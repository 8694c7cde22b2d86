//! # Order Numbers
//!
//! Format: `ORD-YYMMDDHHMMSS-XXXXXX`
//!
//! - `YYMMDDHHMMSS`: UTC creation time
//! - `XXXXXX`: 6 characters from a 32-symbol alphabet without look-alikes
//!   (no `0/O`, `1/I`), about 10⁹ combinations per second
//!
//! Uniqueness is enforced by `orders.order_number UNIQUE`. A collision fails
//! the checkout transaction; it is never retried silently.

use chrono::{DateTime, Utc};
use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const SUFFIX_LEN: usize = 6;

/// Generates an order number for the given instant.
pub fn generate(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();

    format!("ORD-{}-{}", now.format("%y%m%d%H%M%S"), suffix)
}
