//! Money conversion at the request boundary.
//!
//! All balances and entries are integer cents. Decimal dollars only ever enter
//! through [`usd_to_cents`], so fractional-cent drift has exactly one entry point.

use crate::error::{DomainError, DomainResult};

/// Largest dollar amount accepted (keeps `amount * 100` exact in an f64).
const MAX_USD: f64 = 1_000_000_000_000.0;

/// Convert a dollar amount to integer cents: `round(amount_usd * 100)`.
///
/// Rejects non-finite input, anything that rounds to zero or below, and
/// amounts beyond [`MAX_USD`].
pub fn usd_to_cents(amount_usd: f64) -> DomainResult<i64> {
    if !amount_usd.is_finite() {
        return Err(DomainError::invalid_amount("amount must be a finite number"));
    }
    if amount_usd.abs() > MAX_USD {
        return Err(DomainError::invalid_amount("amount is too large"));
    }

    let cents = (amount_usd * 100.0).round() as i64;
    if cents <= 0 {
        return Err(DomainError::invalid_amount("amount must be greater than zero"));
    }
    Ok(cents)
}

/// Display conversion (`cents / 100`). Never feed the result back into the ledger.
pub fn cents_to_usd(cents: i64) -> f64 {
    cents as f64 / 100.0
}
