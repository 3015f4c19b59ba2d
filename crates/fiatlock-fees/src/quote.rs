//! Fiat-to-token quoting.
//!
//! Exchange rates are fiat cents per whole token. The token amount for a
//! fiat payment rounds **up**, so the sub-unit remainder is absorbed by the
//! buyer and the seller never receives less fiat per token than quoted.

use fiatlock_types::{FiatlockError, Result, constants};

/// Tokens (smallest unit) owed for `fiat_amount` cents at `exchange_rate`.
///
/// `ceil(fiat_amount × 10^decimals / exchange_rate)`
///
/// # Errors
/// - `InvalidOrder` for a zero exchange rate
/// - `AmountOverflow` if the scaled amount does not fit a `u128`
pub fn token_amount_for_fiat(fiat_amount: u64, exchange_rate: u64, decimals: u8) -> Result<u128> {
    if exchange_rate == 0 {
        return Err(FiatlockError::InvalidOrder {
            reason: "exchange rate must be positive".into(),
        });
    }
    let scaled = 10u128
        .checked_pow(u32::from(decimals))
        .and_then(|unit| u128::from(fiat_amount).checked_mul(unit))
        .ok_or_else(|| FiatlockError::AmountOverflow {
            context: format!("{fiat_amount} cents at {decimals} decimals"),
        })?;
    Ok(scaled.div_ceil(u128::from(exchange_rate)))
}

/// Check the whole-currency-unit rule and the configured trade bounds.
///
/// # Errors
/// - `FractionalFiatAmount` if `fiat_amount` is not a multiple of 100 cents
/// - `TradeValueOutOfBounds` if it lies outside `[min, max]`
pub fn validate_fiat_amount(fiat_amount: u64, min: u64, max: u64) -> Result<()> {
    if fiat_amount % constants::CENTS_PER_UNIT != 0 {
        return Err(FiatlockError::FractionalFiatAmount(fiat_amount));
    }
    if fiat_amount < min || fiat_amount > max {
        return Err(FiatlockError::TradeValueOutOfBounds {
            fiat_amount,
            min,
            max,
        });
    }
    Ok(())
}
