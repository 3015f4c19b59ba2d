//! ERC20-style token metadata.
//!
//! Amounts are always carried in the token's smallest unit as `u128`.
//! The decimals are cached on every order so pricing never needs to
//! re-resolve them.

use serde::{Deserialize, Serialize};

use crate::{Address, FiatlockError, Result};

/// A token the engine can lock, with its cached decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenInfo {
    #[must_use]
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
        }
    }

    /// `10^decimals`, the number of smallest units in one whole token.
    ///
    /// # Errors
    /// Returns `AmountOverflow` when the decimals do not fit a `u128` scale.
    pub fn unit(&self) -> Result<u128> {
        10u128
            .checked_pow(u32::from(self.decimals))
            .ok_or_else(|| FiatlockError::AmountOverflow {
                context: format!("10^{} for {}", self.decimals, self.symbol),
            })
    }

    /// Render a smallest-unit amount as a decimal string (`1500000` → `1.5`).
    #[must_use]
    pub fn format_amount(&self, amount: u128) -> String {
        let Ok(unit) = self.unit() else {
            return amount.to_string();
        };
        let whole = amount / unit;
        let frac = amount % unit;
        if frac == 0 {
            return whole.to_string();
        }
        let digits = format!("{frac:0width$}", width = usize::from(self.decimals));
        format!("{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl std::fmt::Display for TokenInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.symbol, self.address.short())
    }
}
