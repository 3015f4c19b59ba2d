//! Fee calculation.
//!
//! The shipped policy charges a flat fee denominated in a stable-value unit:
//! 0.20 for public orders and 0.40 for private ones by default. Stable
//! tokens pay the flat fee at face value. Other tokens convert it through an
//! admin-set static price, rounding down. Tokens in neither table pay zero.

use fiatlock_types::{Address, FeeConfig, TokenInfo};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

/// Computes the fee reserved alongside a trade's token amount.
///
/// Implementations must be deterministic and side-effect free. The result is
/// in the token's smallest unit.
pub trait FeeCalculator: Send + Sync {
    fn calculate_fee(
        &self,
        token_amount: u128,
        fiat_amount: u64,
        token: &TokenInfo,
        buyer: &Address,
        is_public: bool,
    ) -> u128;
}

/// Flat-fee calculator backed by a [`FeeConfig`].
#[derive(Debug, Clone, Default)]
pub struct StaticFeeCalculator {
    config: FeeConfig,
}

impl StaticFeeCalculator {
    #[must_use]
    pub fn new(config: FeeConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &FeeConfig {
        &self.config
    }

    /// Does the fee table cover this token?
    #[must_use]
    pub fn supports(&self, token: &Address) -> bool {
        self.config.is_stable(token) || self.config.price_of(token).is_some()
    }

    /// Flat fee converted into `token`'s smallest unit, or `None` when the
    /// token is unpriced or the conversion does not fit.
    fn convert(&self, flat: Decimal, token: &TokenInfo) -> Option<u128> {
        let unit = Decimal::from_u128(token.unit().ok()?)?;
        let scaled = flat.checked_mul(unit)?;
        let amount = if self.config.is_stable(&token.address) {
            scaled
        } else {
            let price = self.config.price_of(&token.address)?;
            if price <= Decimal::ZERO {
                return None;
            }
            scaled.checked_div(price)?
        };
        amount.floor().to_u128()
    }
}

impl FeeCalculator for StaticFeeCalculator {
    fn calculate_fee(
        &self,
        _token_amount: u128,
        _fiat_amount: u64,
        token: &TokenInfo,
        _buyer: &Address,
        is_public: bool,
    ) -> u128 {
        let flat = if is_public {
            self.config.public_fee
        } else {
            self.config.private_fee
        };
        if let Some(fee) = self.convert(flat, token) {
            tracing::debug!(token = %token, is_public, fee, "fee computed");
            fee
        } else {
            tracing::warn!(token = %token, "token outside fee table, charging zero fee");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fiatlock_types::TokenPrice;

    fn token(decimals: u8) -> TokenInfo {
        TokenInfo::new(Address::random(), "TKN", decimals)
    }

    fn calc_with(stable: &[Address], prices: &[(Address, i64)]) -> StaticFeeCalculator {
        StaticFeeCalculator::new(FeeConfig {
            stable_tokens: stable.to_vec(),
            token_prices: prices
                .iter()
                .map(|(token, usd)| TokenPrice {
                    token: *token,
                    price: Decimal::new(*usd, 0),
                })
                .collect(),
            ..FeeConfig::default()
        })
    }

    #[test]
    fn stable_token_pays_face_value() {
        let usdc = token(6);
        let calc = calc_with(&[usdc.address], &[]);
        let buyer = Address::random();
        assert_eq!(calc.calculate_fee(1, 100, &usdc, &buyer, true), 200_000);
        assert_eq!(calc.calculate_fee(1, 100, &usdc, &buyer, false), 400_000);
    }

    #[test]
    fn priced_token_converts_and_rounds_down() {
        let weth = token(18);
        let calc = calc_with(&[], &[(weth.address, 3_000)]);
        // 0.20 / 3000 WETH = 0.0000666... → 66_666_666_666_666 wei
        let fee = calc.calculate_fee(1, 100, &weth, &Address::random(), true);
        assert_eq!(fee, 66_666_666_666_666);
    }

    #[test]
    fn unsupported_token_is_free() {
        let calc = calc_with(&[], &[]);
        let unknown = token(6);
        assert!(!calc.supports(&unknown.address));
        assert_eq!(
            calc.calculate_fee(5_000_000, 36_500, &unknown, &Address::random(), true),
            0
        );
    }

    #[test]
    fn zero_price_treated_as_unsupported() {
        let t = token(8);
        let calc = calc_with(&[], &[(t.address, 0)]);
        assert_eq!(calc.calculate_fee(1, 100, &t, &Address::random(), true), 0);
    }

    #[test]
    fn fee_independent_of_trade_size() {
        let usdc = token(6);
        let calc = calc_with(&[usdc.address], &[]);
        let buyer = Address::random();
        let small = calc.calculate_fee(1_000, 100, &usdc, &buyer, true);
        let large = calc.calculate_fee(1_000_000_000, 5_000_000, &usdc, &buyer, true);
        assert_eq!(small, large);
    }

    #[test]
    fn usable_as_trait_object() {
        let usdc = token(6);
        let calc: Box<dyn FeeCalculator> = Box::new(calc_with(&[usdc.address], &[]));
        assert_eq!(
            calc.calculate_fee(0, 0, &usdc, &Address::random(), true),
            200_000
        );
    }
}
