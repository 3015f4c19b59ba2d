//! Sell-order types.
//!
//! An [`Order`] is a seller's standing offer: `total_amount` tokens locked in
//! pooled custody, released piecewise to buyers who prove a fiat payment over
//! the order's [`PaymentRail`] at the order's exchange rate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{AccountLinesHash, Address, OrderId, PaymentRail, TokenInfo, constants};

/// Alphabet for private codes; omits look-alike characters (0/O, 1/I).
const PRIVATE_CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// A seller's locked-token offer.
///
/// `remaining_amount` never exceeds `total_amount`. It decreases through
/// fills (reservation) and seller withdrawals and increases only when an
/// expired trade returns its reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub seller: Address,
    /// Token address with cached decimals.
    pub token: TokenInfo,
    pub total_amount: u128,
    pub remaining_amount: u128,
    /// Fiat cents per whole token.
    pub exchange_rate: u64,
    pub rail: PaymentRail,
    pub account_lines_hash: AccountLinesHash,
    pub is_public: bool,
    /// Lookup code for unlisted orders; `None` while the order is public.
    pub private_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Tokens currently out of the order: reserved by pending trades,
    /// paid to buyers, or withdrawn by the seller.
    #[must_use]
    pub fn consumed(&self) -> u128 {
        self.total_amount - self.remaining_amount
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining_amount == 0
    }

    /// Deterministic private code for an order ID.
    #[must_use]
    pub fn private_code_for(id: &OrderId) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"fiatlock:private_code:v1:");
        hasher.update(id.0.as_bytes());
        let hash = hasher.finalize();
        hash.iter()
            .take(constants::PRIVATE_CODE_LEN)
            .map(|b| char::from(PRIVATE_CODE_ALPHABET[usize::from(b % 32)]))
            .collect()
    }
}

impl std::fmt::Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Order[{}] {} {}/{} @ {} cents via {}",
            self.id,
            self.token.symbol,
            self.remaining_amount,
            self.total_amount,
            self.exchange_rate,
            self.rail,
        )
    }
}

/// One seller withdrawal from an order, kept for the activity timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRecord {
    pub order_id: OrderId,
    pub amount: u128,
    pub remaining_after: u128,
    pub withdrawn_at: DateTime<Utc>,
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    /// A public 6-decimal stablecoin order selling `amount` at 7.30 CNY.
    pub fn dummy(amount: u128) -> Self {
        let seller = Address::random();
        let token = TokenInfo::new(Address::random(), "USDC", 6);
        let created_at = Utc::now();
        Self {
            id: OrderId::derive(
                &seller,
                &token.address,
                amount,
                730,
                created_at.timestamp(),
                rand::random::<u64>(),
            ),
            seller,
            token,
            total_amount: amount,
            remaining_amount: amount,
            exchange_rate: 730,
            rail: PaymentRail::Alipay,
            account_lines_hash: AccountLinesHash::compute("Test Seller", "seller@example.com"),
            is_public: true,
            private_code: None,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumed_tracks_remaining() {
        let mut order = Order::dummy(1_000_000);
        assert_eq!(order.consumed(), 0);
        order.remaining_amount = 400_000;
        assert_eq!(order.consumed(), 600_000);
        assert!(!order.is_exhausted());
        order.remaining_amount = 0;
        assert!(order.is_exhausted());
    }

    #[test]
    fn private_code_is_stable_and_well_formed() {
        let order = Order::dummy(1);
        let a = Order::private_code_for(&order.id);
        let b = Order::private_code_for(&order.id);
        assert_eq!(a, b);
        assert_eq!(a.len(), constants::PRIVATE_CODE_LEN);
        assert!(a.bytes().all(|c| PRIVATE_CODE_ALPHABET.contains(&c)));
    }

    #[test]
    fn order_display() {
        let order = Order::dummy(1_000_000);
        let s = format!("{order}");
        assert!(s.contains("USDC"));
        assert!(s.contains("ALIPAY"));
    }

    #[test]
    fn serde_roundtrip() {
        let order = Order::dummy(5_000_000);
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, back);
    }
}
