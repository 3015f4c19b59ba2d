//! # Trade: a buyer's reservation against an order
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐  valid proof, now ≤ expires_at   ┌─────────┐
//!   │ PENDING ├─────────────────────────────────▶│ SETTLED │
//!   └────┬────┘                                  └─────────┘
//!        │ now > expires_at
//!        ▼
//!   ┌─────────┐
//!   │ EXPIRED │
//!   └─────────┘
//! ```
//!
//! Both terminal states are final. `token_amount + fee_amount` was debited
//! from the parent order when the trade was created and is credited back
//! exactly once: to the buyer and treasury on settlement, or to the order
//! on expiry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, FiatlockError, OrderId, Result, TradeId, TxIdHash};

/// Lifecycle status of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    /// Tokens reserved; waiting for a payment proof.
    Pending,
    /// Proof accepted; tokens paid to the buyer, fee to the treasury.
    Settled,
    /// Payment window elapsed; reservation returned to the order.
    Expired,
}

impl TradeStatus {
    /// Can a trade move from this status to `target`?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Pending, Self::Settled | Self::Expired))
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Numeric status code used by relays (0 = pending, 1 = settled, 2 = expired).
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Settled => 1,
            Self::Expired => 2,
        }
    }
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Settled => write!(f, "SETTLED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// A single buyer's claim against an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub order_id: OrderId,
    pub buyer: Address,
    /// Tokens owed to the buyer on settlement (smallest unit).
    pub token_amount: u128,
    /// Fiat cents the buyer must pay; always a whole currency unit.
    pub fiat_amount: u64,
    /// Fee reserved alongside `token_amount`; earned only on settlement.
    pub fee_amount: u128,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: TradeStatus,
    /// Anti-replay hash of the payment that settled this trade.
    pub settlement_tx_id_hash: Option<TxIdHash>,
}

impl Trade {
    /// Total debited from the order for this trade.
    ///
    /// # Errors
    /// Returns `AmountOverflow` if the two amounts do not sum in a `u128`.
    pub fn reservation(&self) -> Result<u128> {
        self.token_amount
            .checked_add(self.fee_amount)
            .ok_or_else(|| FiatlockError::AmountOverflow {
                context: format!(
                    "trade {} reservation {} + fee {}",
                    self.id, self.token_amount, self.fee_amount
                ),
            })
    }

    /// The payment window is closed strictly after `expires_at`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == TradeStatus::Pending
    }

    /// Move the trade along the state machine.
    ///
    /// # Errors
    /// - `TradeNotPending` if the trade is already terminal
    /// - `InvalidTransition` for any other non-edge request
    pub fn transition(&mut self, from: TradeStatus, to: TradeStatus) -> Result<()> {
        if self.status.is_terminal() {
            return Err(FiatlockError::TradeNotPending {
                trade_id: self.id,
                status: self.status,
            });
        }
        if self.status != from || !from.can_transition_to(to) {
            return Err(FiatlockError::InvalidTransition { from, to });
        }
        self.status = to;
        Ok(())
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Trade[{}] {} tokens + {} fee for {} cents ({})",
            self.id, self.token_amount, self.fee_amount, self.fiat_amount, self.status,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_trade() -> Trade {
        let now = Utc::now();
        Trade {
            id: TradeId::from_bytes([1u8; 16]),
            order_id: OrderId::from_bytes([2u8; 16]),
            buyer: Address::new([3u8; 20]),
            token_amount: 500_000,
            fiat_amount: 36_500,
            fee_amount: 2_000,
            created_at: now,
            expires_at: now + chrono::Duration::minutes(15),
            status: TradeStatus::Pending,
            settlement_tx_id_hash: None,
        }
    }

    #[test]
    fn status_transitions_valid() {
        assert!(TradeStatus::Pending.can_transition_to(TradeStatus::Settled));
        assert!(TradeStatus::Pending.can_transition_to(TradeStatus::Expired));
    }

    #[test]
    fn status_transitions_invalid() {
        assert!(!TradeStatus::Settled.can_transition_to(TradeStatus::Expired));
        assert!(!TradeStatus::Expired.can_transition_to(TradeStatus::Settled));
        assert!(!TradeStatus::Pending.can_transition_to(TradeStatus::Pending));
        assert!(!TradeStatus::Settled.can_transition_to(TradeStatus::Pending));
    }

    #[test]
    fn reservation_includes_fee() {
        assert_eq!(make_trade().reservation().unwrap(), 502_000);
    }

    #[test]
    fn reservation_overflow_reported() {
        let trade = Trade {
            token_amount: u128::MAX,
            fee_amount: 1,
            ..make_trade()
        };
        assert!(matches!(
            trade.reservation(),
            Err(FiatlockError::AmountOverflow { .. })
        ));
    }

    #[test]
    fn double_settle_is_not_pending() {
        let mut trade = make_trade();
        trade
            .transition(TradeStatus::Pending, TradeStatus::Settled)
            .unwrap();
        let err = trade
            .transition(TradeStatus::Pending, TradeStatus::Settled)
            .unwrap_err();
        assert!(matches!(
            err,
            FiatlockError::TradeNotPending {
                status: TradeStatus::Settled,
                ..
            }
        ));
    }

    #[test]
    fn pending_to_pending_is_invalid() {
        let mut trade = make_trade();
        let err = trade
            .transition(TradeStatus::Pending, TradeStatus::Pending)
            .unwrap_err();
        assert!(matches!(err, FiatlockError::InvalidTransition { .. }));
        assert_eq!(trade.status, TradeStatus::Pending);
    }

    #[test]
    fn expiry_is_strictly_after_deadline() {
        let trade = make_trade();
        assert!(!trade.is_expired_at(trade.expires_at));
        assert!(trade.is_expired_at(trade.expires_at + chrono::Duration::seconds(1)));
    }

    #[test]
    fn trade_serde_roundtrip() {
        let trade = make_trade();
        let json = serde_json::to_string(&trade).unwrap();
        assert!(json.contains("\"PENDING\""));
        let back: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, back);
    }
}
