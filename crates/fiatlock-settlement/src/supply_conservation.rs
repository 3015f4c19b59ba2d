//! Supply conservation invariant checker.
//!
//! Per token, at every point in time:
//! ```text
//! Σ order.remaining + Σ pending reservations + treasury balance
//!     == deposits − seller withdrawals − buyer payouts − fee withdrawals
//! ```
//!
//! The left side is read from the ledger; the right side is accumulated
//! here from committed custody flows. A mismatch means value was created
//! or destroyed inside the engine.

use std::collections::BTreeMap;

use fiatlock_types::{Address, FiatlockError, Result};
use serde::{Deserialize, Serialize};

/// Cumulative custody flows for one token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenFlows {
    pub deposited: u128,
    pub seller_withdrawn: u128,
    pub paid_to_buyers: u128,
    pub fees_withdrawn: u128,
}

impl TokenFlows {
    /// What the engine should still hold, or `None` if more left than came in.
    #[must_use]
    pub fn expected_held(&self) -> Option<u128> {
        self.deposited
            .checked_sub(self.seller_withdrawn)?
            .checked_sub(self.paid_to_buyers)?
            .checked_sub(self.fees_withdrawn)
    }
}

/// Tracks per-token flows since genesis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyConservation {
    flows: BTreeMap<Address, TokenFlows>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_deposit(&mut self, token: Address, amount: u128) {
        let f = self.flows.entry(token).or_default();
        f.deposited = f.deposited.saturating_add(amount);
    }

    pub fn record_seller_withdrawal(&mut self, token: Address, amount: u128) {
        let f = self.flows.entry(token).or_default();
        f.seller_withdrawn = f.seller_withdrawn.saturating_add(amount);
    }

    pub fn record_payout(&mut self, token: Address, amount: u128) {
        let f = self.flows.entry(token).or_default();
        f.paid_to_buyers = f.paid_to_buyers.saturating_add(amount);
    }

    pub fn record_fee_withdrawal(&mut self, token: Address, amount: u128) {
        let f = self.flows.entry(token).or_default();
        f.fees_withdrawn = f.fees_withdrawn.saturating_add(amount);
    }

    #[must_use]
    pub fn flows(&self, token: &Address) -> TokenFlows {
        self.flows.get(token).copied().unwrap_or_default()
    }

    /// Check the ledger's holdings for `token` against recorded flows.
    ///
    /// # Errors
    /// Returns [`FiatlockError::SupplyInvariantViolation`] on any mismatch.
    pub fn verify(&self, token: &Address, actual_held: u128) -> Result<()> {
        let flows = self.flows(token);
        match flows.expected_held() {
            Some(expected) if expected == actual_held => Ok(()),
            expected => Err(FiatlockError::SupplyInvariantViolation {
                reason: format!(
                    "token {token}: ledger holds {actual_held}, expected {expected:?} \
                     (deposited={}, seller_withdrawn={}, paid_to_buyers={}, fees_withdrawn={})",
                    flows.deposited,
                    flows.seller_withdrawn,
                    flows.paid_to_buyers,
                    flows.fees_withdrawn,
                ),
            }),
        }
    }

    #[must_use]
    pub fn tracked_tokens(&self) -> Vec<Address> {
        self.flows.keys().copied().collect()
    }
}
