//! Pooled token custody.
//!
//! The engine holds every locked token in a single pool address. Transfers
//! go through a [`TokenBackend`], which reports the token's raw answer:
//! `Ok(Some(true))` for success, `Ok(Some(false))` for a refused transfer,
//! `Ok(None)` for tokens that return nothing on success, and `Err` for a
//! revert. Only the first and third count as success.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, PoisonError},
};

use fiatlock_types::{Address, FiatlockError, Result};

/// Raw ERC20-style transfer primitive.
pub trait TokenBackend: Send {
    /// Move `amount` of `token` from `from` to `to` on the caller's
    /// allowance.
    fn transfer_from(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> std::result::Result<Option<bool>, String>;

    /// Move `amount` of `token` out of `from` (the pool) to `to`.
    fn transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> std::result::Result<Option<bool>, String>;

    fn balance_of(&self, token: &Address, holder: &Address) -> u128;
}

/// Interpret a backend's raw answer.
fn settle_call(
    outcome: std::result::Result<Option<bool>, String>,
    what: &str,
    token: &Address,
) -> Result<()> {
    match outcome {
        Ok(Some(true) | None) => Ok(()),
        Ok(Some(false)) => Err(FiatlockError::TransferFailed {
            reason: format!("{what} of {token} returned false"),
        }),
        Err(revert) => Err(FiatlockError::TransferFailed {
            reason: format!("{what} of {token} reverted: {revert}"),
        }),
    }
}

/// The engine's pooled custody account.
pub struct Custody {
    pool: Address,
    backend: Box<dyn TokenBackend>,
}

impl Custody {
    #[must_use]
    pub fn new(pool: Address, backend: Box<dyn TokenBackend>) -> Self {
        Self { pool, backend }
    }

    #[must_use]
    pub fn pool(&self) -> Address {
        self.pool
    }

    /// Pull `amount` of `token` from `from` into the pool.
    ///
    /// # Errors
    /// Returns `TransferFailed` if the token refuses or reverts, or if the
    /// pool received less than `amount`.
    pub fn transfer_in(&mut self, from: &Address, token: &Address, amount: u128) -> Result<()> {
        let before = self.backend.balance_of(token, &self.pool);
        let outcome = self.backend.transfer_from(token, from, &self.pool, amount);
        if let Err(err) = settle_call(outcome, "transfer_in", token) {
            tracing::warn!(%token, %from, amount, error = %err, "custody deposit failed");
            return Err(err);
        }
        let received = self
            .backend
            .balance_of(token, &self.pool)
            .saturating_sub(before);
        if received < amount {
            tracing::warn!(%token, amount, received, "custody deposit under-delivered");
            if received > 0 {
                let refund = self.backend.transfer(token, &self.pool, from, received);
                if let Err(err) = settle_call(refund, "refund", token) {
                    tracing::error!(%token, %from, received, error = %err, "short deposit refund failed");
                }
            }
            return Err(FiatlockError::TransferFailed {
                reason: format!("pool received {received} of {amount} {token}"),
            });
        }
        Ok(())
    }

    /// Send `amount` of `token` from the pool to `to`.
    ///
    /// # Errors
    /// Returns `TransferFailed` if the token refuses or reverts.
    pub fn transfer_out(&mut self, to: &Address, token: &Address, amount: u128) -> Result<()> {
        let outcome = self.backend.transfer(token, &self.pool, to, amount);
        settle_call(outcome, "transfer_out", token).inspect_err(|err| {
            tracing::warn!(%token, %to, amount, error = %err, "custody payout failed");
        })
    }

    /// The pool's on-token balance.
    #[must_use]
    pub fn pool_balance(&self, token: &Address) -> u128 {
        self.backend.balance_of(token, &self.pool)
    }

    #[must_use]
    pub fn balance_of(&self, token: &Address, holder: &Address) -> u128 {
        self.backend.balance_of(token, holder)
    }
}

impl std::fmt::Debug for Custody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Custody").field("pool", &self.pool).finish()
    }
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// How an in-memory token answers transfer calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TokenBehavior {
    /// Returns `true` on success, reverts on failure.
    #[default]
    Standard,
    /// Returns nothing on success, reverts on failure (USDT-style).
    NoReturnValue,
    /// Returns `false` on failure instead of reverting.
    ReturnsFalse,
    /// Burns `bps` basis points of every transfer.
    FeeOnTransfer { bps: u16 },
}

#[derive(Debug, Default)]
struct TokenState {
    balances: HashMap<(Address, Address), u128>,
    behavior: HashMap<Address, TokenBehavior>,
    blocked: HashSet<(Address, Address)>,
}

impl TokenState {
    fn behavior(&self, token: &Address) -> TokenBehavior {
        self.behavior.get(token).copied().unwrap_or_default()
    }

    fn balance(&self, token: &Address, holder: &Address) -> u128 {
        self.balances
            .get(&(*token, *holder))
            .copied()
            .unwrap_or_default()
    }

    fn transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> std::result::Result<Option<bool>, String> {
        let behavior = self.behavior(token);
        let refuse = |reason: &str| match behavior {
            TokenBehavior::ReturnsFalse => Ok(Some(false)),
            _ => Err(reason.to_string()),
        };
        if self.blocked.contains(&(*token, *to)) || self.blocked.contains(&(*token, *from)) {
            return refuse("blocked account");
        }
        let available = self.balance(token, from);
        if available < amount {
            return refuse("insufficient balance");
        }
        let delivered = match behavior {
            TokenBehavior::FeeOnTransfer { bps } => {
                amount - amount.saturating_mul(u128::from(bps)) / 10_000
            }
            _ => amount,
        };
        self.balances.insert((*token, *from), available - amount);
        *self.balances.entry((*token, *to)).or_default() += delivered;
        match behavior {
            TokenBehavior::NoReturnValue => Ok(None),
            _ => Ok(Some(true)),
        }
    }
}

/// Shared in-memory token ledger.
///
/// Clones share state, so a handle kept outside the engine observes and
/// mutates the same balances the engine's [`Custody`] sees.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenBackend {
    state: Arc<Mutex<TokenState>>,
}

impl InMemoryTokenBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut TokenState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Credit `amount` of `token` to `holder` out of thin air.
    pub fn mint(&self, token: Address, holder: Address, amount: u128) {
        self.with_state(|s| *s.balances.entry((token, holder)).or_default() += amount);
    }

    pub fn set_behavior(&self, token: Address, behavior: TokenBehavior) {
        self.with_state(|s| {
            s.behavior.insert(token, behavior);
        });
    }

    /// Make every transfer touching `holder` fail for `token`.
    pub fn block(&self, token: Address, holder: Address) {
        self.with_state(|s| {
            s.blocked.insert((token, holder));
        });
    }

    pub fn unblock(&self, token: Address, holder: Address) {
        self.with_state(|s| {
            s.blocked.remove(&(token, holder));
        });
    }

    #[must_use]
    pub fn balance(&self, token: &Address, holder: &Address) -> u128 {
        self.with_state(|s| s.balance(token, holder))
    }
}

impl TokenBackend for InMemoryTokenBackend {
    fn transfer_from(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> std::result::Result<Option<bool>, String> {
        self.with_state(|s| s.transfer(token, from, to, amount))
    }

    fn transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> std::result::Result<Option<bool>, String> {
        self.with_state(|s| s.transfer(token, from, to, amount))
    }

    fn balance_of(&self, token: &Address, holder: &Address) -> u128 {
        self.balance(token, holder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (InMemoryTokenBackend, Custody, Address, Address) {
        let tokens = InMemoryTokenBackend::new();
        let pool = Address::random();
        let token = Address::random();
        let seller = Address::random();
        tokens.mint(token, seller, 1_000_000);
        let custody = Custody::new(pool, Box::new(tokens.clone()));
        (tokens, custody, token, seller)
    }

    #[test]
    fn deposit_and_payout() {
        let (tokens, mut custody, token, seller) = setup();
        custody.transfer_in(&seller, &token, 600_000).unwrap();
        assert_eq!(custody.pool_balance(&token), 600_000);
        let buyer = Address::random();
        custody.transfer_out(&buyer, &token, 250_000).unwrap();
        assert_eq!(tokens.balance(&token, &buyer), 250_000);
        assert_eq!(custody.pool_balance(&token), 350_000);
    }

    #[test]
    fn insufficient_balance_reverts() {
        let (_, mut custody, token, seller) = setup();
        let err = custody.transfer_in(&seller, &token, 2_000_000).unwrap_err();
        assert!(matches!(err, FiatlockError::TransferFailed { .. }));
        assert_eq!(custody.pool_balance(&token), 0);
    }

    #[test]
    fn false_return_is_failure() {
        let (tokens, mut custody, token, seller) = setup();
        tokens.set_behavior(token, TokenBehavior::ReturnsFalse);
        let err = custody.transfer_in(&seller, &token, 2_000_000).unwrap_err();
        assert!(err.to_string().contains("returned false"));
    }

    #[test]
    fn missing_return_value_is_success() {
        let (tokens, mut custody, token, seller) = setup();
        tokens.set_behavior(token, TokenBehavior::NoReturnValue);
        custody.transfer_in(&seller, &token, 1_000).unwrap();
        assert_eq!(custody.pool_balance(&token), 1_000);
    }

    #[test]
    fn fee_on_transfer_deposit_rejected() {
        let (tokens, mut custody, token, seller) = setup();
        tokens.set_behavior(token, TokenBehavior::FeeOnTransfer { bps: 100 });
        let err = custody.transfer_in(&seller, &token, 10_000).unwrap_err();
        assert!(err.to_string().contains("received 9900 of 10000"));
    }

    #[test]
    fn blocked_recipient_fails_payout() {
        let (tokens, mut custody, token, seller) = setup();
        custody.transfer_in(&seller, &token, 1_000).unwrap();
        let buyer = Address::random();
        tokens.block(token, buyer);
        assert!(custody.transfer_out(&buyer, &token, 10).is_err());
        tokens.unblock(token, buyer);
        custody.transfer_out(&buyer, &token, 10).unwrap();
    }
}
