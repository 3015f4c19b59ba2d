//! Fee treasury.
//!
//! Per-token fees earned by settled trades. Credited only on settlement,
//! emptied only by an admin withdrawal, never negative.

use std::collections::BTreeMap;

use fiatlock_types::{Address, FiatlockError, Result};

#[derive(Debug, Default)]
pub struct FeeTreasury {
    balances: BTreeMap<Address, u128>,
}

impl FeeTreasury {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a settled trade's fee.
    ///
    /// # Errors
    /// Returns `AmountOverflow` if the balance would not fit a `u128`.
    pub fn credit(&mut self, token: Address, amount: u128) -> Result<()> {
        let balance = self.balances.entry(token).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| FiatlockError::AmountOverflow {
                context: format!("fee balance for {token}"),
            })?;
        Ok(())
    }

    /// Zero the balance for `token` and return what it held.
    ///
    /// # Errors
    /// Returns `NoFeesToWithdraw` if the balance is zero.
    pub fn take_all(&mut self, token: &Address) -> Result<u128> {
        match self.balances.get_mut(token) {
            Some(balance) if *balance > 0 => Ok(std::mem::take(balance)),
            _ => Err(FiatlockError::NoFeesToWithdraw(*token)),
        }
    }

    #[must_use]
    pub fn balance(&self, token: &Address) -> u128 {
        self.balances.get(token).copied().unwrap_or_default()
    }

    pub(crate) fn set(&mut self, token: Address, amount: u128) {
        if amount == 0 {
            self.balances.remove(&token);
        } else {
            self.balances.insert(token, amount);
        }
    }

    /// Tokens with a non-zero balance, in address order.
    #[must_use]
    pub fn funded_tokens(&self) -> Vec<Address> {
        self.balances
            .iter()
            .filter(|(_, b)| **b > 0)
            .map(|(t, _)| *t)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &u128)> {
        self.balances.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_accumulates() {
        let mut treasury = FeeTreasury::new();
        let usdc = Address::random();
        treasury.credit(usdc, 200_000).unwrap();
        treasury.credit(usdc, 400_000).unwrap();
        assert_eq!(treasury.balance(&usdc), 600_000);
    }

    #[test]
    fn take_all_zeroes_balance() {
        let mut treasury = FeeTreasury::new();
        let usdc = Address::random();
        treasury.credit(usdc, 2_000).unwrap();
        assert_eq!(treasury.take_all(&usdc).unwrap(), 2_000);
        assert_eq!(treasury.balance(&usdc), 0);
        assert!(matches!(
            treasury.take_all(&usdc),
            Err(FiatlockError::NoFeesToWithdraw(_))
        ));
    }

    #[test]
    fn funded_tokens_skips_empty() {
        let mut treasury = FeeTreasury::new();
        let a = Address::new([1; 20]);
        let b = Address::new([2; 20]);
        treasury.credit(a, 0).unwrap();
        treasury.credit(b, 5).unwrap();
        assert_eq!(treasury.funded_tokens(), vec![b]);
    }

    #[test]
    fn credit_overflow_rejected() {
        let mut treasury = FeeTreasury::new();
        let t = Address::random();
        treasury.credit(t, u128::MAX).unwrap();
        assert!(matches!(
            treasury.credit(t, 1),
            Err(FiatlockError::AmountOverflow { .. })
        ));
        assert_eq!(treasury.balance(&t), u128::MAX);
    }
}
