//! The ledger and its undo journal.
//!
//! Every state-mutating engine operation runs inside [`Ledger::atomically`].
//! Each [`Txn`] mutation records the prior value of the row it touched; if
//! the closure returns `Err`, the journal is replayed backwards and the
//! ledger is exactly as it was before the call. Side effects that live
//! outside the ledger (custody transfers) run last inside the closure, so a
//! failed transfer rolls back every row the operation wrote.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fiatlock_types::{
    Address, FiatlockError, Order, OrderId, Result, Trade, TradeId, TradeStatus, WithdrawalRecord,
};
use serde::{Deserialize, Serialize};

use crate::{FeeTreasury, OrderRegistry, SequenceCounter, TradeRegistry};

/// Prior state of one touched row.
#[derive(Debug)]
enum Undo {
    Order(OrderId, Option<Order>),
    Trade(TradeId, Option<Trade>),
    Fees(Address, u128),
    Sequence(SequenceCounter),
    Withdrawals(usize),
}

/// Orders, trades, fee balances, the sequence counter, and the withdrawal
/// log behind one transactional boundary.
#[derive(Debug, Default)]
pub struct Ledger {
    orders: OrderRegistry,
    trades: TradeRegistry,
    treasury: FeeTreasury,
    sequence: SequenceCounter,
    withdrawals: Vec<WithdrawalRecord>,
}

impl Ledger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn orders(&self) -> &OrderRegistry {
        &self.orders
    }

    #[must_use]
    pub fn trades(&self) -> &TradeRegistry {
        &self.trades
    }

    #[must_use]
    pub fn treasury(&self) -> &FeeTreasury {
        &self.treasury
    }

    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence.peek()
    }

    #[must_use]
    pub fn withdrawals(&self) -> &[WithdrawalRecord] {
        &self.withdrawals
    }

    /// Run `f` as one all-or-nothing transaction.
    ///
    /// # Errors
    /// Propagates the closure's error after rolling back every mutation it
    /// made.
    pub fn atomically<T>(&mut self, f: impl FnOnce(&mut Txn<'_>) -> Result<T>) -> Result<T> {
        let mut tx = Txn {
            ledger: self,
            undo: Vec::new(),
        };
        match f(&mut tx) {
            Ok(value) => Ok(value),
            Err(err) => {
                tx.rollback();
                Err(err)
            }
        }
    }

    /// Serializable copy of every row.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut orders: Vec<Order> = self.orders.iter().cloned().collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        let mut trades: Vec<Trade> = self.trades.iter().cloned().collect();
        trades.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        LedgerSnapshot {
            orders,
            trades,
            fees: self.treasury.iter().map(|(t, b)| (*t, *b)).collect(),
            withdrawals: self.withdrawals.clone(),
            sequence: self.sequence,
        }
    }

    /// Rebuild a ledger from a snapshot, checking row consistency.
    ///
    /// # Errors
    /// - `DuplicateOrder` / `DuplicateTrade` for repeated IDs
    /// - `SupplyInvariantViolation` if an order's remaining exceeds its
    ///   total or a trade references a missing order
    /// - `AmountOverflow` if a trade's reservation does not fit a `u128`
    pub fn restore(snapshot: LedgerSnapshot) -> Result<Self> {
        let mut ledger = Self {
            sequence: snapshot.sequence,
            withdrawals: snapshot.withdrawals,
            ..Self::default()
        };
        for order in snapshot.orders {
            if order.remaining_amount > order.total_amount {
                return Err(FiatlockError::SupplyInvariantViolation {
                    reason: format!("order {} remaining exceeds total", order.id),
                });
            }
            ledger.orders.insert(order)?;
        }
        for trade in snapshot.trades {
            if ledger.orders.get(&trade.order_id).is_none() {
                return Err(FiatlockError::SupplyInvariantViolation {
                    reason: format!("trade {} references unknown order", trade.id),
                });
            }
            trade.reservation()?;
            ledger.trades.insert(trade)?;
        }
        for (token, balance) in snapshot.fees {
            ledger.treasury.set(token, balance);
        }
        Ok(ledger)
    }
}

/// Persisted form of a [`Ledger`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub orders: Vec<Order>,
    pub trades: Vec<Trade>,
    pub fees: BTreeMap<Address, u128>,
    pub withdrawals: Vec<WithdrawalRecord>,
    pub sequence: SequenceCounter,
}

/// An open ledger transaction. Obtained only through [`Ledger::atomically`].
pub struct Txn<'a> {
    ledger: &'a mut Ledger,
    undo: Vec<Undo>,
}

impl Txn<'_> {
    // --- reads -----------------------------------------------------------

    /// # Errors
    /// Returns `OrderNotFound` if the order does not exist.
    pub fn order(&self, id: &OrderId) -> Result<&Order> {
        self.ledger.orders.require(id)
    }

    /// # Errors
    /// Returns `TradeNotFound` if the trade does not exist.
    pub fn trade(&self, id: &TradeId) -> Result<&Trade> {
        self.ledger.trades.require(id)
    }

    #[must_use]
    pub fn fee_balance(&self, token: &Address) -> u128 {
        self.ledger.treasury.balance(token)
    }

    /// The ledger as it stands with this transaction's writes applied.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.ledger.snapshot()
    }

    // --- writes ----------------------------------------------------------

    pub fn next_sequence(&mut self) -> u64 {
        self.undo.push(Undo::Sequence(self.ledger.sequence));
        self.ledger.sequence.advance()
    }

    /// # Errors
    /// Returns `DuplicateOrder` if the ID is taken.
    pub fn insert_order(&mut self, order: Order) -> Result<()> {
        let id = order.id;
        self.ledger.orders.insert(order)?;
        self.undo.push(Undo::Order(id, None));
        Ok(())
    }

    /// Debit a fill's reservation. See [`OrderRegistry::reserve`].
    ///
    /// # Errors
    /// `OrderNotFound` or `InsufficientLiquidity`.
    pub fn reserve(&mut self, id: &OrderId, amount: u128) -> Result<()> {
        let prior = self.ledger.orders.require(id)?.clone();
        self.ledger.orders.reserve(id, amount)?;
        self.undo.push(Undo::Order(*id, Some(prior)));
        Ok(())
    }

    /// Credit an expired reservation back. See [`OrderRegistry::release`].
    ///
    /// # Errors
    /// `OrderNotFound` or `SupplyInvariantViolation`.
    pub fn release(&mut self, id: &OrderId, amount: u128) -> Result<()> {
        let prior = self.ledger.orders.require(id)?.clone();
        self.ledger.orders.release(id, amount)?;
        self.undo.push(Undo::Order(*id, Some(prior)));
        Ok(())
    }

    /// Debit a seller withdrawal and log it; returns the new remaining.
    ///
    /// # Errors
    /// `OrderNotFound` or `InsufficientRemaining`.
    pub fn withdraw(&mut self, id: &OrderId, amount: u128, at: DateTime<Utc>) -> Result<u128> {
        let prior = self.ledger.orders.require(id)?.clone();
        let remaining = self.ledger.orders.debit(id, amount)?;
        self.undo.push(Undo::Order(*id, Some(prior)));
        self.undo
            .push(Undo::Withdrawals(self.ledger.withdrawals.len()));
        self.ledger.withdrawals.push(WithdrawalRecord {
            order_id: *id,
            amount,
            remaining_after: remaining,
            withdrawn_at: at,
        });
        Ok(remaining)
    }

    /// Apply `f` to a copy of the order and store the result.
    ///
    /// # Errors
    /// `OrderNotFound`, or whatever `f` returns (the row is left unchanged).
    pub fn update_order(
        &mut self,
        id: &OrderId,
        f: impl FnOnce(&mut Order) -> Result<()>,
    ) -> Result<()> {
        let prior = self.ledger.orders.require(id)?.clone();
        let mut updated = prior.clone();
        f(&mut updated)?;
        self.ledger.orders.put(updated);
        self.undo.push(Undo::Order(*id, Some(prior)));
        Ok(())
    }

    /// # Errors
    /// Returns `DuplicateTrade` if the ID is taken.
    pub fn insert_trade(&mut self, trade: Trade) -> Result<()> {
        let id = trade.id;
        self.ledger.trades.insert(trade)?;
        self.undo.push(Undo::Trade(id, None));
        Ok(())
    }

    /// # Errors
    /// `TradeNotFound`, `TradeNotPending`, or `InvalidTransition`.
    pub fn transition(&mut self, id: &TradeId, from: TradeStatus, to: TradeStatus) -> Result<()> {
        let prior = self.ledger.trades.require(id)?.clone();
        self.ledger.trades.transition(id, from, to)?;
        self.undo.push(Undo::Trade(*id, Some(prior)));
        Ok(())
    }

    /// Apply `f` to a copy of the trade and store the result.
    ///
    /// # Errors
    /// `TradeNotFound`, or whatever `f` returns (the row is left unchanged).
    pub fn update_trade(
        &mut self,
        id: &TradeId,
        f: impl FnOnce(&mut Trade) -> Result<()>,
    ) -> Result<()> {
        let prior = self.ledger.trades.require(id)?.clone();
        let mut updated = prior.clone();
        f(&mut updated)?;
        self.ledger.trades.put(updated);
        self.undo.push(Undo::Trade(*id, Some(prior)));
        Ok(())
    }

    /// # Errors
    /// Returns `AmountOverflow` if the balance would overflow.
    pub fn credit_fees(&mut self, token: Address, amount: u128) -> Result<()> {
        let prior = self.ledger.treasury.balance(&token);
        self.ledger.treasury.credit(token, amount)?;
        self.undo.push(Undo::Fees(token, prior));
        Ok(())
    }

    /// Empty the fee balance for `token`.
    ///
    /// # Errors
    /// Returns `NoFeesToWithdraw` if the balance is zero.
    pub fn take_fees(&mut self, token: &Address) -> Result<u128> {
        let amount = self.ledger.treasury.take_all(token)?;
        self.undo.push(Undo::Fees(*token, amount));
        Ok(amount)
    }

    fn rollback(&mut self) {
        let steps = self.undo.len();
        while let Some(entry) = self.undo.pop() {
            match entry {
                Undo::Order(_, Some(order)) => self.ledger.orders.put(order),
                Undo::Order(id, None) => {
                    self.ledger.orders.remove(&id);
                }
                Undo::Trade(_, Some(trade)) => self.ledger.trades.put(trade),
                Undo::Trade(id, None) => {
                    self.ledger.trades.remove(&id);
                }
                Undo::Fees(token, balance) => self.ledger.treasury.set(token, balance),
                Undo::Sequence(seq) => self.ledger.sequence = seq,
                Undo::Withdrawals(len) => self.ledger.withdrawals.truncate(len),
            }
        }
        tracing::debug!(steps, "ledger transaction rolled back");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_with(order: &Order) -> Ledger {
        let mut ledger = Ledger::new();
        ledger
            .atomically(|tx| tx.insert_order(order.clone()))
            .unwrap();
        ledger
    }

    fn trade_for(order: &Order, seed: u8) -> Trade {
        let now = Utc::now();
        Trade {
            id: TradeId::from_bytes([seed; 16]),
            order_id: order.id,
            buyer: Address::random(),
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
    fn commit_keeps_all_writes() {
        let order = Order::dummy(1_000_000);
        let mut ledger = ledger_with(&order);
        let trade = trade_for(&order, 1);
        ledger
            .atomically(|tx| {
                tx.next_sequence();
                tx.reserve(&order.id, trade.reservation()?)?;
                tx.insert_trade(trade.clone())
            })
            .unwrap();
        assert_eq!(
            ledger.orders().require(&order.id).unwrap().remaining_amount,
            498_000
        );
        assert!(ledger.trades().get(&trade.id).is_some());
        assert_eq!(ledger.sequence(), 1);
    }

    #[test]
    fn failure_rolls_back_every_row() {
        let order = Order::dummy(1_000_000);
        let mut ledger = ledger_with(&order);
        let trade = trade_for(&order, 1);
        let err = ledger
            .atomically(|tx| {
                tx.next_sequence();
                tx.reserve(&order.id, trade.reservation()?)?;
                tx.insert_trade(trade.clone())?;
                tx.transition(&trade.id, TradeStatus::Pending, TradeStatus::Settled)?;
                tx.credit_fees(order.token.address, trade.fee_amount)?;
                Err::<(), _>(FiatlockError::ProofVerificationFailed(trade.id))
            })
            .unwrap_err();
        assert!(matches!(err, FiatlockError::ProofVerificationFailed(_)));
        assert_eq!(
            ledger.orders().require(&order.id).unwrap().remaining_amount,
            1_000_000
        );
        assert!(ledger.trades().get(&trade.id).is_none());
        assert_eq!(ledger.treasury().balance(&order.token.address), 0);
        assert_eq!(ledger.sequence(), 0);
    }

    #[test]
    fn withdraw_rollback_truncates_log() {
        let order = Order::dummy(1_000);
        let mut ledger = ledger_with(&order);
        let _ = ledger.atomically(|tx| {
            tx.withdraw(&order.id, 100, Utc::now())?;
            Err::<(), _>(FiatlockError::TransferFailed {
                reason: "reverted".into(),
            })
        });
        assert!(ledger.withdrawals().is_empty());
        assert_eq!(
            ledger.orders().require(&order.id).unwrap().remaining_amount,
            1_000
        );
    }

    #[test]
    fn take_fees_rollback_restores_balance() {
        let order = Order::dummy(1_000);
        let mut ledger = ledger_with(&order);
        let token = order.token.address;
        ledger.atomically(|tx| tx.credit_fees(token, 700)).unwrap();
        let _ = ledger.atomically(|tx| {
            tx.take_fees(&token)?;
            Err::<(), _>(FiatlockError::TransferFailed {
                reason: "returned false".into(),
            })
        });
        assert_eq!(ledger.treasury().balance(&token), 700);
    }

    #[test]
    fn update_order_error_leaves_row() {
        let order = Order::dummy(1_000);
        let mut ledger = ledger_with(&order);
        let err = ledger
            .atomically(|tx| {
                tx.update_order(&order.id, |o| {
                    o.exchange_rate = 0;
                    Err(FiatlockError::InvalidOrder {
                        reason: "zero rate".into(),
                    })
                })
            })
            .unwrap_err();
        assert!(matches!(err, FiatlockError::InvalidOrder { .. }));
        assert_eq!(
            ledger.orders().require(&order.id).unwrap().exchange_rate,
            730
        );
    }

    #[test]
    fn snapshot_restore_roundtrip() {
        let order = Order::dummy(1_000_000);
        let mut ledger = ledger_with(&order);
        let trade = trade_for(&order, 7);
        ledger
            .atomically(|tx| {
                tx.next_sequence();
                tx.reserve(&order.id, trade.reservation()?)?;
                tx.insert_trade(trade.clone())?;
                tx.credit_fees(order.token.address, 42)
            })
            .unwrap();

        let json = serde_json::to_string(&ledger.snapshot()).unwrap();
        let snapshot: LedgerSnapshot = serde_json::from_str(&json).unwrap();
        let restored = Ledger::restore(snapshot).unwrap();
        assert_eq!(restored.snapshot(), ledger.snapshot());
        assert_eq!(restored.sequence(), 1);
        assert_eq!(restored.treasury().balance(&order.token.address), 42);
    }

    #[test]
    fn restore_rejects_overflowing_reservation() {
        let order = Order::dummy(10);
        let trade = Trade {
            token_amount: u128::MAX,
            fee_amount: 2,
            ..trade_for(&order, 3)
        };
        let snapshot = LedgerSnapshot {
            orders: vec![order],
            trades: vec![trade],
            ..LedgerSnapshot::default()
        };
        assert!(matches!(
            Ledger::restore(snapshot),
            Err(FiatlockError::AmountOverflow { .. })
        ));
    }

    #[test]
    fn txn_snapshot_sees_uncommitted_writes() {
        let order = Order::dummy(1_000);
        let mut ledger = ledger_with(&order);
        let mut inside = None;
        let _ = ledger.atomically(|tx| {
            tx.reserve(&order.id, 400)?;
            inside = Some(tx.snapshot());
            Err::<(), _>(FiatlockError::TransferFailed {
                reason: "reverted".into(),
            })
        });
        let inside = inside.unwrap();
        assert_eq!(inside.orders[0].remaining_amount, 600);
        assert_eq!(ledger.snapshot().orders[0].remaining_amount, 1_000);
    }

    #[test]
    fn restore_rejects_orphan_trade() {
        let order = Order::dummy(10);
        let snapshot = LedgerSnapshot {
            trades: vec![trade_for(&order, 1)],
            ..LedgerSnapshot::default()
        };
        assert!(matches!(
            Ledger::restore(snapshot),
            Err(FiatlockError::SupplyInvariantViolation { .. })
        ));
    }
}
