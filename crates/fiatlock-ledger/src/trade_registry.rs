//! Trade registry.
//!
//! Owns every [`Trade`]. Status changes go through [`TradeRegistry::transition`],
//! which enforces the trade state machine; a terminal trade refuses every
//! further transition with `TradeNotPending`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use fiatlock_types::{Address, FiatlockError, OrderId, Result, Trade, TradeId, TradeStatus};

#[derive(Debug, Default)]
pub struct TradeRegistry {
    trades: HashMap<TradeId, Trade>,
    by_order: HashMap<OrderId, Vec<TradeId>>,
}

impl TradeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending trade.
    ///
    /// # Errors
    /// Returns `DuplicateTrade` if the ID is already taken.
    pub fn insert(&mut self, trade: Trade) -> Result<()> {
        if self.trades.contains_key(&trade.id) {
            return Err(FiatlockError::DuplicateTrade(trade.id));
        }
        self.put(trade);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &TradeId) -> Option<&Trade> {
        self.trades.get(id)
    }

    /// # Errors
    /// Returns `TradeNotFound` if the trade does not exist.
    pub fn require(&self, id: &TradeId) -> Result<&Trade> {
        self.trades.get(id).ok_or(FiatlockError::TradeNotFound(*id))
    }

    /// Move a trade from `from` to `to`.
    ///
    /// # Errors
    /// - `TradeNotFound` if the trade does not exist
    /// - `TradeNotPending` if the trade is already terminal
    /// - `InvalidTransition` for any other illegal edge
    pub fn transition(&mut self, id: &TradeId, from: TradeStatus, to: TradeStatus) -> Result<()> {
        self.trades
            .get_mut(id)
            .ok_or(FiatlockError::TradeNotFound(*id))?
            .transition(from, to)
    }

    pub(crate) fn put(&mut self, trade: Trade) {
        let ids = self.by_order.entry(trade.order_id).or_default();
        if !ids.contains(&trade.id) {
            ids.push(trade.id);
        }
        self.trades.insert(trade.id, trade);
    }

    pub(crate) fn remove(&mut self, id: &TradeId) -> Option<Trade> {
        let trade = self.trades.remove(id)?;
        if let Some(ids) = self.by_order.get_mut(&trade.order_id) {
            ids.retain(|t| t != id);
        }
        Some(trade)
    }

    /// Trades against an order, in creation order.
    #[must_use]
    pub fn by_order(&self, order_id: &OrderId) -> Vec<&Trade> {
        self.by_order
            .get(order_id)
            .map(|ids| ids.iter().filter_map(|id| self.trades.get(id)).collect())
            .unwrap_or_default()
    }

    /// A buyer's trades, newest first.
    #[must_use]
    pub fn by_buyer(&self, buyer: &Address) -> Vec<&Trade> {
        let mut trades: Vec<&Trade> = self
            .trades
            .values()
            .filter(|t| t.buyer == *buyer)
            .collect();
        trades.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        trades
    }

    /// Pending trades whose payment window closed before `now`, oldest
    /// deadline first.
    #[must_use]
    pub fn expired_pending(&self, now: DateTime<Utc>) -> Vec<TradeId> {
        let mut due: Vec<&Trade> = self
            .trades
            .values()
            .filter(|t| t.is_pending() && t.is_expired_at(now))
            .collect();
        due.sort_by(|a, b| a.expires_at.cmp(&b.expires_at).then(a.id.cmp(&b.id)));
        due.into_iter().map(|t| t.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trade> {
        self.trades.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}
