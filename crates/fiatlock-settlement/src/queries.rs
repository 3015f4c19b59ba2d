//! Read-only views for relays and dashboards.

use chrono::{DateTime, Utc};
use fiatlock_fees::{token_amount_for_fiat, validate_fiat_amount};
use fiatlock_ledger::{Custody, Ledger};
use fiatlock_types::{
    Address, EngineConfig, EngineEvent, FiatlockError, Order, OrderActivity, OrderId, Result,
    TokenInfo, Trade, TradeId, TradeStatus, TxIdHash,
};

use crate::{SettlementCoordinator, SupplyConservation};

/// What a fill would reserve, computed without touching the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillQuote {
    pub token_amount: u128,
    pub fee_amount: u128,
    pub reservation: u128,
}

impl SettlementCoordinator {
    // --- engine state ----------------------------------------------------

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    #[must_use]
    pub fn custody(&self) -> &Custody {
        &self.custody
    }

    #[must_use]
    pub fn supply(&self) -> &SupplyConservation {
        &self.supply
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[must_use]
    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    /// Take every event recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    // --- orders ----------------------------------------------------------

    #[must_use]
    pub fn get_order(&self, order_id: &OrderId) -> Option<&Order> {
        self.ledger.orders().get(order_id)
    }

    /// # Errors
    /// Returns `PrivateCodeNotFound` for an unknown code.
    pub fn get_order_by_private_code(&self, code: &str) -> Result<&Order> {
        self.ledger
            .orders()
            .by_private_code(code)
            .ok_or_else(|| FiatlockError::PrivateCodeNotFound(code.to_string()))
    }

    /// Listed orders with inventory left, newest first.
    #[must_use]
    pub fn active_orders(&self, limit: usize) -> Vec<&Order> {
        let mut orders: Vec<&Order> = self
            .ledger
            .orders()
            .iter()
            .filter(|o| o.is_public && !o.is_exhausted())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        orders.truncate(limit);
        orders
    }

    #[must_use]
    pub fn orders_by_seller(&self, seller: &Address) -> Vec<&Order> {
        self.ledger.orders().by_seller(seller)
    }

    /// What a fill of `fiat_amount` cents by `buyer` would reserve.
    ///
    /// # Errors
    /// `OrderNotFound`, `FractionalFiatAmount`, `TradeValueOutOfBounds`,
    /// or `AmountOverflow`.
    pub fn preview_fill(
        &self,
        order_id: &OrderId,
        buyer: &Address,
        fiat_amount: u64,
    ) -> Result<FillQuote> {
        let order = self.ledger.orders().require(order_id)?;
        validate_fiat_amount(
            fiat_amount,
            self.config.min_trade_value,
            self.config.max_trade_value,
        )?;
        self.quote(order, buyer, fiat_amount)
    }

    /// Fee a fill would reserve on top of the buyer's tokens.
    ///
    /// # Errors
    /// As [`SettlementCoordinator::preview_fill`].
    pub fn preview_fee(&self, order_id: &OrderId, buyer: &Address, fiat_amount: u64) -> Result<u128> {
        self.preview_fill(order_id, buyer, fiat_amount)
            .map(|q| q.fee_amount)
    }

    /// Price a fill against `order`. Bounds are the caller's concern.
    pub(crate) fn quote(&self, order: &Order, buyer: &Address, fiat_amount: u64) -> Result<FillQuote> {
        let token_amount =
            token_amount_for_fiat(fiat_amount, order.exchange_rate, order.token.decimals)?;
        let fee_amount =
            self.fees
                .calculate_fee(token_amount, fiat_amount, &order.token, buyer, order.is_public);
        let reservation =
            token_amount
                .checked_add(fee_amount)
                .ok_or_else(|| FiatlockError::AmountOverflow {
                    context: format!("reservation {token_amount} + fee {fee_amount}"),
                })?;
        Ok(FillQuote {
            token_amount,
            fee_amount,
            reservation,
        })
    }

    /// Would `fill_order(order_id, buyer, fiat_amount)` succeed right now?
    #[must_use]
    pub fn is_order_fillable(&self, order_id: &OrderId, buyer: &Address, fiat_amount: u64) -> bool {
        let Some(order) = self.get_order(order_id) else {
            return false;
        };
        !self.pause.is_paused()
            && self.verifiers.contains(order.rail)
            && self
                .preview_fill(order_id, buyer, fiat_amount)
                .is_ok_and(|q| q.reservation <= order.remaining_amount)
    }

    /// Fee the current policy charges, for any registered token. Tokens the
    /// engine does not know cost nothing.
    #[must_use]
    pub fn calculate_fee(
        &self,
        token_amount: u128,
        fiat_amount: u64,
        token: &Address,
        buyer: &Address,
        is_public: bool,
    ) -> u128 {
        let info: Option<&TokenInfo> = self.config.token(token);
        info.map_or(0, |info| {
            self.fees
                .calculate_fee(token_amount, fiat_amount, info, buyer, is_public)
        })
    }

    /// Timeline of fills and withdrawals for an order, newest first.
    ///
    /// # Errors
    /// Returns `OrderNotFound` for an unknown order.
    pub fn order_activities(&self, order_id: &OrderId) -> Result<Vec<OrderActivity>> {
        self.ledger.orders().require(order_id)?;
        let mut activities: Vec<OrderActivity> = self
            .ledger
            .trades()
            .by_order(order_id)
            .into_iter()
            .map(OrderActivity::from)
            .chain(
                self.ledger
                    .withdrawals()
                    .iter()
                    .filter(|w| w.order_id == *order_id)
                    .map(OrderActivity::from),
            )
            .collect();
        activities.sort_by_key(|a| std::cmp::Reverse(a.at()));
        Ok(activities)
    }

    // --- trades ----------------------------------------------------------

    #[must_use]
    pub fn get_trade(&self, trade_id: &TradeId) -> Option<&Trade> {
        self.ledger.trades().get(trade_id)
    }

    /// # Errors
    /// Returns `TradeNotFound` for an unknown trade.
    pub fn get_trade_status(&self, trade_id: &TradeId) -> Result<TradeStatus> {
        self.ledger.trades().require(trade_id).map(|t| t.status)
    }

    /// Fee reserved by the trade at fill time.
    ///
    /// # Errors
    /// Returns `TradeNotFound` for an unknown trade.
    pub fn get_trade_fee(&self, trade_id: &TradeId) -> Result<u128> {
        self.ledger.trades().require(trade_id).map(|t| t.fee_amount)
    }

    #[must_use]
    pub fn trades_by_buyer(&self, buyer: &Address) -> Vec<&Trade> {
        self.ledger.trades().by_buyer(buyer)
    }

    #[must_use]
    pub fn trades_by_order(&self, order_id: &OrderId) -> Vec<&Trade> {
        self.ledger.trades().by_order(order_id)
    }

    /// Pending trades that `expire` would accept right now.
    #[must_use]
    pub fn expired_pending_trades(&self) -> Vec<TradeId> {
        self.ledger.trades().expired_pending(self.clock.now())
    }

    /// Anti-replay hashes of every settled trade.
    #[must_use]
    pub fn settled_tx_id_hashes(&self) -> Vec<TxIdHash> {
        self.ledger
            .trades()
            .iter()
            .filter_map(|t| t.settlement_tx_id_hash)
            .collect()
    }

    // --- treasury & conservation -------------------------------------------

    #[must_use]
    pub fn accumulated_fees(&self, token: &Address) -> u128 {
        self.ledger.treasury().balance(token)
    }

    /// Tokens the ledger attributes to `token`: unreserved order inventory,
    /// pending reservations, and the fee balance.
    #[must_use]
    pub fn ledger_holdings(&self, token: &Address) -> u128 {
        let orders = self.ledger.orders();
        let remaining = orders
            .iter()
            .filter(|o| o.token.address == *token)
            .map(|o| o.remaining_amount)
            .fold(0u128, u128::saturating_add);
        // Saturating: an overflowed total can never match recorded flows.
        let reserved = self
            .ledger
            .trades()
            .iter()
            .filter(|t| t.is_pending())
            .filter(|t| orders.get(&t.order_id).is_some_and(|o| o.token.address == *token))
            .map(|t| t.reservation().unwrap_or(u128::MAX))
            .fold(0u128, u128::saturating_add);
        remaining
            .saturating_add(reserved)
            .saturating_add(self.ledger.treasury().balance(token))
    }

    /// Check the conservation invariant for `token`, and that the pool
    /// actually holds at least what the ledger says it does.
    ///
    /// # Errors
    /// Returns `SupplyInvariantViolation` on any mismatch.
    pub fn verify_conservation(&self, token: &Address) -> Result<()> {
        let held = self.ledger_holdings(token);
        self.supply.verify(token, held)?;
        let pool = self.custody.pool_balance(token);
        if pool < held {
            return Err(FiatlockError::SupplyInvariantViolation {
                reason: format!("pool holds {pool} of {token}, ledger expects {held}"),
            });
        }
        Ok(())
    }

    /// [`SettlementCoordinator::verify_conservation`] for every token that
    /// ever moved.
    ///
    /// # Errors
    /// The first violation found.
    pub fn verify_all_conservation(&self) -> Result<()> {
        self.supply
            .tracked_tokens()
            .iter()
            .try_for_each(|token| self.verify_conservation(token))
    }
}
