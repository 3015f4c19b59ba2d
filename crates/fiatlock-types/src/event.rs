//! Engine events and the per-order activity timeline.
//!
//! Every committed mutation appends one [`EngineEvent`]. Events carry the
//! amounts involved (including the fee on fills) so external observers can
//! reconcile without recomputing anything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    AccountLinesHash, Address, OrderId, PaymentRail, Trade, TradeId, TradeStatus, TxIdHash,
    WithdrawalRecord,
};

/// A committed state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    OrderCreated {
        order_id: OrderId,
        seller: Address,
        token: Address,
        amount: u128,
        exchange_rate: u64,
        rail: PaymentRail,
        is_public: bool,
    },
    OrderWithdrawn {
        order_id: OrderId,
        amount: u128,
        remaining: u128,
    },
    ExchangeRateUpdated {
        order_id: OrderId,
        exchange_rate: u64,
    },
    AccountLinesHashUpdated {
        order_id: OrderId,
        account_lines_hash: AccountLinesHash,
    },
    VisibilityChanged {
        order_id: OrderId,
        is_public: bool,
    },
    TradeCreated {
        trade_id: TradeId,
        order_id: OrderId,
        buyer: Address,
        token_amount: u128,
        fiat_amount: u64,
        fee_amount: u128,
        expires_at: DateTime<Utc>,
    },
    TradeSettled {
        trade_id: TradeId,
        order_id: OrderId,
        buyer: Address,
        token_amount: u128,
        fee_amount: u128,
        tx_id_hash: TxIdHash,
    },
    TradeExpired {
        trade_id: TradeId,
        order_id: OrderId,
        returned: u128,
    },
    FeesWithdrawn {
        token: Address,
        recipient: Address,
        amount: u128,
    },
    PauseChanged {
        paused: bool,
    },
    TradeBoundsUpdated {
        min: u64,
        max: u64,
    },
    PaymentWindowUpdated {
        secs: u64,
    },
    VerifierRegistered {
        rail: PaymentRail,
    },
    VerifierRemoved {
        rail: PaymentRail,
    },
    TokenRegistered {
        token: Address,
        decimals: u8,
    },
    FeePolicyUpdated,
}

impl EngineEvent {
    /// Short name used in log lines.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OrderCreated { .. } => "order_created",
            Self::OrderWithdrawn { .. } => "order_withdrawn",
            Self::ExchangeRateUpdated { .. } => "exchange_rate_updated",
            Self::AccountLinesHashUpdated { .. } => "account_lines_hash_updated",
            Self::VisibilityChanged { .. } => "visibility_changed",
            Self::TradeCreated { .. } => "trade_created",
            Self::TradeSettled { .. } => "trade_settled",
            Self::TradeExpired { .. } => "trade_expired",
            Self::FeesWithdrawn { .. } => "fees_withdrawn",
            Self::PauseChanged { .. } => "pause_changed",
            Self::TradeBoundsUpdated { .. } => "trade_bounds_updated",
            Self::PaymentWindowUpdated { .. } => "payment_window_updated",
            Self::VerifierRegistered { .. } => "verifier_registered",
            Self::VerifierRemoved { .. } => "verifier_removed",
            Self::TokenRegistered { .. } => "token_registered",
            Self::FeePolicyUpdated => "fee_policy_updated",
        }
    }

    /// The order this event concerns, if any.
    #[must_use]
    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            Self::OrderCreated { order_id, .. }
            | Self::OrderWithdrawn { order_id, .. }
            | Self::ExchangeRateUpdated { order_id, .. }
            | Self::AccountLinesHashUpdated { order_id, .. }
            | Self::VisibilityChanged { order_id, .. }
            | Self::TradeCreated { order_id, .. }
            | Self::TradeSettled { order_id, .. }
            | Self::TradeExpired { order_id, .. } => Some(*order_id),
            _ => None,
        }
    }
}

/// One entry in an order's activity timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderActivity {
    Trade {
        trade_id: TradeId,
        buyer: Address,
        token_amount: u128,
        fiat_amount: u64,
        status: TradeStatus,
        at: DateTime<Utc>,
    },
    Withdrawal {
        amount: u128,
        remaining_after: u128,
        at: DateTime<Utc>,
    },
}

impl OrderActivity {
    #[must_use]
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::Trade { at, .. } | Self::Withdrawal { at, .. } => *at,
        }
    }
}

impl From<&Trade> for OrderActivity {
    fn from(trade: &Trade) -> Self {
        Self::Trade {
            trade_id: trade.id,
            buyer: trade.buyer,
            token_amount: trade.token_amount,
            fiat_amount: trade.fiat_amount,
            status: trade.status,
            at: trade.created_at,
        }
    }
}

impl From<&WithdrawalRecord> for OrderActivity {
    fn from(record: &WithdrawalRecord) -> Self {
        Self::Withdrawal {
            amount: record.amount,
            remaining_after: record.remaining_after,
            at: record.withdrawn_at,
        }
    }
}
