//! Error types for the FiatLock settlement engine.
//!
//! All errors use the `FL_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order errors
//! - 2xx: Trade errors
//! - 3xx: Bounds errors
//! - 4xx: Configuration errors
//! - 5xx: Proof errors
//! - 6xx: Treasury / custody errors
//! - 8xx: Authorization / pause errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{Address, OrderId, PaymentRail, TradeId, TradeStatus};

/// Central error enum for all FiatLock operations.
#[derive(Debug, Error)]
pub enum FiatlockError {
    // =================================================================
    // Order Errors (1xx)
    // =================================================================
    /// The requested order does not exist.
    #[error("FL_ERR_100: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order parameters failed validation (zero amount, zero rate, ...).
    #[error("FL_ERR_101: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    /// The account-lines commitment is the zero hash.
    #[error("FL_ERR_102: Invalid account commitment: hash must be non-zero")]
    InvalidCommitment,

    /// A seller tried to withdraw more than the order has left.
    #[error("FL_ERR_103: Insufficient remaining: requested {requested}, remaining {remaining}")]
    InsufficientRemaining { requested: u128, remaining: u128 },

    /// A fill tried to reserve more than the order has left.
    #[error("FL_ERR_104: Insufficient liquidity: requested {requested}, remaining {remaining}")]
    InsufficientLiquidity { requested: u128, remaining: u128 },

    /// No order is registered under this private code.
    #[error("FL_ERR_105: Private code not found: {0}")]
    PrivateCodeNotFound(String),

    /// An order with this ID already exists.
    #[error("FL_ERR_106: Order already exists: {0}")]
    DuplicateOrder(OrderId),

    // =================================================================
    // Trade Errors (2xx)
    // =================================================================
    /// The requested trade does not exist.
    #[error("FL_ERR_200: Trade not found: {0}")]
    TradeNotFound(TradeId),

    /// The trade already reached a terminal state (double settle / expire).
    #[error("FL_ERR_201: Trade {trade_id} is not pending (status {status})")]
    TradeNotPending {
        trade_id: TradeId,
        status: TradeStatus,
    },

    /// The payment window has closed; only expiry is possible now.
    #[error("FL_ERR_202: Trade expired: {0}")]
    TradeExpired(TradeId),

    /// Expiry requested while the payment window is still open.
    #[error("FL_ERR_203: Trade {trade_id} not yet expired (expires at unix {expires_at})")]
    TradeNotYetExpired { trade_id: TradeId, expires_at: i64 },

    /// The requested status change is not an edge of the trade state machine.
    #[error("FL_ERR_204: Invalid transition: {from} -> {to}")]
    InvalidTransition { from: TradeStatus, to: TradeStatus },

    /// A trade with this ID already exists.
    #[error("FL_ERR_205: Trade already exists: {0}")]
    DuplicateTrade(TradeId),

    // =================================================================
    // Bounds Errors (3xx)
    // =================================================================
    /// Fiat amounts must be whole currency units (divisible by 100 cents).
    #[error("FL_ERR_300: Fractional fiat amount: {0} cents is not a whole currency unit")]
    FractionalFiatAmount(u64),

    /// The fiat amount is outside the configured trade value bounds.
    #[error("FL_ERR_301: Trade value {fiat_amount} outside bounds [{min}, {max}]")]
    TradeValueOutOfBounds { fiat_amount: u64, min: u64, max: u64 },

    /// An amount computation overflowed.
    #[error("FL_ERR_302: Amount overflow: {context}")]
    AmountOverflow { context: String },

    // =================================================================
    // Configuration Errors (4xx)
    // =================================================================
    /// No verifier is registered for the payment rail.
    #[error("FL_ERR_400: Verifier not configured for rail {0}")]
    VerifierNotConfigured(PaymentRail),

    /// The token is not registered, so its decimals cannot be resolved.
    #[error("FL_ERR_401: Unsupported token: {0}")]
    UnsupportedToken(Address),

    // =================================================================
    // Proof Errors (5xx)
    // =================================================================
    /// The verifier rejected the payment proof.
    #[error("FL_ERR_500: Proof verification failed for trade {0}")]
    ProofVerificationFailed(TradeId),

    // =================================================================
    // Treasury / Custody Errors (6xx)
    // =================================================================
    /// Fee withdrawal requested for a token with a zero balance.
    #[error("FL_ERR_600: No fees to withdraw for token {0}")]
    NoFeesToWithdraw(Address),

    /// A custody transfer reverted, returned `false`, or under-delivered.
    #[error("FL_ERR_601: Token transfer failed: {reason}")]
    TransferFailed { reason: String },

    /// Supply conservation invariant violated. Critical safety alert.
    #[error("FL_ERR_602: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // Authorization / Pause Errors (8xx)
    // =================================================================
    /// Caller is not allowed to perform this mutation.
    #[error("FL_ERR_800: Not authorized: {reason}")]
    NotAuthorized { reason: String },

    /// The engine is paused and the operation is blocked.
    #[error("FL_ERR_801: Engine paused: {operation} is blocked")]
    Paused { operation: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("FL_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("FL_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("FL_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (snapshot store, config file).
    #[error("FL_ERR_903: I/O error: {0}")]
    Io(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, FiatlockError>;

impl From<std::io::Error> for FiatlockError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for FiatlockError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
