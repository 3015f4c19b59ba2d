//! # fiatlock-types
//!
//! Shared types, errors, and configuration for the **FiatLock** settlement
//! engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Address`], [`OrderId`], [`TradeId`]
//! - **Commitments**: [`AccountLinesHash`], [`TxIdHash`]
//! - **Order model**: [`Order`], [`PaymentRail`], [`WithdrawalRecord`]
//! - **Trade model**: [`Trade`], [`TradeStatus`]
//! - **Token model**: [`TokenInfo`]
//! - **Events**: [`EngineEvent`], [`OrderActivity`]
//! - **Configuration**: [`EngineConfig`], [`FeeConfig`], [`NodeConfig`]
//! - **Errors**: [`FiatlockError`] with `FL_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod commitment;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod order;
pub mod rail;
pub mod token;
pub mod trade;

// Re-export all primary types at crate root for ergonomic imports:
//   use fiatlock_types::{Order, Trade, TradeStatus, ...};

pub use commitment::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use order::*;
pub use rail::*;
pub use token::*;
pub use trade::*;

// Constants are accessed via `fiatlock_types::constants::FOO`
// (not re-exported to avoid name collisions).
