//! # fiatlock-ledger
//!
//! **Ledger plane**: the durable rows of the settlement engine and the
//! primitives that move value.
//!
//! ## Architecture
//!
//! 1. **OrderRegistry**: orders and their remaining locked inventory
//! 2. **TradeRegistry**: trades, their reservations and status
//! 3. **FeeTreasury**: per-token fees earned by settled trades
//! 4. **SequenceCounter**: monotonic counter feeding ID derivation
//! 5. **Ledger / Txn**: all of the above behind an undo journal, so a
//!    failing step rolls every row back
//! 6. **Custody**: pooled token custody over a pluggable [`TokenBackend`]
//!
//! ```text
//! Coordinator → Ledger::atomically(|tx| { tx.reserve(..)?; tx.insert_trade(..)?; custody.transfer_out(..) })
//!             → commit | rollback
//! ```

pub mod custody;
pub mod journal;
pub mod order_registry;
pub mod sequence;
pub mod trade_registry;
pub mod treasury;

pub use custody::{Custody, InMemoryTokenBackend, TokenBackend, TokenBehavior};
pub use journal::{Ledger, LedgerSnapshot, Txn};
pub use order_registry::OrderRegistry;
pub use sequence::SequenceCounter;
pub use trade_registry::TradeRegistry;
pub use treasury::FeeTreasury;
