//! # fiatlock-settlement
//!
//! The settlement plane: turns locked seller inventory into buyer payouts
//! once a payment rail's verifier accepts a fiat payment proof.
//!
//! ## Lifecycle
//!
//! 1. `create_order` pulls tokens into pool custody
//! 2. `fill_order` reserves `token_amount + fee` for a buyer
//! 3. `submit_proof` settles: tokens to the buyer, fee to the treasury
//! 4. `expire` returns the whole reservation once the payment window closes
//!
//! Every operation is all-or-nothing against the ledger, and the
//! conservation check in [`SupplyConservation`] ties the ledger back to
//! the pool's real token balances.

pub mod admin;
pub mod clock;
pub mod coordinator;
pub mod pause_guard;
pub mod queries;
pub mod store;
pub mod supply_conservation;
pub mod verifier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{NewOrder, SettlementCoordinator, SharedCoordinator};
pub use pause_guard::{GuardedOperation, PauseGuard};
pub use queries::FillQuote;
pub use store::{EngineSnapshot, JsonFileStore, MemoryStore, SNAPSHOT_VERSION, SnapshotStore};
pub use supply_conservation::{SupplyConservation, TokenFlows};
pub use verifier::{AttestationVerifier, MockVerifier, Verifier, VerifierRegistry};
