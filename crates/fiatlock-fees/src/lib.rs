//! # fiatlock-fees
//!
//! **Pure pricing for FiatLock.**
//!
//! This crate is the compute leaf of the engine. It has:
//!
//! - **No side effects**: no ledger access, no custody, no clock
//! - **Deterministic output**: same inputs produce the same fee and quote
//! - **Fail-open fees**: tokens outside the fee table cost nothing to trade
//!
//! The coordinator calls a [`FeeCalculator`] once per fill and trusts the
//! result as oracle data.

pub mod calculator;
pub mod quote;

pub use calculator::{FeeCalculator, StaticFeeCalculator};
pub use quote::{token_amount_for_fiat, validate_fiat_amount};
