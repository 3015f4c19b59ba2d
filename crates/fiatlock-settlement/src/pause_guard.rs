//! Global pause guard.
//!
//! While paused, operations that take on new obligations are blocked:
//! creating orders, filling them, and settling trades. Operations that
//! return funds (seller withdrawals, expiry, fee withdrawals) stay open so
//! nothing locked in the engine becomes unrecoverable.

use fiatlock_types::{FiatlockError, Result};

/// Engine operations the guard knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardedOperation {
    CreateOrder,
    FillOrder,
    SubmitProof,
    Withdraw,
    Expire,
    WithdrawFees,
}

impl GuardedOperation {
    /// Is this operation blocked while the engine is paused?
    #[must_use]
    pub fn blocked_by_pause(self) -> bool {
        matches!(self, Self::CreateOrder | Self::FillOrder | Self::SubmitProof)
    }
}

impl std::fmt::Display for GuardedOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateOrder => write!(f, "create_order"),
            Self::FillOrder => write!(f, "fill_order"),
            Self::SubmitProof => write!(f, "submit_proof"),
            Self::Withdraw => write!(f, "withdraw"),
            Self::Expire => write!(f, "expire"),
            Self::WithdrawFees => write!(f, "withdraw_fees"),
        }
    }
}

#[derive(Debug, Default)]
pub struct PauseGuard {
    paused: bool,
}

impl PauseGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[must_use]
    pub fn allows(&self, op: GuardedOperation) -> bool {
        !(self.paused && op.blocked_by_pause())
    }

    /// Returns `Ok(())` if `op` may run, or [`FiatlockError::Paused`].
    pub fn check(&self, op: GuardedOperation) -> Result<()> {
        if self.allows(op) {
            Ok(())
        } else {
            Err(FiatlockError::Paused {
                operation: op.to_string(),
            })
        }
    }
}
