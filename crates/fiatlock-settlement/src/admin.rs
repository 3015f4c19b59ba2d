//! Admin operations.
//!
//! Every setter takes effect for the next operation; nothing already
//! committed is touched. Config and pause changes are saved to the snapshot
//! store before they apply, so a failed save leaves the setting unchanged.
//! Verifiers and the fee policy live outside the snapshot and are supplied
//! again at startup.

use std::sync::Arc;

use fiatlock_fees::{FeeCalculator, StaticFeeCalculator};
use fiatlock_types::{
    Address, EngineConfig, EngineEvent, FeeConfig, FiatlockError, PaymentRail, Result, TokenInfo,
};

use crate::{SettlementCoordinator, Verifier};

impl SettlementCoordinator {
    pub(crate) fn require_admin(&self, caller: &Address) -> Result<()> {
        if *caller == self.config.admin {
            Ok(())
        } else {
            Err(FiatlockError::NotAuthorized {
                reason: format!("{caller} is not the admin"),
            })
        }
    }

    /// Pause or resume order creation, fills, and settlement.
    pub fn set_paused(&mut self, paused: bool, caller: &Address) -> Result<()> {
        self.require_admin(caller)?;
        self.reconfigure(self.config.clone(), paused)?;
        tracing::warn!(paused, "engine pause flag changed");
        self.record(EngineEvent::PauseChanged { paused });
        Ok(())
    }

    /// Set the inclusive fiat bounds for new trades, in cents.
    pub fn set_trade_bounds(&mut self, min: u64, max: u64, caller: &Address) -> Result<()> {
        self.require_admin(caller)?;
        if min == 0 || min > max {
            return Err(FiatlockError::Configuration(format!(
                "invalid trade bounds [{min}, {max}]"
            )));
        }
        let config = EngineConfig {
            min_trade_value: min,
            max_trade_value: max,
            ..self.config.clone()
        };
        self.reconfigure(config, self.pause.is_paused())?;
        tracing::info!(min, max, "trade bounds updated");
        self.record(EngineEvent::TradeBoundsUpdated { min, max });
        Ok(())
    }

    /// Set the payment window for new trades. Pending trades keep theirs.
    pub fn set_payment_window(&mut self, secs: u64, caller: &Address) -> Result<()> {
        self.require_admin(caller)?;
        EngineConfig::check_payment_window(secs)?;
        let config = EngineConfig {
            payment_window_secs: secs,
            ..self.config.clone()
        };
        self.reconfigure(config, self.pause.is_paused())?;
        tracing::info!(secs, "payment window updated");
        self.record(EngineEvent::PaymentWindowUpdated { secs });
        Ok(())
    }

    pub fn register_verifier(
        &mut self,
        rail: PaymentRail,
        verifier: Arc<dyn Verifier>,
        caller: &Address,
    ) -> Result<()> {
        self.require_admin(caller)?;
        self.verifiers.register(rail, verifier);
        tracing::info!(%rail, "verifier registered");
        self.record(EngineEvent::VerifierRegistered { rail });
        Ok(())
    }

    /// Returns whether a verifier was registered. Pending trades on the rail
    /// can no longer settle and will expire.
    pub fn remove_verifier(&mut self, rail: PaymentRail, caller: &Address) -> Result<bool> {
        self.require_admin(caller)?;
        let removed = self.verifiers.remove(rail);
        if removed {
            tracing::warn!(%rail, "verifier removed");
            self.record(EngineEvent::VerifierRemoved { rail });
        }
        Ok(removed)
    }

    /// Make a token lockable, or update its cached metadata for new orders.
    pub fn register_token(&mut self, token: TokenInfo, caller: &Address) -> Result<()> {
        self.require_admin(caller)?;
        token.unit()?;
        let event = EngineEvent::TokenRegistered {
            token: token.address,
            decimals: token.decimals,
        };
        let mut config = self.config.clone();
        match config.tokens.iter_mut().find(|t| t.address == token.address) {
            Some(existing) => *existing = token.clone(),
            None => config.tokens.push(token.clone()),
        }
        self.reconfigure(config, self.pause.is_paused())?;
        tracing::info!(token = %token, decimals = token.decimals, "token registered");
        self.record(event);
        Ok(())
    }

    pub fn set_fee_calculator(
        &mut self,
        fees: Arc<dyn FeeCalculator>,
        caller: &Address,
    ) -> Result<()> {
        self.require_admin(caller)?;
        self.fees = fees;
        tracing::info!("fee calculator replaced");
        self.record(EngineEvent::FeePolicyUpdated);
        Ok(())
    }

    /// Replace the fee policy with a [`StaticFeeCalculator`] over `config`.
    pub fn set_fee_config(&mut self, config: FeeConfig, caller: &Address) -> Result<()> {
        self.set_fee_calculator(Arc::new(StaticFeeCalculator::new(config)), caller)
    }
}
