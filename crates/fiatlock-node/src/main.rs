//! # fiatlock-node
//!
//! Runs one settlement engine:
//!
//! 1. Load [`NodeConfig`] from the path given as the first argument (or
//!    defaults) and apply `FIATLOCK_*` environment overrides
//! 2. Restore the ledger from the snapshot in `data_dir`
//! 3. Register a verifier per payment rail and re-seed anti-replay state
//! 4. Check supply conservation, then expire lapsed trades every
//!    `sweep_interval_secs` until Ctrl-C
//!
//! Custody runs against the in-memory token backend; an on-chain backend
//! plugs in through `fiatlock_ledger::TokenBackend`.

use std::{
    sync::{Arc, PoisonError},
    time::Duration,
};

use fiatlock_fees::StaticFeeCalculator;
use fiatlock_ledger::{Custody, InMemoryTokenBackend};
use fiatlock_settlement::{
    AttestationVerifier, JsonFileStore, MockVerifier, SettlementCoordinator, SharedCoordinator,
    SystemClock, Verifier,
};
use fiatlock_types::{FiatlockError, NodeConfig, PaymentRail, Result, TxIdHash, constants};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "info,fiatlock=debug";

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    init_tracing(config.log_json);

    tracing::info!(
        engine = constants::ENGINE_NAME,
        version = constants::VERSION,
        chain_id = config.engine.chain_id,
        admin = %config.engine.admin,
        pool = %config.engine.pool,
        data_dir = %config.data_dir,
        "starting node"
    );

    let engine = build_engine(&config)?.into_shared();
    {
        let engine = engine.lock().unwrap_or_else(PoisonError::into_inner);
        for token in engine.supply().tracked_tokens() {
            engine
                .supply()
                .verify(&token, engine.ledger_holdings(&token))
                .inspect_err(|err| {
                    tracing::error!(error = %err, "restored ledger fails supply conservation");
                })?;
        }
        tracing::info!(
            orders = engine.ledger().orders().len(),
            trades = engine.ledger().trades().len(),
            pending_expired = engine.expired_pending_trades().len(),
            paused = engine.is_paused(),
            "engine ready"
        );
    }

    run_sweeper(&engine, Duration::from_secs(config.sweep_interval_secs.max(1))).await;
    tracing::info!("node stopped");
    Ok(())
}

fn load_config() -> Result<NodeConfig> {
    match std::env::args().nth(1) {
        Some(path) => NodeConfig::load(path),
        None => {
            let mut config = NodeConfig::default();
            config.apply_env_overrides()?;
            config.engine.validate()?;
            Ok(config)
        }
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// The rail verifier: attestation-based when `FIATLOCK_ATTESTER_KEY` holds
/// a hex ed25519 public key, otherwise an accept-all mock for local runs.
fn rail_verifier(settled: &[TxIdHash]) -> Result<Arc<dyn Verifier>> {
    let Ok(raw) = std::env::var("FIATLOCK_ATTESTER_KEY") else {
        tracing::warn!("FIATLOCK_ATTESTER_KEY unset, every payment proof will be accepted");
        return Ok(Arc::new(MockVerifier::accepting()));
    };
    let bytes: [u8; 32] = hex::decode(raw.trim().trim_start_matches("0x"))
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| {
            FiatlockError::Configuration("FIATLOCK_ATTESTER_KEY must be 32 hex bytes".into())
        })?;
    let verifier = AttestationVerifier::from_public_key(&bytes)?;
    verifier.seed(settled.iter().copied());
    Ok(Arc::new(verifier))
}

fn build_engine(config: &NodeConfig) -> Result<SettlementCoordinator> {
    let tokens = InMemoryTokenBackend::new();
    let custody = Custody::new(config.engine.pool, Box::new(tokens.clone()));
    let store = JsonFileStore::new(config.snapshot_path());
    let mut engine =
        SettlementCoordinator::new(config.engine.clone(), custody, Arc::new(SystemClock))?
            .with_fee_calculator(Arc::new(StaticFeeCalculator::new(config.fees.clone())))
            .with_store(Box::new(store))?;

    // In-memory custody starts empty; rebuild the pool from the ledger.
    for token in engine.supply().tracked_tokens() {
        tokens.mint(token, engine.custody().pool(), engine.ledger_holdings(&token));
    }

    let verifier = rail_verifier(&engine.settled_tx_id_hashes())?;
    for rail in PaymentRail::ALL {
        engine = engine.with_verifier(rail, Arc::clone(&verifier));
    }
    Ok(engine)
}

/// Expire lapsed trades on a fixed interval until Ctrl-C.
async fn run_sweeper(engine: &SharedCoordinator, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => sweep_once(engine),
            result = &mut shutdown => {
                if let Err(err) = result {
                    tracing::error!(error = %err, "failed to listen for shutdown signal");
                }
                tracing::info!("shutdown requested");
                break;
            }
        }
    }
}

fn sweep_once(engine: &SharedCoordinator) {
    let mut engine = engine.lock().unwrap_or_else(PoisonError::into_inner);
    let expired = engine.sweep_expired();
    for event in engine.drain_events() {
        match serde_json::to_string(&event) {
            Ok(json) => tracing::debug!(kind = event.kind(), %json, "engine event"),
            Err(err) => tracing::warn!(error = %err, "could not encode engine event"),
        }
    }
    if expired > 0 {
        if let Err(err) = engine.verify_all_conservation() {
            tracing::error!(error = %err, "supply conservation violated after sweep");
        }
    }
}
