//! System-wide constants for the FiatLock settlement engine.

/// Fiat amounts are cents; trades must be whole currency units.
pub const CENTS_PER_UNIT: u64 = 100;

/// Default minimum trade value in fiat cents (100.00).
pub const DEFAULT_MIN_TRADE_VALUE: u64 = 10_000;

/// Default maximum trade value in fiat cents (50,000.00).
pub const DEFAULT_MAX_TRADE_VALUE: u64 = 5_000_000;

/// Default payment window in seconds (15 minutes).
pub const DEFAULT_PAYMENT_WINDOW_SECS: u64 = 900;

/// Longest payment window the engine accepts (30 days).
pub const MAX_PAYMENT_WINDOW_SECS: u64 = 30 * 24 * 60 * 60;

/// Default flat fee for public orders, in stable-value units (hundredths).
pub const DEFAULT_PUBLIC_FEE_HUNDREDTHS: i64 = 20;

/// Default flat fee for private orders, in stable-value units (hundredths).
pub const DEFAULT_PRIVATE_FEE_HUNDREDTHS: i64 = 40;

/// Length of the lookup code issued to unlisted orders.
pub const PRIVATE_CODE_LEN: usize = 8;

/// Default interval between expiry sweeps in the node, in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

/// Default chain: Base mainnet.
pub const BASE_CHAIN_ID: u64 = 8453;

/// Ethereum mainnet.
pub const ETHEREUM_CHAIN_ID: u64 = 1;

/// Snapshot file name inside the node's data directory.
pub const SNAPSHOT_FILE: &str = "ledger.json";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "FiatLock";
