//! Configuration types for the engine, the fee policy, and the node.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Address, FiatlockError, Result, TokenInfo, constants};

/// Tokens known on a chain; literals are checked at construction.
fn known_tokens(entries: &[(&str, &str, u8)]) -> Vec<TokenInfo> {
    entries
        .iter()
        .filter_map(|(addr, symbol, decimals)| {
            addr.parse()
                .ok()
                .map(|address| TokenInfo::new(address, *symbol, *decimals))
        })
        .collect()
}

const BASE_USDC: &str = "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913";
const BASE_USDBC: &str = "0xd9aaec86b65d86f6a7b5b1b0c42ffa531710b6ca";
const BASE_WETH: &str = "0x4200000000000000000000000000000000000006";
const BASE_CBBTC: &str = "0xcbb7c0000ab88b473b1f5afd9ef808440eed33bf";
const ETH_USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
const ETH_USDT: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";
const ETH_WETH: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";
const ETH_WBTC: &str = "0x2260fac5e5542a773aa44fbcfedf7c193bc2c599";

/// Engine parameters. Admin setters on the coordinator mutate a live copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Chain this engine instance settles on.
    pub chain_id: u64,
    /// Address allowed to run admin operations.
    pub admin: Address,
    /// Pooled custody address that holds all locked tokens.
    pub pool: Address,
    /// Minimum fiat value per trade, in cents.
    pub min_trade_value: u64,
    /// Maximum fiat value per trade, in cents.
    pub max_trade_value: u64,
    /// Seconds a buyer has to pay and submit a proof.
    pub payment_window_secs: u64,
    /// Tokens whose decimals the engine can resolve.
    pub tokens: Vec<TokenInfo>,
}

impl EngineConfig {
    /// Base mainnet: USDC, USDbC, WETH, cbBTC.
    #[must_use]
    pub fn base_mainnet(admin: Address, pool: Address) -> Self {
        Self {
            chain_id: constants::BASE_CHAIN_ID,
            admin,
            pool,
            min_trade_value: constants::DEFAULT_MIN_TRADE_VALUE,
            max_trade_value: constants::DEFAULT_MAX_TRADE_VALUE,
            payment_window_secs: constants::DEFAULT_PAYMENT_WINDOW_SECS,
            tokens: known_tokens(&[
                (BASE_USDC, "USDC", 6),
                (BASE_USDBC, "USDbC", 6),
                (BASE_WETH, "WETH", 18),
                (BASE_CBBTC, "cbBTC", 8),
            ]),
        }
    }

    /// Ethereum mainnet: USDC, USDT, WETH, WBTC.
    #[must_use]
    pub fn ethereum_mainnet(admin: Address, pool: Address) -> Self {
        Self {
            chain_id: constants::ETHEREUM_CHAIN_ID,
            tokens: known_tokens(&[
                (ETH_USDC, "USDC", 6),
                (ETH_USDT, "USDT", 6),
                (ETH_WETH, "WETH", 18),
                (ETH_WBTC, "WBTC", 8),
            ]),
            ..Self::base_mainnet(admin, pool)
        }
    }

    /// Resolve a token's metadata.
    #[must_use]
    pub fn token(&self, address: &Address) -> Option<&TokenInfo> {
        self.tokens.iter().find(|t| t.address == *address)
    }

    /// The payment window as a duration.
    ///
    /// # Errors
    /// Returns `Configuration` if the window is outside
    /// `1..=MAX_PAYMENT_WINDOW_SECS`.
    pub fn payment_window(&self) -> Result<chrono::Duration> {
        Self::check_payment_window(self.payment_window_secs)?;
        i64::try_from(self.payment_window_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                FiatlockError::Configuration(format!(
                    "payment window {}s is not representable",
                    self.payment_window_secs
                ))
            })
    }

    /// # Errors
    /// Returns `Configuration` unless `0 < secs <= MAX_PAYMENT_WINDOW_SECS`.
    pub fn check_payment_window(secs: u64) -> Result<()> {
        if secs == 0 || secs > constants::MAX_PAYMENT_WINDOW_SECS {
            return Err(FiatlockError::Configuration(format!(
                "payment window must be within 1..={}s, got {secs}s",
                constants::MAX_PAYMENT_WINDOW_SECS
            )));
        }
        Ok(())
    }

    /// Check internal consistency.
    ///
    /// # Errors
    /// Returns `Configuration` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.admin.is_zero() {
            return Err(FiatlockError::Configuration("admin must be set".into()));
        }
        if self.pool.is_zero() {
            return Err(FiatlockError::Configuration("pool must be set".into()));
        }
        if self.min_trade_value > self.max_trade_value {
            return Err(FiatlockError::Configuration(format!(
                "min_trade_value {} exceeds max_trade_value {}",
                self.min_trade_value, self.max_trade_value
            )));
        }
        Self::check_payment_window(self.payment_window_secs)?;
        for token in &self.tokens {
            token.unit()?;
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::base_mainnet(Address::ZERO, Address::ZERO)
    }
}

/// Static price of one whole token in stable-value units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPrice {
    pub token: Address,
    pub price: Decimal,
}

/// Flat-fee policy: a fixed stable-value fee per trade, converted into the
/// trade's token through admin-set static prices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Flat fee for public (listed) orders.
    pub public_fee: Decimal,
    /// Flat fee for private (code-gated) orders.
    pub private_fee: Decimal,
    /// Tokens worth one stable-value unit each.
    pub stable_tokens: Vec<Address>,
    /// Prices for non-stable tokens.
    pub token_prices: Vec<TokenPrice>,
}

impl FeeConfig {
    #[must_use]
    pub fn is_stable(&self, token: &Address) -> bool {
        self.stable_tokens.contains(token)
    }

    #[must_use]
    pub fn price_of(&self, token: &Address) -> Option<Decimal> {
        self.token_prices
            .iter()
            .find(|p| p.token == *token)
            .map(|p| p.price)
    }

    /// Set or replace the static price for a token.
    pub fn set_price(&mut self, token: Address, price: Decimal) {
        match self.token_prices.iter_mut().find(|p| p.token == token) {
            Some(entry) => entry.price = price,
            None => self.token_prices.push(TokenPrice { token, price }),
        }
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        let addr = |s: &str| s.parse::<Address>().ok();
        let price = |s: &str, units: i64| {
            addr(s).map(|token| TokenPrice {
                token,
                price: Decimal::new(units, 0),
            })
        };
        Self {
            public_fee: Decimal::new(constants::DEFAULT_PUBLIC_FEE_HUNDREDTHS, 2),
            private_fee: Decimal::new(constants::DEFAULT_PRIVATE_FEE_HUNDREDTHS, 2),
            stable_tokens: [BASE_USDC, BASE_USDBC, ETH_USDC, ETH_USDT]
                .into_iter()
                .filter_map(addr)
                .collect(),
            token_prices: [
                price(BASE_WETH, 3_000),
                price(ETH_WETH, 3_000),
                price(BASE_CBBTC, 60_000),
                price(ETH_WBTC, 60_000),
            ]
            .into_iter()
            .flatten()
            .collect(),
        }
    }
}

/// Configuration for a FiatLock node process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Directory holding the ledger snapshot.
    pub data_dir: String,
    /// Seconds between expiry sweeps.
    pub sweep_interval_secs: u64,
    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub log_json: bool,
    pub engine: EngineConfig,
    #[serde(default)]
    pub fees: FeeConfig,
}

impl NodeConfig {
    /// Parse a JSON config document.
    ///
    /// # Errors
    /// Returns `Serialization` if the document is malformed.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON config file and apply environment overrides.
    ///
    /// # Errors
    /// Returns `Io` if the file cannot be read, `Serialization` if it is
    /// malformed, and `Configuration` if the engine section is inconsistent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config = Self::from_json_str(&raw)?;
        config.apply_env_overrides()?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Override selected fields from `FIATLOCK_*` environment variables.
    ///
    /// # Errors
    /// Returns `Configuration` if a variable is present but unparsable.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("FIATLOCK_DATA_DIR") {
            self.data_dir = dir;
        }
        if let Ok(raw) = std::env::var("FIATLOCK_SWEEP_INTERVAL_SECS") {
            self.sweep_interval_secs = raw.parse().map_err(|_| {
                FiatlockError::Configuration(format!("FIATLOCK_SWEEP_INTERVAL_SECS: {raw}"))
            })?;
        }
        if let Ok(raw) = std::env::var("FIATLOCK_LOG_JSON") {
            self.log_json = matches!(raw.as_str(), "1" | "true" | "yes");
        }
        if let Ok(raw) = std::env::var("FIATLOCK_ADMIN") {
            self.engine.admin = raw.parse()?;
        }
        if let Ok(raw) = std::env::var("FIATLOCK_POOL") {
            self.engine.pool = raw.parse()?;
        }
        Ok(())
    }

    /// Path of the ledger snapshot file.
    #[must_use]
    pub fn snapshot_path(&self) -> std::path::PathBuf {
        Path::new(&self.data_dir).join(constants::SNAPSHOT_FILE)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            sweep_interval_secs: constants::DEFAULT_SWEEP_INTERVAL_SECS,
            log_json: false,
            engine: EngineConfig::default(),
            fees: FeeConfig::default(),
        }
    }
}
