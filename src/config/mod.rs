use alloy::primitives::{Address, B256};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid address for {field}: {value}")]
    InvalidAddress { field: &'static str, value: String },
    #[error("invalid condition id: {0}")]
    InvalidCondition(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub contracts: ContractsConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Read-only JSON-RPC endpoint used for eth_call.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Chain the wallet must be on before swapping.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_chain_name")]
    pub chain_name: String,
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractsConfig {
    #[serde(default = "default_risk_signal")]
    pub risk_signal: String,
    #[serde(default = "default_router")]
    pub router: String,
    /// Hook attached to the pool; shown on the dashboard only.
    #[serde(default = "default_prediction_hook")]
    pub prediction_hook: String,
    /// Cross-chain signal receiver; shown on the dashboard only.
    #[serde(default = "default_receiver")]
    pub receiver: String,
    /// Quote token (sold when zero_for_one is true).
    #[serde(default = "default_usdc")]
    pub usdc: String,
    /// Base token.
    #[serde(default = "default_weth")]
    pub weth: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    /// Polymarket CLOB REST API base URL
    #[serde(default = "default_clob_url")]
    pub clob_url: String,
    /// Condition whose "Yes" price is mirrored on the dashboard.
    #[serde(default = "default_condition_id")]
    pub condition_id: String,
    #[serde(default = "default_market_title")]
    pub title: String,
    /// Public Polymarket page for the market.
    #[serde(default = "default_market_page")]
    pub page_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// JSON-RPC endpoint of the signing wallet. Empty = no wallet injected.
    #[serde(default)]
    pub url: String,
    /// Receipt polling interval while waiting for confirmation.
    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,
    /// Give up waiting for a receipt after this many polls.
    #[serde(default = "default_receipt_max_polls")]
    pub receipt_max_polls: u32,
    /// How often to poll the wallet for account or chain changes.
    #[serde(default = "default_watch_ms")]
    pub watch_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_rpc_url() -> String {
    "https://sepolia-rollup.arbitrum.io/rpc".to_string()
}
fn default_chain_id() -> u64 {
    421614
}
fn default_chain_name() -> String {
    "Arbitrum Sepolia".to_string()
}
fn default_explorer_url() -> String {
    "https://sepolia.arbiscan.io".to_string()
}
fn default_risk_signal() -> String {
    "0x7EA6F46b1005B1356524148CDDE4567192301B6e".to_string()
}
fn default_router() -> String {
    "0xA2f89e0e429861602AC731FEa0855d7D8ba7C152".to_string()
}
fn default_prediction_hook() -> String {
    "0x5CD3508356402e4b3D7E60E7DFeb75eBC8414080".to_string()
}
fn default_receiver() -> String {
    "0x0CdbE45B99b6f2D1c2CEc65034DA60bA51ef4433".to_string()
}
fn default_usdc() -> String {
    "0x75faf114eafb1BDbe2F0316DF893fd58CE46AA4d".to_string()
}
fn default_weth() -> String {
    "0x980B62Da83eFf3D4576C647993b0c1D7faf17c73".to_string()
}
fn default_clob_url() -> String {
    "https://clob.polymarket.com".to_string()
}
fn default_condition_id() -> String {
    "0xa2e0e21aab2d6dbdae148134b816c461b6582d216fdc2a783a107b44018713ee".to_string()
}
fn default_market_title() -> String {
    "Will ETH dip to $1,600?".to_string()
}
fn default_market_page() -> String {
    "https://polymarket.com/event/what-price-will-ethereum-hit-in-february-2026".to_string()
}
fn default_watch_ms() -> u64 {
    2000
}
fn default_receipt_poll_ms() -> u64 {
    1000
}
fn default_receipt_max_polls() -> u32 {
    120
}
fn default_poll_interval_secs() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            chain_id: default_chain_id(),
            chain_name: default_chain_name(),
            explorer_url: default_explorer_url(),
        }
    }
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            risk_signal: default_risk_signal(),
            router: default_router(),
            prediction_hook: default_prediction_hook(),
            receiver: default_receiver(),
            usdc: default_usdc(),
            weth: default_weth(),
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            clob_url: default_clob_url(),
            condition_id: default_condition_id(),
            title: default_market_title(),
            page_url: default_market_page(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            receipt_poll_ms: default_receipt_poll_ms(),
            receipt_max_polls: default_receipt_max_polls(),
            watch_ms: default_watch_ms(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            contracts: ContractsConfig::default(),
            market: MarketConfig::default(),
            wallet: WalletConfig::default(),
            poll: PollConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// A token the swap card can sell or buy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpec {
    pub symbol: &'static str,
    pub address: Address,
    pub decimals: u8,
}

/// Typed deployment constants resolved from [`Config`].
#[derive(Debug, Clone)]
pub struct Deployment {
    pub rpc_url: String,
    pub chain_id: u64,
    pub chain_name: String,
    pub explorer_url: String,
    pub risk_signal: Address,
    pub router: Address,
    pub prediction_hook: Address,
    pub receiver: Address,
    pub usdc: TokenSpec,
    pub weth: TokenSpec,
    pub clob_url: String,
    pub condition_id: B256,
    pub market_title: String,
    pub market_page_url: String,
}

pub const USDC_DECIMALS: u8 = 6;
pub const WETH_DECIMALS: u8 = 18;

fn parse_address(field: &'static str, value: &str) -> Result<Address, ConfigError> {
    Address::from_str(value.trim()).map_err(|_| ConfigError::InvalidAddress {
        field,
        value: value.to_string(),
    })
}

impl Config {
    /// Load config from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.apply_env();
        Ok(config)
    }

    /// Defaults plus environment overrides (no file needed).
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("RISKGATE_RPC_URL") {
            self.network.rpc_url = url;
        }
        if let Ok(url) = std::env::var("RISKGATE_WALLET_URL") {
            self.wallet.url = url;
        }
        if let Ok(url) = std::env::var("RISKGATE_CLOB_URL") {
            self.market.clob_url = url;
        }
        if let Some(secs) = std::env::var("RISKGATE_POLL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.poll.interval_secs = secs;
        }
    }

    pub fn has_wallet(&self) -> bool {
        !self.wallet.url.is_empty()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll.interval_secs.max(1))
    }

    pub fn deployment(&self) -> Result<Deployment, ConfigError> {
        let condition_id = B256::from_str(self.market.condition_id.trim())
            .map_err(|_| ConfigError::InvalidCondition(self.market.condition_id.clone()))?;

        Ok(Deployment {
            rpc_url: self.network.rpc_url.clone(),
            chain_id: self.network.chain_id,
            chain_name: self.network.chain_name.clone(),
            explorer_url: self.network.explorer_url.clone(),
            risk_signal: parse_address("contracts.risk_signal", &self.contracts.risk_signal)?,
            router: parse_address("contracts.router", &self.contracts.router)?,
            prediction_hook: parse_address(
                "contracts.prediction_hook",
                &self.contracts.prediction_hook,
            )?,
            receiver: parse_address("contracts.receiver", &self.contracts.receiver)?,
            usdc: TokenSpec {
                symbol: "USDC",
                address: parse_address("contracts.usdc", &self.contracts.usdc)?,
                decimals: USDC_DECIMALS,
            },
            weth: TokenSpec {
                symbol: "WETH",
                address: parse_address("contracts.weth", &self.contracts.weth)?,
                decimals: WETH_DECIMALS,
            },
            clob_url: self.market.clob_url.trim_end_matches('/').to_string(),
            condition_id,
            market_title: self.market.title.clone(),
            market_page_url: self.market.page_url.clone(),
        })
    }
}

impl Deployment {
    /// The Arbitrum Sepolia deployment the dashboard ships with.
    pub fn arbitrum_sepolia() -> Result<Self, ConfigError> {
        Config::default().deployment()
    }

    pub fn tx_url(&self, hash: &B256) -> String {
        format!("{}/tx/{}", self.explorer_url, hash)
    }

    pub fn address_url(&self, address: &Address) -> String {
        format!("{}/address/{}", self.explorer_url, address)
    }

    /// Labelled contracts listed on the dashboard, in display order.
    pub fn contracts(&self) -> [(&'static str, Address); 4] {
        [
            ("RiskSignal", self.risk_signal),
            ("PredictionHook", self.prediction_hook),
            ("PredictionRouter", self.router),
            ("Receiver", self.receiver),
        ]
    }
}
