//! Settlement configuration: chain, contract, and token parameters.
//!
//! Passed explicitly to the settlement manager and the CLI instead of being
//! read from process-wide constants.

use serde::{Deserialize, Serialize};
use squary_core::Address;
use std::path::Path;

use crate::error::SettlementError;

/// Settlement contract deployed on the zkSync networks.
const SQUARY_CONTRACT: Address = Address::from_bytes([
    0xba, 0xe2, 0x29, 0xa3, 0x88, 0x08, 0x10, 0x94, 0x64, 0x87, 0x1b, 0x1c, 0x8e, 0x3e, 0x75, 0xac,
    0xb6, 0x8d, 0x61, 0x9a,
]);

/// USDT test token.
const USDT_TOKEN: Address = Address::from_bytes([
    0x04, 0xf2, 0x99, 0x3b, 0x25, 0xaf, 0xde, 0xe6, 0xd9, 0x02, 0x0d, 0x42, 0xcb, 0xaa, 0xd6, 0x67,
    0xfd, 0x35, 0xf4, 0x58,
]);

/// USDC test token.
const USDC_TOKEN: Address = Address::from_bytes([
    0x7b, 0xf4, 0xdc, 0x86, 0x93, 0x7e, 0xb3, 0x87, 0x80, 0x7d, 0x09, 0xf9, 0x35, 0xd3, 0xa5, 0xc3,
    0xa2, 0x88, 0x81, 0x19,
]);

/// Largest token precision a decimal amount can represent.
pub const MAX_TOKEN_DECIMALS: u32 = 28;

/// Full settlement configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SettlementConfig {
    /// Chain the settlement contract lives on.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Settlement contract settings.
    #[serde(default)]
    pub contract: ContractConfig,

    /// Settlement token settings.
    #[serde(default)]
    pub token: TokenConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network name (e.g. "zksync-sepolia").
    #[serde(default = "default_network_name")]
    pub name: String,
    /// EVM chain id.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// JSON-RPC endpoint.
    #[serde(default)]
    pub rpc_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Settlement contract address.
    #[serde(default = "default_contract_address")]
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Token symbol (e.g. "USDT").
    #[serde(default = "default_token_symbol")]
    pub symbol: String,
    /// ERC-20 token address.
    #[serde(default = "default_token_address")]
    pub address: Address,
    /// Token decimals used when converting debts to contract units.
    #[serde(default = "default_token_decimals")]
    pub decimals: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_network_name() -> String {
    "zksync-sepolia".into()
}
fn default_chain_id() -> u64 {
    300
}
fn default_contract_address() -> Address {
    SQUARY_CONTRACT
}
fn default_token_symbol() -> String {
    "USDT".into()
}
fn default_token_address() -> Address {
    USDT_TOKEN
}
fn default_token_decimals() -> u32 {
    6
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: default_network_name(),
            chain_id: default_chain_id(),
            rpc_url: Some("https://sepolia.era.zksync.dev".into()),
        }
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: default_contract_address(),
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            symbol: default_token_symbol(),
            address: default_token_address(),
            decimals: default_token_decimals(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl TokenConfig {
    /// Known settlement tokens by symbol.
    pub fn preset(symbol: &str) -> Option<Self> {
        let address = match symbol.to_ascii_uppercase().as_str() {
            "USDT" => USDT_TOKEN,
            "USDC" => USDC_TOKEN,
            _ => return None,
        };
        Some(Self {
            symbol: symbol.to_ascii_uppercase(),
            address,
            decimals: 6,
        })
    }
}

impl SettlementConfig {
    /// Preset for a known network name.
    pub fn for_network(name: &str) -> Result<Self, SettlementError> {
        let network = match name {
            "zksync-sepolia" => NetworkConfig::default(),
            "zksync" => NetworkConfig {
                name: "zksync".into(),
                chain_id: 324,
                rpc_url: Some("https://mainnet.era.zksync.io".into()),
            },
            other => return Err(SettlementError::Config(format!("unknown network: {other}"))),
        };
        Ok(Self {
            network,
            ..Self::default()
        })
    }

    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> Result<Self, SettlementError> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: SettlementConfig = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), SettlementError> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettlementError> {
        if self.network.chain_id == 0 {
            return Err(SettlementError::Config("chain_id must be non-zero".into()));
        }
        if self.token.decimals > MAX_TOKEN_DECIMALS {
            return Err(SettlementError::Config(format!(
                "token decimals must be at most {MAX_TOKEN_DECIMALS}, got {}",
                self.token.decimals
            )));
        }
        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(SettlementError::Config(format!(
                "log format must be 'text' or 'json', got '{}'",
                self.logging.format
            )));
        }
        Ok(())
    }
}
