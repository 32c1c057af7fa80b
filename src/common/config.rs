//! Configuration for the BitDSM custody core
//!
//! Configuration is loaded once at process start, either from environment
//! variables or from a TOML document, and handed to the custody service.
//!
//! # Environment Variables
//!
//! - `BITDSM_CONFIG_VERSION` - Config schema version (default: 1)
//! - `BITDSM_NETWORK` - "mainnet", "testnet", "signet" or "regtest" (default: "testnet")
//! - `BITDSM_BECH32_HRP` - Override for the bech32 human-readable prefix
//! - `BITDSM_MULTISIG_THRESHOLD` - Required signatures in pod scripts (default: 2)
//! - `BITDSM_MULTISIG_TOTAL` - Keys in pod scripts (default: 2)
//! - `BITDSM_LOG_LEVEL` - Logging level (trace, debug, info, warn, error)
//! - `BITDSM_JSON_LOGS` - Set to "1" for JSON log output

use std::env;
use std::str::FromStr;

use bitcoin::bech32::Hrp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::btc::MultisigTemplate;

/// Config schema version understood by this build
pub const CONFIG_VERSION: u32 = 1;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("unsupported config version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("invalid multisig template: {threshold}-of-{total}")]
    InvalidMultisig { threshold: u8, total: u8 },

    #[error("failed to parse config file: {0}")]
    Parse(String),
}

/// Bitcoin network the pods live on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Signet,
    Regtest,
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" | "bitcoin" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            "signet" => Ok(Network::Signet),
            "regtest" => Ok(Network::Regtest),
            _ => Err(ConfigError::InvalidValue(
                "BITDSM_NETWORK".to_string(),
                format!("unknown network: {}", s),
            )),
        }
    }
}

impl Network {
    /// Default bech32 human-readable prefix
    pub fn default_hrp(&self) -> &'static str {
        match self {
            Network::Mainnet => "bc",
            Network::Testnet | Network::Signet => "tb",
            Network::Regtest => "bcrt",
        }
    }
}

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustodyConfig {
    /// Config schema version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Bitcoin network
    pub network: Network,

    /// Overrides the network's bech32 prefix
    #[serde(default)]
    pub bech32_hrp: Option<String>,

    /// Required signatures in pod witness scripts
    #[serde(default = "default_multisig")]
    pub multisig_threshold: u8,

    /// Total keys in pod witness scripts
    #[serde(default = "default_multisig")]
    pub multisig_total: u8,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON logs
    #[serde(default)]
    pub json_logs: bool,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_multisig() -> u8 {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CustodyConfig {
    fn default() -> Self {
        Self::for_network(Network::Testnet)
    }
}

impl CustodyConfig {
    /// Default configuration for a network
    pub fn for_network(network: Network) -> Self {
        Self {
            version: CONFIG_VERSION,
            network,
            bech32_hrp: None,
            multisig_threshold: default_multisig(),
            multisig_total: default_multisig(),
            log_level: default_log_level(),
            json_logs: false,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let version = parse_env("BITDSM_CONFIG_VERSION", CONFIG_VERSION)?;

        let network: Network = env::var("BITDSM_NETWORK")
            .unwrap_or_else(|_| "testnet".to_string())
            .parse()?;

        let bech32_hrp = env::var("BITDSM_BECH32_HRP").ok().filter(|h| !h.is_empty());

        let multisig_threshold = parse_env("BITDSM_MULTISIG_THRESHOLD", default_multisig())?;
        let multisig_total = parse_env("BITDSM_MULTISIG_TOTAL", default_multisig())?;

        let log_level = env::var("BITDSM_LOG_LEVEL").unwrap_or_else(|_| default_log_level());
        let json_logs = env::var("BITDSM_JSON_LOGS").map(|v| v == "1").unwrap_or(false);

        let config = Self {
            version,
            network,
            bech32_hrp,
            multisig_threshold,
            multisig_total,
            log_level,
            json_logs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check version, prefix and multisig shape
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: self.version,
                expected: CONFIG_VERSION,
            });
        }

        self.hrp()?;
        self.multisig_template()?;
        Ok(())
    }

    /// Bech32 prefix in effect
    pub fn hrp(&self) -> Result<Hrp, ConfigError> {
        let prefix = self
            .bech32_hrp
            .as_deref()
            .unwrap_or_else(|| self.network.default_hrp());

        Hrp::parse(prefix).map_err(|e| {
            ConfigError::InvalidValue("BITDSM_BECH32_HRP".to_string(), e.to_string())
        })
    }

    /// Multisig template pods are expected to use
    pub fn multisig_template(&self) -> Result<MultisigTemplate, ConfigError> {
        MultisigTemplate::new(self.multisig_threshold, self.multisig_total).ok_or(
            ConfigError::InvalidMultisig {
                threshold: self.multisig_threshold,
                total: self.multisig_total,
            },
        )
    }

    /// Configuration summary (nothing here is secret)
    pub fn summary(&self) -> String {
        format!(
            "version={} network={:?} hrp={} multisig={}-of-{} log_level={} json_logs={}",
            self.version,
            self.network,
            self.bech32_hrp
                .as_deref()
                .unwrap_or_else(|| self.network.default_hrp()),
            self.multisig_threshold,
            self.multisig_total,
            self.log_level,
            self.json_logs
        )
    }
}

fn parse_env<T: FromStr>(var_name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(var_name) {
        Ok(value) => value.parse().map_err(|_| {
            ConfigError::InvalidValue(var_name.to_string(), format!("cannot parse '{}'", value))
        }),
        Err(_) => Ok(default),
    }
}
