//! Application configuration.

use crate::error::{AppError, AppResult};
use alloy::primitives::Address;
use bridge_chain::{KeySource, ReferenceHash};
use bridge_core::ReportThrottle;
use bridge_feed::FeedConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level application configuration, loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub feed: FeedSection,
    pub chain: ChainSection,
    #[serde(default)]
    pub report: ReportSection,
}

/// Exchange feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSection {
    /// Exchange WebSocket stream base URL.
    pub url: String,
    /// Trading pair symbol (e.g., "btcusdt").
    pub symbol: String,
    /// Reconnection attempts before giving up.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Base reconnection delay (ms), doubled per attempt.
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    /// Reconnection delay ceiling (ms).
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_base_delay_ms() -> u64 {
    1_000
}

fn default_reconnect_max_delay_ms() -> u64 {
    60_000
}

impl FeedSection {
    pub fn to_feed_config(&self) -> FeedConfig {
        FeedConfig {
            url: self.url.clone(),
            symbol: self.symbol.clone(),
            max_reconnect_attempts: self.max_reconnect_attempts,
            reconnect_base_delay_ms: self.reconnect_base_delay_ms,
            reconnect_max_delay_ms: self.reconnect_max_delay_ms,
        }
    }
}

/// Chain node and signing identity settings.
///
/// Two identities take part in a run: the requester signs the initial price
/// request, and the reporter (the oracle account itself) signs the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSection {
    /// Chain node WebSocket RPC URL.
    pub url: String,
    /// Oracle account the initial price request targets. The reporter key
    /// is expected to belong to this account.
    pub oracle_address: String,
    /// Account that signs the initial price request.
    pub requester: AccountSection,
    /// Account that signs the price report.
    pub reporter: AccountSection,
    /// Reference identifier attached to each price report (32-byte hex).
    pub reference_hash: String,
}

/// One signing identity: a key source plus an optional expected address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSection {
    /// Expected address of the signing key. Optional; when set the loaded
    /// key must derive to it.
    #[serde(default)]
    pub address: Option<String>,
    /// Environment variable holding the signing key (hex).
    #[serde(default)]
    pub key_env: Option<String>,
    /// File holding the signing key (hex). Mutually exclusive with `key_env`.
    #[serde(default)]
    pub key_file: Option<String>,
}

impl AccountSection {
    pub fn address(&self) -> AppResult<Option<Address>> {
        self.address
            .as_deref()
            .map(|addr| {
                addr.parse()
                    .map_err(|err| AppError::Config(format!("invalid account address: {err}")))
            })
            .transpose()
    }

    pub fn key_source(&self) -> AppResult<KeySource> {
        match (&self.key_env, &self.key_file) {
            (Some(var_name), None) => Ok(KeySource::EnvVar {
                var_name: var_name.clone(),
            }),
            (None, Some(path)) => Ok(KeySource::File { path: path.into() }),
            (Some(_), Some(_)) => Err(AppError::Config(
                "key_env and key_file are mutually exclusive".to_string(),
            )),
            (None, None) => Err(AppError::Config(
                "one of key_env or key_file is required".to_string(),
            )),
        }
    }
}

impl ChainSection {
    pub fn oracle_address(&self) -> AppResult<Address> {
        self.oracle_address
            .parse()
            .map_err(|err| AppError::Config(format!("invalid oracle_address: {err}")))
    }

    pub fn reference_hash(&self) -> AppResult<ReferenceHash> {
        self.reference_hash
            .parse()
            .map_err(|err| AppError::Config(format!("invalid reference_hash: {err}")))
    }
}

/// Report throttling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    /// Minimum interval between reports (ms). Reporting requires strictly
    /// more than this to have elapsed.
    #[serde(default = "default_report_interval_ms")]
    pub interval_ms: u64,
}

fn default_report_interval_ms() -> u64 {
    30_000
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            interval_ms: default_report_interval_ms(),
        }
    }
}

impl ReportSection {
    pub fn throttle(&self) -> ReportThrottle {
        ReportThrottle::new(Duration::from_millis(self.interval_ms))
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read {path}: {err}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|err| AppError::Config(format!("failed to parse {path}: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check fields that must parse before the application starts.
    pub fn validate(&self) -> AppResult<()> {
        if self.feed.symbol.trim().is_empty() {
            return Err(AppError::Config("feed.symbol must not be empty".to_string()));
        }
        self.chain.oracle_address()?;
        self.chain.requester.address()?;
        self.chain.requester.key_source()?;
        self.chain.reporter.address()?;
        self.chain.reporter.key_source()?;
        self.chain.reference_hash()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [feed]
        url = "wss://stream.binance.com:9443/ws"
        symbol = "btcusdt"

        [chain]
        url = "ws://127.0.0.1:9944"
        oracle_address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        reference_hash = "0x11f41ca0ae166f08ae0e1059696c5e8161b0ab072ef7950c01d9440ff90c7ed5"

        [chain.requester]
        key_env = "ORACLE_BRIDGE_REQUESTER_KEY"

        [chain.reporter]
        address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        key_env = "ORACLE_BRIDGE_REPORTER_KEY"

        [report]
        interval_ms = 30000
    "#;

    #[test]
    fn test_parse_sample_config() {
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();
        config.validate().unwrap();
        assert_eq!(config.feed.symbol, "btcusdt");
        assert_eq!(config.feed.max_reconnect_attempts, 5);
        assert_eq!(config.report.interval_ms, 30_000);
        assert!(matches!(
            config.chain.requester.key_source().unwrap(),
            KeySource::EnvVar { .. }
        ));
        assert!(config.chain.requester.address().unwrap().is_none());
        assert_eq!(
            config.chain.reporter.address().unwrap(),
            Some(config.chain.oracle_address().unwrap())
        );
        config.chain.reference_hash().unwrap();
    }

    #[test]
    fn test_report_section_defaults_when_absent() {
        let without_report = SAMPLE.split("[report]").next().unwrap();
        let config: AppConfig = toml::from_str(without_report).unwrap();
        assert_eq!(config.report.interval_ms, 30_000);
    }

    #[test]
    fn test_rejects_missing_key_source() {
        let mut config: AppConfig = toml::from_str(SAMPLE).unwrap();
        config.chain.reporter.key_env = None;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_rejects_conflicting_key_sources() {
        let mut config: AppConfig = toml::from_str(SAMPLE).unwrap();
        config.chain.requester.key_file = Some("/tmp/key".to_string());
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_reference_hash() {
        let mut config: AppConfig = toml::from_str(SAMPLE).unwrap();
        config.chain.reference_hash = "0x1234".to_string();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }
}
