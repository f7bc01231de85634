//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the pool.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the funder's private key.
pub const FUNDER_KEY_ENV_VAR: &str = "PROPOSER_POOL_FUNDER_KEY";

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PoolConfig {
    /// Access API endpoints.
    pub access: AccessConfig,

    /// Pool behaviour and persistence.
    pub pool: PoolSettings,

    /// Funding account.
    pub funder: FunderConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Access API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessConfig {
    /// REST endpoint URL.
    pub rest_url: String,

    /// Failover REST endpoint URLs, tried in order.
    pub failover_urls: Vec<String>,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Interval between status polls while waiting for a seal.
    pub poll_interval_ms: u64,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            rest_url: "http://localhost:8888".to_string(),
            failover_urls: Vec::new(),
            request_timeout_secs: 10,
            poll_interval_ms: 1000,
        }
    }
}

impl AccessConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Pool behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Where the pool is persisted between runs.
    pub pool_file: String,

    /// Delay after every submission in milliseconds.
    pub throttle_interval_ms: u64,

    /// Computation limit attached to every transaction.
    pub fee_limit: u64,

    /// Give up waiting for a seal after this many seconds.
    /// Unset means wait indefinitely.
    pub seal_timeout_secs: Option<u64>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            pool_file: "accounts.json".to_string(),
            throttle_interval_ms: 100,
            fee_limit: 9999,
            seal_timeout_secs: None,
        }
    }
}

/// Funding account. The private key is read from `FUNDER_KEY_ENV_VAR`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FunderConfig {
    /// Account address, `0x`-prefixed hex.
    pub address: String,

    /// Index of the signing key on the account.
    pub key_id: u32,
}

impl Default for FunderConfig {
    fn default() -> Self {
        Self {
            // Emulator service account
            address: "0xf8d6e0586b0a20c7".to_string(),
            key_id: 0,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PoolConfig::default();
        assert_eq!(config.pool.throttle_interval_ms, 100);
        assert_eq!(config.pool.fee_limit, 9999);
        assert!(config.pool.seal_timeout_secs.is_none());
        assert_eq!(config.access.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: PoolConfig = toml::from_str(
            r#"
            [access]
            rest_url = "https://rest-testnet.onflow.org"

            [pool]
            seal_timeout_secs = 120
            "#,
        )
        .unwrap();

        assert_eq!(config.access.rest_url, "https://rest-testnet.onflow.org");
        assert_eq!(config.access.poll_interval_ms, 1000);
        assert_eq!(config.pool.seal_timeout_secs, Some(120));
        assert_eq!(config.pool.pool_file, "accounts.json");
        assert_eq!(config.funder.key_id, 0);
    }
}
