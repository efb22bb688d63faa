//! Configuration types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// Top-level node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Execution engine configuration.
    pub execution: ExecutionConfig,

    /// Service facade configuration.
    #[serde(default)]
    pub service: ServiceConfig,
}

/// Execution engine configuration.
///
/// Everything here is fixed at construction time; there is no runtime
/// reconfiguration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Engine API URL (authenticated).
    pub engine_url: String,

    /// Standard JSON-RPC URL used for chain queries.
    pub eth_url: String,

    /// Hash of the genesis block the chain starts from.
    pub genesis_hash: B256,

    /// Fee recipient for built blocks.
    pub fee_recipient: Address,

    /// Path to the hex-encoded JWT secret shared with the engine.
    pub jwt_secret_path: PathBuf,

    /// Lifetime of an issued engine token in seconds.
    #[serde(default = "default_token_validity_secs")]
    pub token_validity_secs: u64,

    /// Tokens are re-issued once they are this close to expiry.
    #[serde(default = "default_token_renewal_margin_secs")]
    pub token_renewal_margin_secs: u64,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_token_validity_secs() -> u64 {
    3600
}

fn default_token_renewal_margin_secs() -> u64 {
    60
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl ExecutionConfig {
    /// Token lifetime as a [`Duration`].
    #[must_use]
    pub fn token_validity(&self) -> Duration {
        Duration::from_secs(self.token_validity_secs)
    }

    /// Token renewal margin as a [`Duration`].
    #[must_use]
    pub fn token_renewal_margin(&self) -> Duration {
        Duration::from_secs(self.token_renewal_margin_secs)
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Service facade configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Address the JSON-RPC facade listens on (host:port).
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_listen_addr() -> String {
    "127.0.0.1:40041".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { listen_addr: default_listen_addr() }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.execution.engine_url.is_empty() {
            return Err(ConfigError::Invalid("execution.engine_url is required".into()));
        }
        if self.execution.eth_url.is_empty() {
            return Err(ConfigError::Invalid("execution.eth_url is required".into()));
        }
        if self.execution.genesis_hash.is_zero() {
            return Err(ConfigError::Invalid("execution.genesis_hash must be non-zero".into()));
        }
        if self.execution.token_renewal_margin_secs >= self.execution.token_validity_secs {
            return Err(ConfigError::Invalid(
                "execution.token_renewal_margin_secs must be below token_validity_secs".into(),
            ));
        }
        if self.service.listen_addr.is_empty() {
            return Err(ConfigError::Invalid("service.listen_addr is required".into()));
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error in config file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SAMPLE: &str = r#"
[execution]
engine_url = "http://localhost:8551"
eth_url = "http://localhost:8545"
genesis_hash = "0x0101010101010101010101010101010101010101010101010101010101010101"
fee_recipient = "0x000000000000000000000000000000000000fee0"
jwt_secret_path = "jwt.hex"
"#;

    #[test]
    fn test_load_applies_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = NodeConfig::load(file.path()).unwrap();
        assert_eq!(config.execution.token_validity_secs, 3600);
        assert_eq!(config.execution.token_renewal_margin_secs, 60);
        assert_eq!(config.execution.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.service.listen_addr, "127.0.0.1:40041");
        assert_eq!(config.execution.genesis_hash, B256::repeat_byte(0x01));
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_genesis() {
        let mut config: NodeConfig = toml::from_str(SAMPLE).unwrap();
        config.execution.genesis_hash = B256::ZERO;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("genesis_hash"));
    }

    #[test]
    fn test_validate_rejects_margin_beyond_validity() {
        let mut config: NodeConfig = toml::from_str(SAMPLE).unwrap();
        config.execution.token_renewal_margin_secs = 3600;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = NodeConfig::load(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
