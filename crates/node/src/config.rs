//! Configuration loading and validation.

use std::path::Path;

use alloy_primitives::{Address, B256};
use eyre::{Context, Result};
use evm_exec_types::{ExecutionConfig, NodeConfig, ServiceConfig};

/// Complete node configuration.
pub type Config = NodeConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load(path: &Path) -> Result<Config> {
    let config = NodeConfig::load(path)
        .wrap_err_with(|| format!("failed to load config file: {}", path.display()))?;
    config.validate().wrap_err("invalid configuration")?;
    Ok(config)
}

/// Generate a default configuration.
///
/// The genesis hash is a placeholder and must be replaced with the engine's
/// actual genesis block hash before running.
#[must_use]
pub fn default_config() -> Config {
    Config {
        execution: ExecutionConfig {
            engine_url: "http://localhost:8551".to_string(),
            eth_url: "http://localhost:8545".to_string(),
            genesis_hash: B256::ZERO,
            fee_recipient: Address::ZERO,
            jwt_secret_path: "jwt.hex".into(),
            token_validity_secs: 3600,
            token_renewal_margin_secs: 60,
            request_timeout_ms: 10_000,
        },
        service: ServiceConfig::default(),
    }
}
