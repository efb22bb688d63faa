//! Command-line interface.

use std::path::PathBuf;
use std::sync::Arc;

use alloy_rpc_types_engine::JwtSecret;
use clap::{Parser, Subcommand};
use eyre::{Context, Result};
use evm_exec::{CancellationToken, ExecutionClient};
use tracing::info;

use crate::config;

/// Execution adapter between a chain driver and an Ethereum execution engine.
#[derive(Parser)]
#[command(name = "evm-executor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Connect to the engine and serve the execution API.
    Run {
        /// Path to configuration file.
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },

    /// Initialize a new configuration file.
    Init {
        /// Output path for the config file.
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },

    /// Generate a new Engine API JWT secret.
    Keygen {
        /// Output path for the secret file.
        #[arg(short, long, default_value = "jwt.hex")]
        output: PathBuf,
    },
}

impl Cli {
    /// Log filter requested on the command line.
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<()> {
        match self.command {
            Some(Commands::Run { config }) => Self::run_node(config).await,
            Some(Commands::Init { output }) => Self::init_config(output),
            Some(Commands::Keygen { output }) => Self::generate_secret(output),
            None => Self::run_node(PathBuf::from("config.toml")).await,
        }
    }

    async fn run_node(config: PathBuf) -> Result<()> {
        info!(config = %config.display(), "Loading configuration");
        let cfg = config::load(&config)?;

        let client = ExecutionClient::connect(&cfg.execution)
            .await
            .wrap_err("failed to connect to execution engine")?;
        let client = Arc::new(client);

        let shutdown = CancellationToken::new();
        let (addr, handle) =
            evm_exec_service::start_server(client.clone(), &cfg.service.listen_addr, shutdown.clone())
                .await
                .wrap_err_with(|| format!("failed to bind {}", cfg.service.listen_addr))?;
        info!(%addr, "Execution node running");

        tokio::signal::ctrl_c().await.wrap_err("failed to listen for shutdown signal")?;
        info!("Shutting down");

        shutdown.cancel();
        if handle.stop().is_err() {
            tracing::warn!("RPC server already stopped");
        }
        handle.stopped().await;
        client.close();

        info!("Execution node stopped");
        Ok(())
    }

    fn init_config(output: PathBuf) -> Result<()> {
        info!(path = %output.display(), "Generating default configuration");

        let cfg = config::default_config();
        let toml_str = toml::to_string_pretty(&cfg)?;
        std::fs::write(&output, toml_str)?;

        info!("Configuration written; set execution.genesis_hash before running");
        Ok(())
    }

    fn generate_secret(output: PathBuf) -> Result<()> {
        info!(path = %output.display(), "Generating JWT secret");

        let secret = JwtSecret::random();
        std::fs::write(&output, hex::encode(secret.as_bytes()))?;

        info!(path = %output.display(), "JWT secret written; share it with the execution engine");
        Ok(())
    }
}
