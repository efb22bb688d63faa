//! Execution adapter node.
//!
//! Connects to an Ethereum execution engine over the Engine API and serves
//! the block-production lifecycle over JSON-RPC to a chain driver.

#![warn(missing_docs)]

mod cli;
mod config;

use clap::Parser;
use eyre::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    cli.run().await
}
