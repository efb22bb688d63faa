//! Core types for the EVM execution adapter.
//!
//! This crate provides the value types shared by the in-process adapter and the
//! remote service facade.

#![warn(missing_docs)]

mod block;
mod config;
mod transaction;

pub use block::{ChainInit, ExecutedBlock};
pub use config::{ConfigError, ExecutionConfig, NodeConfig, ServiceConfig};
pub use transaction::{Transaction, TransactionHash};
