//! Execution adapter driving an Ethereum execution engine via the Engine API.
//!
//! The adapter exposes the block-production lifecycle a chain driver needs
//! ([`Execution`]) and translates each call into the engine's
//! fork-choice / get-payload / new-payload conversation.
//!
//! Block-production calls on one [`ExecutionClient`] are serialized; running
//! several chains concurrently means one client per chain.

#![warn(missing_docs)]

pub mod auth;
mod client;
mod driver;
mod error;
mod forkchoice;
pub mod jwt;
pub mod payload;
mod randao;
mod rpc;
mod transport;

pub use client::ExecutionClient;
pub use driver::{cancellable, PayloadDriver};
pub use error::ExecutionError;
pub use forkchoice::ForkchoiceState;
pub use jwt::{Credential, CredentialError, CredentialProvider, JwtCredentialProvider};
pub use payload::{EngineStatus, TxpoolContent};
pub use randao::{HeightRandao, RandaoSource};
pub use rpc::{EngineRpc, RpcResult};
pub use transport::{ChainHandle, EngineHttpClient, TransportOptions};

pub use tokio_util::sync::CancellationToken;

use alloy_primitives::B256;
use evm_exec_types::{ChainInit, ExecutedBlock, Transaction};

/// Result type for execution operations.
pub type Result<T> = std::result::Result<T, ExecutionError>;

/// Block-production lifecycle consumed by the chain driver.
///
/// Every operation takes a cancellation token; once it fires, no further
/// round trip is issued and [`ExecutionError::Cancelled`] is returned.
/// None of these operations are idempotent and none retry.
#[async_trait::async_trait]
pub trait Execution: Send + Sync {
    /// Initialize the chain on top of the configured genesis block.
    ///
    /// A `genesis_time` of zero means "now".
    ///
    /// # Errors
    ///
    /// Returns an error if the engine does not build a genesis payload.
    async fn init_chain(
        &self,
        cancel: &CancellationToken,
        genesis_time: u64,
        initial_height: u64,
        chain_id: &str,
    ) -> Result<ChainInit>;

    /// Fetch pending and queued transactions from the engine's pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be queried or decoded.
    async fn get_txs(&self, cancel: &CancellationToken) -> Result<Vec<Transaction>>;

    /// Execute `txs` in a new block built on `prev_state_root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the block cannot be built or the engine does not
    /// report it `VALID`.
    async fn execute_txs(
        &self,
        cancel: &CancellationToken,
        txs: Vec<Transaction>,
        block_height: u64,
        timestamp: u64,
        prev_state_root: B256,
    ) -> Result<ExecutedBlock>;

    /// Mark the block at `block_height` final.
    ///
    /// # Errors
    ///
    /// Returns an error if the height is unknown or the engine rejects the update.
    async fn set_final(&self, cancel: &CancellationToken, block_height: u64) -> Result<()>;
}
