//! Execution client implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use evm_exec_types::{ChainInit, ExecutedBlock, ExecutionConfig, Transaction};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::driver::{cancellable, PayloadDriver};
use crate::forkchoice::ForkchoiceState;
use crate::payload::{payload_attributes, GET_BLOCK_BY_NUMBER, TXPOOL_CONTENT};
use crate::randao::{HeightRandao, RandaoSource};
use crate::rpc::EngineRpc;
use crate::transport::ChainHandle;
use crate::{Execution, ExecutionError, Result};

/// Last block successfully built, used to keep timestamps moving forward.
#[derive(Debug, Clone, Copy)]
struct LastBuild {
    head: B256,
    timestamp: u64,
}

/// Drives one chain on an execution engine via the Engine API.
///
/// `InitChain`, `ExecuteTxs` and `SetFinal` hold a per-client lock for their
/// whole round-trip sequence, so at most one block-production call is in
/// flight. `GetTxs` only reads the pool and is not serialized.
pub struct ExecutionClient<R = ChainHandle> {
    driver: PayloadDriver<R>,

    /// Block every fork-choice points at during `InitChain`.
    genesis_hash: B256,

    /// Fee recipient suggested for every build.
    fee_recipient: Address,

    randao: Box<dyn RandaoSource>,

    /// Serializes block production and remembers the last build.
    production: Mutex<Option<LastBuild>>,

    closed: AtomicBool,
}

impl ExecutionClient<ChainHandle> {
    /// Connect to the engine described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the JWT secret cannot be loaded or either endpoint
    /// is unreachable.
    pub async fn connect(config: &ExecutionConfig) -> Result<Self> {
        let handle = ChainHandle::from_config(config).await?;
        tracing::info!(
            genesis_hash = %config.genesis_hash,
            fee_recipient = %config.fee_recipient,
            "Execution client ready"
        );
        Ok(Self::new(handle, config.genesis_hash, config.fee_recipient))
    }
}

impl<R: EngineRpc> ExecutionClient<R> {
    /// Create a client over an existing engine connection.
    pub fn new(rpc: R, genesis_hash: B256, fee_recipient: Address) -> Self {
        Self {
            driver: PayloadDriver::new(rpc),
            genesis_hash,
            fee_recipient,
            randao: Box::new(HeightRandao),
            production: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Replace the `prevRandao` source used by `ExecuteTxs`.
    #[must_use]
    pub fn with_randao(mut self, randao: impl RandaoSource + 'static) -> Self {
        self.randao = Box::new(randao);
        self
    }

    /// Configured genesis hash.
    pub const fn genesis_hash(&self) -> B256 {
        self.genesis_hash
    }

    /// Configured fee recipient.
    pub const fn fee_recipient(&self) -> Address {
        self.fee_recipient
    }

    /// The payload driver this client delegates to.
    pub const fn driver(&self) -> &PayloadDriver<R> {
        &self.driver
    }

    /// Release the engine connection. Idempotent; later calls fail with
    /// [`ExecutionError::Closed`].
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.driver.rpc().close();
        }
    }

    /// Whether [`Self::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(ExecutionError::Closed);
        }
        Ok(())
    }
}

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[async_trait]
impl<R: EngineRpc> Execution for ExecutionClient<R> {
    async fn init_chain(
        &self,
        cancel: &CancellationToken,
        genesis_time: u64,
        initial_height: u64,
        chain_id: &str,
    ) -> Result<ChainInit> {
        self.ensure_open()?;
        let _guard = self.production.lock().await;

        let timestamp = if genesis_time == 0 { now_secs() } else { genesis_time };
        tracing::info!(
            chain_id,
            initial_height,
            genesis_hash = %self.genesis_hash,
            timestamp,
            "Initializing chain"
        );

        let attributes = payload_attributes(timestamp, B256::ZERO, self.fee_recipient);
        let payload = self
            .driver
            .build_and_fetch(cancel, ForkchoiceState::genesis(self.genesis_hash), attributes)
            .await?;

        let init = ChainInit { state_root: payload.state_root, gas_limit: payload.gas_limit };
        tracing::info!(chain_id, state_root = %init.state_root, gas_limit = init.gas_limit, "Chain initialized");
        Ok(init)
    }

    async fn get_txs(&self, cancel: &CancellationToken) -> Result<Vec<Transaction>> {
        self.ensure_open()?;
        self.driver.rpc().ready()?;

        let content = cancellable(cancel, TXPOOL_CONTENT, || self.driver.rpc().txpool_content())
            .await?
            .map_err(|e| ExecutionError::from_rpc(TXPOOL_CONTENT, e))?;

        let txs = content.into_transactions();
        tracing::debug!(count = txs.len(), "Fetched pool transactions");
        Ok(txs)
    }

    async fn execute_txs(
        &self,
        cancel: &CancellationToken,
        txs: Vec<Transaction>,
        block_height: u64,
        timestamp: u64,
        prev_state_root: B256,
    ) -> Result<ExecutedBlock> {
        self.ensure_open()?;
        let mut last = self.production.lock().await;

        if let Some(prev) = *last {
            if prev.head == prev_state_root && timestamp <= prev.timestamp {
                return Err(ExecutionError::NonMonotonicTimestamp {
                    head: prev_state_root,
                    last: prev.timestamp,
                    timestamp,
                });
            }
        }

        let prev_randao = self.randao.prev_randao(block_height);
        let attributes = payload_attributes(timestamp, prev_randao, self.fee_recipient);
        let mut payload = self
            .driver
            .build_and_fetch(cancel, ForkchoiceState::pinned(prev_state_root), attributes)
            .await?;

        for tx in &txs {
            tracing::trace!(tx_hash = %tx.hash(), len = tx.len(), "Including transaction");
        }
        // The engine built from its own pool; the block carries exactly `txs`.
        payload.transactions = txs.into_iter().map(Transaction::into_bytes).collect();

        let block = ExecutedBlock {
            state_root: payload.state_root,
            gas_used: payload.gas_used,
            block_hash: payload.block_hash,
            block_number: payload.block_number,
        };
        let tx_count = payload.transactions.len();

        self.driver.submit(cancel, payload).await?;
        *last = Some(LastBuild { head: prev_state_root, timestamp });

        tracing::info!(
            block_height,
            block_number = block.block_number,
            block_hash = %block.block_hash,
            state_root = %block.state_root,
            gas_used = block.gas_used,
            tx_count,
            "Executed block"
        );
        Ok(block)
    }

    async fn set_final(&self, cancel: &CancellationToken, block_height: u64) -> Result<()> {
        self.ensure_open()?;
        let _guard = self.production.lock().await;

        self.driver.rpc().ready()?;
        let block_hash = cancellable(cancel, GET_BLOCK_BY_NUMBER, || {
            self.driver.rpc().block_hash_by_number(block_height)
        })
        .await?
        .map_err(|e| ExecutionError::from_rpc(GET_BLOCK_BY_NUMBER, e))?
        .ok_or(ExecutionError::BlockNotFound { height: block_height })?;

        self.driver.finalize(cancel, block_hash).await?;
        tracing::info!(block_height, %block_hash, "Block finalized");
        Ok(())
    }
}
