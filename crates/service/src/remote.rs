//! [`Execution`] over the JSON-RPC facade.

use std::time::Duration;

use alloy_primitives::B256;
use async_trait::async_trait;
use evm_exec::{cancellable, CancellationToken, Execution, ExecutionError, Result};
use evm_exec_types::{ChainInit, ExecutedBlock, Transaction};
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};

use crate::api::{
    ExecuteTxsRequest, ExecutionApiClient, InitChainRequest, SetFinalRequest, EXECUTE_TXS,
    GET_TXS, INIT_CHAIN, SET_FINAL,
};
use crate::error::from_call_error;

/// Drives a chain through a remote execution service.
///
/// Errors reported by the service arrive as [`ExecutionError::Remote`] with
/// the service's code and message.
#[derive(Clone)]
pub struct RemoteExecution {
    client: HttpClient,
    url: String,
}

impl RemoteExecution {
    /// Create a client for the service at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::ConnectionFailed`] if the URL is invalid.
    pub fn new(url: &str, request_timeout: Duration) -> Result<Self> {
        let client = HttpClientBuilder::default().request_timeout(request_timeout).build(url).map_err(
            |e| ExecutionError::ConnectionFailed { endpoint: url.to_string(), reason: e.to_string() },
        )?;
        Ok(Self { client, url: url.to_string() })
    }

    /// Service URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Execution for RemoteExecution {
    async fn init_chain(
        &self,
        cancel: &CancellationToken,
        genesis_time: u64,
        initial_height: u64,
        chain_id: &str,
    ) -> Result<ChainInit> {
        let request =
            InitChainRequest { genesis_time, initial_height, chain_id: chain_id.to_string() };
        cancellable(cancel, INIT_CHAIN, || self.client.init_chain(request))
            .await?
            .map_err(|e| from_call_error(INIT_CHAIN, e))
    }

    async fn get_txs(&self, cancel: &CancellationToken) -> Result<Vec<Transaction>> {
        let response = cancellable(cancel, GET_TXS, || self.client.get_txs())
            .await?
            .map_err(|e| from_call_error(GET_TXS, e))?;
        Ok(response.txs)
    }

    async fn execute_txs(
        &self,
        cancel: &CancellationToken,
        txs: Vec<Transaction>,
        block_height: u64,
        timestamp: u64,
        prev_state_root: B256,
    ) -> Result<ExecutedBlock> {
        let request = ExecuteTxsRequest { txs, block_height, timestamp, prev_state_root };
        cancellable(cancel, EXECUTE_TXS, || self.client.execute_txs(request))
            .await?
            .map_err(|e| from_call_error(EXECUTE_TXS, e))
    }

    async fn set_final(&self, cancel: &CancellationToken, block_height: u64) -> Result<()> {
        cancellable(cancel, SET_FINAL, || self.client.set_final(SetFinalRequest { block_height }))
            .await?
            .map_err(|e| from_call_error(SET_FINAL, e))
    }
}
