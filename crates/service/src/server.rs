//! JSON-RPC server exposing an [`Execution`] implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use evm_exec::{CancellationToken, Execution, ExecutionError};
use evm_exec_types::{ChainInit, ExecutedBlock};
use jsonrpsee::core::RpcResult;
use jsonrpsee::server::{ServerBuilder, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;

use crate::api::{
    ExecuteTxsRequest, ExecutionApiServer, GetTxsResponse, InitChainRequest, SetFinalRequest,
    EXECUTE_TXS, GET_TXS, INIT_CHAIN, SET_FINAL,
};
use crate::error::to_rpc_error;

/// Serves the `execution_` namespace on top of an adapter.
///
/// Holds no protocol state; every call runs under a child of the shutdown
/// token, so stopping the service cancels calls still in flight.
pub struct ExecutionRpc<E> {
    execution: Arc<E>,
    shutdown: CancellationToken,
}

impl<E> Clone for ExecutionRpc<E> {
    fn clone(&self) -> Self {
        Self { execution: self.execution.clone(), shutdown: self.shutdown.clone() }
    }
}

impl<E: Execution + 'static> ExecutionRpc<E> {
    /// Wrap an adapter.
    pub const fn new(execution: Arc<E>, shutdown: CancellationToken) -> Self {
        Self { execution, shutdown }
    }
}

fn reject(method: &'static str, err: &ExecutionError) -> ErrorObjectOwned {
    tracing::warn!(method, error = %err, "Execution call failed");
    to_rpc_error(err)
}

#[async_trait]
impl<E: Execution + 'static> ExecutionApiServer for ExecutionRpc<E> {
    async fn init_chain(&self, request: InitChainRequest) -> RpcResult<ChainInit> {
        let cancel = self.shutdown.child_token();
        self.execution
            .init_chain(&cancel, request.genesis_time, request.initial_height, &request.chain_id)
            .await
            .map_err(|e| reject(INIT_CHAIN, &e))
    }

    async fn get_txs(&self) -> RpcResult<GetTxsResponse> {
        let cancel = self.shutdown.child_token();
        let txs = self.execution.get_txs(&cancel).await.map_err(|e| reject(GET_TXS, &e))?;
        Ok(GetTxsResponse { txs })
    }

    async fn execute_txs(&self, request: ExecuteTxsRequest) -> RpcResult<ExecutedBlock> {
        let cancel = self.shutdown.child_token();
        self.execution
            .execute_txs(
                &cancel,
                request.txs,
                request.block_height,
                request.timestamp,
                request.prev_state_root,
            )
            .await
            .map_err(|e| reject(EXECUTE_TXS, &e))
    }

    async fn set_final(&self, request: SetFinalRequest) -> RpcResult<()> {
        let cancel = self.shutdown.child_token();
        self.execution
            .set_final(&cancel, request.block_height)
            .await
            .map_err(|e| reject(SET_FINAL, &e))
    }
}

/// Bind `listen_addr` and start serving `execution`.
///
/// Cancelling `shutdown` cancels in-flight calls; stopping the returned handle
/// closes the listener.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub async fn start_server<E: Execution + 'static>(
    execution: Arc<E>,
    listen_addr: &str,
    shutdown: CancellationToken,
) -> std::io::Result<(SocketAddr, ServerHandle)> {
    let server = ServerBuilder::default().build(listen_addr).await?;
    let addr = server.local_addr()?;

    let rpc = ExecutionRpc::new(execution, shutdown);
    let handle = server.start(rpc.into_rpc());
    tracing::info!(%addr, "Execution service listening");
    Ok((addr, handle))
}
