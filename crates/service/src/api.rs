//! `execution_` JSON-RPC namespace and its wire messages.

use alloy_primitives::B256;
use evm_exec_types::{ChainInit, ExecutedBlock, Transaction};
use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;
use serde::{Deserialize, Serialize};

/// `execution_initChain`
pub const INIT_CHAIN: &str = "execution_initChain";
/// `execution_getTxs`
pub const GET_TXS: &str = "execution_getTxs";
/// `execution_executeTxs`
pub const EXECUTE_TXS: &str = "execution_executeTxs";
/// `execution_setFinal`
pub const SET_FINAL: &str = "execution_setFinal";

/// Request for `execution_initChain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitChainRequest {
    /// Genesis time in unix seconds; zero means "now".
    pub genesis_time: u64,

    /// Height of the first block.
    pub initial_height: u64,

    /// Chain identifier, used for logging only.
    pub chain_id: String,
}

/// Response for `execution_getTxs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTxsResponse {
    /// Pool transactions, pending first.
    pub txs: Vec<Transaction>,
}

/// Request for `execution_executeTxs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteTxsRequest {
    /// Transactions to include, in order.
    pub txs: Vec<Transaction>,

    /// Height of the block being built.
    pub block_height: u64,

    /// Block timestamp in unix seconds.
    pub timestamp: u64,

    /// State root the block builds on.
    pub prev_state_root: B256,
}

/// Request for `execution_setFinal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetFinalRequest {
    /// Height of the block to finalize.
    pub block_height: u64,
}

/// Block-production lifecycle exposed over JSON-RPC.
#[rpc(server, client, namespace = "execution")]
pub trait ExecutionApi {
    /// Initialize the chain on top of genesis.
    #[method(name = "initChain")]
    async fn init_chain(&self, request: InitChainRequest) -> RpcResult<ChainInit>;

    /// Pending and queued pool transactions.
    #[method(name = "getTxs")]
    async fn get_txs(&self) -> RpcResult<GetTxsResponse>;

    /// Execute transactions in a new block.
    #[method(name = "executeTxs")]
    async fn execute_txs(&self, request: ExecuteTxsRequest) -> RpcResult<ExecutedBlock>;

    /// Finalize a block by height.
    #[method(name = "setFinal")]
    async fn set_final(&self, request: SetFinalRequest) -> RpcResult<()>;
}
