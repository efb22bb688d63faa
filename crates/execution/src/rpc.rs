//! RPC surface the adapter consumes from the execution engine.

use alloy_primitives::B256;
use alloy_rpc_types_engine::{
    ExecutionPayloadV1, ForkchoiceState, ForkchoiceUpdated, PayloadAttributes, PayloadId,
    PayloadStatus,
};
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::payload::TxpoolContent;
use crate::Result;

/// Result of a single RPC round trip.
pub type RpcResult<T> = std::result::Result<T, jsonrpsee::core::ClientError>;

/// Engine block-production calls plus the chain queries the adapter needs.
///
/// Each async method is exactly one round trip. Implementations must be safe
/// to call concurrently. Callers check [`EngineRpc::ready`] before each round
/// trip.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EngineRpc: Send + Sync {
    /// `engine_forkchoiceUpdatedV1`
    async fn fork_choice_updated_v1(
        &self,
        fork_choice_state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
    ) -> RpcResult<ForkchoiceUpdated>;

    /// `engine_getPayloadV1`
    async fn get_payload_v1(&self, payload_id: PayloadId) -> RpcResult<ExecutionPayloadV1>;

    /// `engine_newPayloadV1`
    async fn new_payload_v1(&self, payload: ExecutionPayloadV1) -> RpcResult<PayloadStatus>;

    /// Hash of the canonical block at `number`, `None` if there is none yet.
    async fn block_hash_by_number(&self, number: u64) -> RpcResult<Option<B256>>;

    /// `txpool_content`
    async fn txpool_content(&self) -> RpcResult<TxpoolContent>;

    /// Whether a round trip can be issued now: the connection is open and a
    /// fresh engine credential is available.
    ///
    /// # Errors
    ///
    /// [`crate::ExecutionError::Closed`] after [`EngineRpc::close`] and
    /// [`crate::ExecutionError::Credential`] if the token cannot be renewed.
    fn ready(&self) -> Result<()>;

    /// Stop issuing requests on both channels. Idempotent.
    fn close(&self);
}

/// Mock that is always ready for a round trip.
#[cfg(test)]
pub(crate) fn ready_mock() -> MockEngineRpc {
    let mut rpc = MockEngineRpc::new();
    rpc.expect_ready().returning(|| Ok(()));
    rpc
}
