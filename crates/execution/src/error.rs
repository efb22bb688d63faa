//! Execution error types.

use alloy_primitives::B256;
use alloy_rpc_types_engine::PayloadId;
use jsonrpsee::core::ClientError;

use crate::jwt::CredentialError;
use crate::payload::EngineStatus;

/// Errors that can occur in the execution module.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// An endpoint could not be reached or its client could not be built.
    #[error("failed to connect to {endpoint}: {reason}")]
    ConnectionFailed {
        /// Endpoint URL.
        endpoint: String,
        /// Underlying cause.
        reason: String,
    },

    /// Engine credential could not be issued.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Fork-choice update requested a build but returned no payload id.
    #[error("{method} returned no payload id (status {status})")]
    MissingPayloadId {
        /// RPC method name.
        method: &'static str,
        /// Status reported alongside the missing id.
        status: EngineStatus,
    },

    /// Engine response did not match the expected schema.
    #[error("malformed {method} response: {reason}")]
    MalformedResponse {
        /// RPC method name.
        method: &'static str,
        /// Decoder message.
        reason: String,
    },

    /// Fetching a built payload failed.
    #[error("engine_getPayloadV1 failed for payload {payload_id:?}: {source}")]
    PayloadFetch {
        /// The payload id that was requested.
        payload_id: PayloadId,
        /// Transport or decode failure.
        #[source]
        source: ClientError,
    },

    /// Engine rejected a submitted payload.
    #[error("payload {block_hash} rejected with status {status}{}", fmt_validation(.validation_error))]
    PayloadRejected {
        /// Hash of the rejected payload.
        block_hash: B256,
        /// Status reported by the engine.
        status: EngineStatus,
        /// Engine validation message, if any.
        validation_error: Option<String>,
        /// Latest valid ancestor reported by the engine.
        latest_valid_hash: Option<B256>,
    },

    /// Engine rejected a finalization fork-choice update.
    #[error("finalization of {block_hash} rejected with status {status}{}", fmt_validation(.validation_error))]
    FinalizationRejected {
        /// Hash that was being finalized.
        block_hash: B256,
        /// Status reported by the engine.
        status: EngineStatus,
        /// Engine validation message, if any.
        validation_error: Option<String>,
    },

    /// Caller cancelled the operation before the named round trip completed.
    #[error("cancelled during {method}")]
    Cancelled {
        /// RPC method that was aborted or not started.
        method: &'static str,
    },

    /// No block exists at the requested height.
    #[error("block at height {height} not found")]
    BlockNotFound {
        /// Requested height.
        height: u64,
    },

    /// Timestamp does not advance past the last block built on the same head.
    #[error("timestamp {timestamp} is not after {last} for head {head}")]
    NonMonotonicTimestamp {
        /// Fork-choice head being built on.
        head: B256,
        /// Timestamp of the last block built on this head.
        last: u64,
        /// Requested timestamp.
        timestamp: u64,
    },

    /// The chain handle has been closed.
    #[error("chain handle is closed")]
    Closed,

    /// RPC call failed.
    #[error("{method} failed: {source}")]
    Rpc {
        /// RPC method name.
        method: &'static str,
        /// Underlying client error.
        #[source]
        source: ClientError,
    },

    /// Error returned by a remote execution service.
    #[error("remote execution error {code}: {message}")]
    Remote {
        /// JSON-RPC error code.
        code: i32,
        /// Server-provided message.
        message: String,
    },
}

fn fmt_validation(validation_error: &Option<String>) -> String {
    validation_error.as_ref().map(|e| format!(": {e}")).unwrap_or_default()
}

impl ExecutionError {
    /// Classify a failed RPC call, turning decode failures into
    /// [`ExecutionError::MalformedResponse`].
    pub(crate) fn from_rpc(method: &'static str, err: ClientError) -> Self {
        match err {
            ClientError::ParseError(e) => Self::MalformedResponse { method, reason: e.to_string() },
            source => Self::Rpc { method, source },
        }
    }

    /// Whether this error means the caller cancelled the operation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
