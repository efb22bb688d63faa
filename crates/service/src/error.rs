//! Mapping between adapter errors and JSON-RPC error objects.

use evm_exec::ExecutionError;
use jsonrpsee::core::ClientError;
use jsonrpsee::types::ErrorObjectOwned;

/// Failure without a more specific code (transport errors, closed handle).
pub const INTERNAL_ERROR: i32 = -32000;
/// Engine endpoint unreachable.
pub const CONNECTION_ERROR: i32 = -32001;
/// Engine credential could not be issued.
pub const CREDENTIAL_ERROR: i32 = -32002;
/// Engine response did not match its schema.
pub const MALFORMED_RESPONSE: i32 = -32003;
/// Fork-choice update started no build.
pub const MISSING_PAYLOAD_ID: i32 = -32004;
/// Built payload could not be fetched.
pub const PAYLOAD_FETCH_ERROR: i32 = -32005;
/// Engine rejected the block.
pub const PAYLOAD_REJECTED: i32 = -32006;
/// Engine rejected finalization.
pub const FINALIZATION_REJECTED: i32 = -32007;
/// Call was cancelled.
pub const CANCELLED: i32 = -32008;
/// No block at the requested height.
pub const BLOCK_NOT_FOUND: i32 = -32009;
/// Timestamp did not advance.
pub const NON_MONOTONIC_TIMESTAMP: i32 = -32010;

/// JSON-RPC error code for an adapter error.
#[must_use]
pub const fn error_code(err: &ExecutionError) -> i32 {
    match err {
        ExecutionError::ConnectionFailed { .. } => CONNECTION_ERROR,
        ExecutionError::Credential(_) => CREDENTIAL_ERROR,
        ExecutionError::MalformedResponse { .. } => MALFORMED_RESPONSE,
        ExecutionError::MissingPayloadId { .. } => MISSING_PAYLOAD_ID,
        ExecutionError::PayloadFetch { .. } => PAYLOAD_FETCH_ERROR,
        ExecutionError::PayloadRejected { .. } => PAYLOAD_REJECTED,
        ExecutionError::FinalizationRejected { .. } => FINALIZATION_REJECTED,
        ExecutionError::Cancelled { .. } => CANCELLED,
        ExecutionError::BlockNotFound { .. } => BLOCK_NOT_FOUND,
        ExecutionError::NonMonotonicTimestamp { .. } => NON_MONOTONIC_TIMESTAMP,
        // relayed from another service unchanged
        ExecutionError::Remote { code, .. } => *code,
        ExecutionError::Closed | ExecutionError::Rpc { .. } => INTERNAL_ERROR,
    }
}

/// Convert an adapter error into the object returned to the caller.
#[must_use]
pub fn to_rpc_error(err: &ExecutionError) -> ErrorObjectOwned {
    let message = match err {
        ExecutionError::Remote { message, .. } => message.clone(),
        other => other.to_string(),
    };
    ErrorObjectOwned::owned::<()>(error_code(err), message, None)
}

/// Convert a failed facade call back into an adapter error.
#[must_use]
pub fn from_call_error(method: &'static str, err: ClientError) -> ExecutionError {
    match err {
        ClientError::Call(obj) => {
            ExecutionError::Remote { code: obj.code(), message: obj.message().to_string() }
        }
        ClientError::ParseError(e) => {
            ExecutionError::MalformedResponse { method, reason: e.to_string() }
        }
        source => ExecutionError::Rpc { method, source },
    }
}
