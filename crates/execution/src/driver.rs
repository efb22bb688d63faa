//! Payload protocol driver.
//!
//! Implements the fork-choice -> build -> submit conversation with the engine.
//! Each step is a single round trip; nothing here retries or polls, the caller
//! decides whether to rerun a whole sequence.

use std::future::Future;

use alloy_primitives::B256;
use alloy_rpc_types_engine::{ExecutionPayloadV1, PayloadAttributes, PayloadStatus, PayloadStatusEnum};
use tokio_util::sync::CancellationToken;

use crate::forkchoice::ForkchoiceState;
use crate::payload::{status_parts, EngineStatus, FORKCHOICE_UPDATED_V1, GET_PAYLOAD_V1, NEW_PAYLOAD_V1};
use crate::rpc::EngineRpc;
use crate::{ExecutionError, Result};

/// Run one round trip unless `cancel` fires first.
///
/// A token that is already cancelled never starts the call.
///
/// # Errors
///
/// Returns [`ExecutionError::Cancelled`] naming `method` if `cancel` fires first.
pub async fn cancellable<T, F, Fut>(
    cancel: &CancellationToken,
    method: &'static str,
    call: F,
) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    if cancel.is_cancelled() {
        return Err(ExecutionError::Cancelled { method });
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ExecutionError::Cancelled { method }),
        out = call() => Ok(out),
    }
}

/// Drives block production on an engine.
#[derive(Debug)]
pub struct PayloadDriver<R> {
    rpc: R,
}

impl<R: EngineRpc> PayloadDriver<R> {
    /// Create a driver over an engine connection.
    pub const fn new(rpc: R) -> Self {
        Self { rpc }
    }

    /// The underlying engine connection.
    pub const fn rpc(&self) -> &R {
        &self.rpc
    }

    /// Request a build on top of `fork_choice` and fetch the built payload.
    ///
    /// # Errors
    ///
    /// - [`ExecutionError::MissingPayloadId`] if the engine starts no build.
    /// - [`ExecutionError::PayloadFetch`] if the payload cannot be fetched or decoded.
    /// - [`ExecutionError::Cancelled`] if `cancel` fires before either step completes.
    /// - [`ExecutionError::Closed`] or [`ExecutionError::Credential`] if the
    ///   connection is not ready for a round trip.
    pub async fn build_and_fetch(
        &self,
        cancel: &CancellationToken,
        fork_choice: ForkchoiceState,
        attributes: PayloadAttributes,
    ) -> Result<ExecutionPayloadV1> {
        tracing::debug!(
            head = %fork_choice.head,
            timestamp = attributes.timestamp,
            "Requesting payload build"
        );

        self.rpc.ready()?;
        let updated = cancellable(
            cancel,
            FORKCHOICE_UPDATED_V1,
            || self.rpc.fork_choice_updated_v1(fork_choice.into(), Some(attributes)),
        )
        .await?
        .map_err(|e| ExecutionError::from_rpc(FORKCHOICE_UPDATED_V1, e))?;

        let Some(payload_id) = updated.payload_id else {
            let status = EngineStatus::from(&updated.payload_status.status);
            tracing::warn!(%status, head = %fork_choice.head, "Fork-choice update started no build");
            return Err(ExecutionError::MissingPayloadId { method: FORKCHOICE_UPDATED_V1, status });
        };

        tracing::debug!(?payload_id, "Build started, fetching payload");

        self.rpc.ready()?;
        let payload = cancellable(cancel, GET_PAYLOAD_V1, || self.rpc.get_payload_v1(payload_id))
            .await?
            .map_err(|source| ExecutionError::PayloadFetch { payload_id, source })?;

        tracing::debug!(
            ?payload_id,
            block_number = payload.block_number,
            block_hash = %payload.block_hash,
            "Fetched built payload"
        );
        Ok(payload)
    }

    /// Submit a payload and require a `VALID` verdict.
    ///
    /// # Errors
    ///
    /// - [`ExecutionError::PayloadRejected`] for any status other than `VALID`.
    /// - [`ExecutionError::MalformedResponse`] if the status cannot be decoded.
    /// - [`ExecutionError::Cancelled`] if `cancel` fires first.
    pub async fn submit(
        &self,
        cancel: &CancellationToken,
        payload: ExecutionPayloadV1,
    ) -> Result<PayloadStatus> {
        let block_hash = payload.block_hash;
        tracing::debug!(
            %block_hash,
            block_number = payload.block_number,
            tx_count = payload.transactions.len(),
            "Submitting payload"
        );

        self.rpc.ready()?;
        let status = cancellable(cancel, NEW_PAYLOAD_V1, || self.rpc.new_payload_v1(payload))
            .await?
            .map_err(|e| ExecutionError::from_rpc(NEW_PAYLOAD_V1, e))?;

        if status.status == PayloadStatusEnum::Valid {
            return Ok(status);
        }

        let (status_kind, validation_error) = status_parts(&status);
        tracing::warn!(
            %block_hash,
            status = %status_kind,
            validation_error = ?validation_error,
            "Engine rejected payload"
        );
        Err(ExecutionError::PayloadRejected {
            block_hash,
            status: status_kind,
            validation_error,
            latest_valid_hash: status.latest_valid_hash,
        })
    }

    /// Move head, safe and finalized to `block_hash` without starting a build.
    ///
    /// # Errors
    ///
    /// - [`ExecutionError::FinalizationRejected`] unless the engine reports `VALID`.
    /// - [`ExecutionError::MalformedResponse`] if the response cannot be decoded.
    /// - [`ExecutionError::Cancelled`] if `cancel` fires first.
    pub async fn finalize(&self, cancel: &CancellationToken, block_hash: B256) -> Result<()> {
        tracing::debug!(%block_hash, "Finalizing block");

        self.rpc.ready()?;
        let updated = cancellable(
            cancel,
            FORKCHOICE_UPDATED_V1,
            || self.rpc.fork_choice_updated_v1(ForkchoiceState::pinned(block_hash).into(), None),
        )
        .await?
        .map_err(|e| ExecutionError::from_rpc(FORKCHOICE_UPDATED_V1, e))?;

        let (status, validation_error) = status_parts(&updated.payload_status);
        if status != EngineStatus::Valid {
            tracing::warn!(%block_hash, %status, "Engine rejected finalization");
            return Err(ExecutionError::FinalizationRejected { block_hash, status, validation_error });
        }
        Ok(())
    }
}
