//! Drives a served adapter through [`RemoteExecution`] over HTTP.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::B256;
use async_trait::async_trait;
use evm_exec::{CancellationToken, EngineStatus, Execution, ExecutionError, Result};
use evm_exec_service::error::{NON_MONOTONIC_TIMESTAMP, PAYLOAD_REJECTED};
use evm_exec_service::{start_server, RemoteExecution};
use evm_exec_types::{ChainInit, ExecutedBlock, Transaction};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    InitChain { genesis_time: u64, initial_height: u64, chain_id: String },
    GetTxs,
    ExecuteTxs { txs: Vec<Transaction>, block_height: u64, timestamp: u64, prev: B256 },
    SetFinal { block_height: u64 },
}

/// In-memory adapter that records calls and rejects blocks with no transactions.
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<Call>>,
}

#[async_trait]
impl Execution for Recorder {
    async fn init_chain(
        &self,
        _cancel: &CancellationToken,
        genesis_time: u64,
        initial_height: u64,
        chain_id: &str,
    ) -> Result<ChainInit> {
        self.calls.lock().unwrap().push(Call::InitChain {
            genesis_time,
            initial_height,
            chain_id: chain_id.to_string(),
        });
        Ok(ChainInit { state_root: B256::repeat_byte(0xab), gas_limit: 30_000_000 })
    }

    async fn get_txs(&self, _cancel: &CancellationToken) -> Result<Vec<Transaction>> {
        self.calls.lock().unwrap().push(Call::GetTxs);
        Ok(vec![Transaction::new(vec![0x02, 0x01]), Transaction::new(vec![0xf8])])
    }

    async fn execute_txs(
        &self,
        _cancel: &CancellationToken,
        txs: Vec<Transaction>,
        block_height: u64,
        timestamp: u64,
        prev_state_root: B256,
    ) -> Result<ExecutedBlock> {
        self.calls.lock().unwrap().push(Call::ExecuteTxs {
            txs: txs.clone(),
            block_height,
            timestamp,
            prev: prev_state_root,
        });
        if txs.is_empty() {
            return Err(ExecutionError::PayloadRejected {
                block_hash: B256::repeat_byte(0xbb),
                status: EngineStatus::Invalid,
                validation_error: Some("bad root".into()),
                latest_valid_hash: None,
            });
        }
        Ok(ExecutedBlock {
            state_root: B256::repeat_byte(0xcd),
            gas_used: 21_000 * txs.len() as u64,
            block_hash: B256::repeat_byte(0xbb),
            block_number: block_height,
        })
    }

    async fn set_final(&self, _cancel: &CancellationToken, block_height: u64) -> Result<()> {
        self.calls.lock().unwrap().push(Call::SetFinal { block_height });
        if block_height == 0 {
            return Err(ExecutionError::NonMonotonicTimestamp {
                head: B256::ZERO,
                last: 1,
                timestamp: 1,
            });
        }
        Ok(())
    }
}

async fn serve() -> (Arc<Recorder>, RemoteExecution, jsonrpsee::server::ServerHandle) {
    let recorder = Arc::new(Recorder::default());
    let (addr, handle) = start_server(recorder.clone(), "127.0.0.1:0", CancellationToken::new())
        .await
        .unwrap();
    let remote = RemoteExecution::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
    (recorder, remote, handle)
}

#[tokio::test]
async fn test_lifecycle_over_the_wire() {
    let (recorder, remote, _handle) = serve().await;
    let cancel = CancellationToken::new();

    let init = remote.init_chain(&cancel, 1_700_000_000, 1, "chain-A").await.unwrap();
    assert_eq!(init, ChainInit { state_root: B256::repeat_byte(0xab), gas_limit: 30_000_000 });

    let txs = remote.get_txs(&cancel).await.unwrap();
    assert_eq!(txs.len(), 2);

    let block = remote
        .execute_txs(&cancel, txs.clone(), 2, 1_700_000_001, init.state_root)
        .await
        .unwrap();
    assert_eq!(block.state_root, B256::repeat_byte(0xcd));
    assert_eq!(block.gas_used, 42_000);
    assert_eq!(block.block_number, 2);

    remote.set_final(&cancel, 2).await.unwrap();

    let calls = recorder.calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            Call::InitChain {
                genesis_time: 1_700_000_000,
                initial_height: 1,
                chain_id: "chain-A".into()
            },
            Call::GetTxs,
            // transaction bytes survive the wire unchanged
            Call::ExecuteTxs {
                txs,
                block_height: 2,
                timestamp: 1_700_000_001,
                prev: B256::repeat_byte(0xab)
            },
            Call::SetFinal { block_height: 2 },
        ]
    );
}

#[tokio::test]
async fn test_rejection_arrives_as_remote_error() {
    let (_recorder, remote, _handle) = serve().await;

    let err = remote
        .execute_txs(&CancellationToken::new(), Vec::new(), 1, 1, B256::ZERO)
        .await
        .unwrap_err();
    match err {
        ExecutionError::Remote { code, message } => {
            assert_eq!(code, PAYLOAD_REJECTED);
            assert!(message.contains("bad root"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = remote.set_final(&CancellationToken::new(), 0).await.unwrap_err();
    assert!(matches!(err, ExecutionError::Remote { code: NON_MONOTONIC_TIMESTAMP, .. }));
}

#[tokio::test]
async fn test_cancelled_call_is_not_sent() {
    let (recorder, remote, _handle) = serve().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = remote.get_txs(&cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(recorder.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_service() {
    let remote = RemoteExecution::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();
    let err = remote.get_txs(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, ExecutionError::Rpc { .. }));
}
