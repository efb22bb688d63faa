//! Engine and query wire schemas.
//!
//! Every response the adapter reads is decoded into one of these types (or an
//! alloy engine type); a missing or mistyped field is a decode error, never a
//! silently defaulted value.

use std::collections::BTreeMap;
use std::fmt;

use alloy_consensus::{Transaction as _, TxEnvelope};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, B256};
use alloy_rpc_types_engine::{PayloadAttributes, PayloadStatus, PayloadStatusEnum};
use evm_exec_types::Transaction;
use serde::Deserialize;

/// `engine_forkchoiceUpdatedV1`
pub const FORKCHOICE_UPDATED_V1: &str = "engine_forkchoiceUpdatedV1";
/// `engine_getPayloadV1`
pub const GET_PAYLOAD_V1: &str = "engine_getPayloadV1";
/// `engine_newPayloadV1`
pub const NEW_PAYLOAD_V1: &str = "engine_newPayloadV1";
/// `eth_getBlockByNumber`
pub const GET_BLOCK_BY_NUMBER: &str = "eth_getBlockByNumber";
/// `txpool_content`
pub const TXPOOL_CONTENT: &str = "txpool_content";
/// `eth_chainId`
pub const CHAIN_ID: &str = "eth_chainId";

/// Payload status reported by the engine, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    /// Payload is valid.
    Valid,
    /// Payload is invalid.
    Invalid,
    /// Engine is syncing and cannot validate yet.
    Syncing,
    /// Payload accepted but not validated.
    Accepted,
}

impl EngineStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::Invalid => "INVALID",
            Self::Syncing => "SYNCING",
            Self::Accepted => "ACCEPTED",
        }
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&PayloadStatusEnum> for EngineStatus {
    fn from(status: &PayloadStatusEnum) -> Self {
        match status {
            PayloadStatusEnum::Valid => Self::Valid,
            PayloadStatusEnum::Invalid { .. } => Self::Invalid,
            PayloadStatusEnum::Syncing => Self::Syncing,
            PayloadStatusEnum::Accepted => Self::Accepted,
        }
    }
}

/// Split an engine status into its kind and validation message.
pub(crate) fn status_parts(status: &PayloadStatus) -> (EngineStatus, Option<String>) {
    let validation_error = match &status.status {
        PayloadStatusEnum::Invalid { validation_error } => Some(validation_error.clone()),
        _ => None,
    };
    (EngineStatus::from(&status.status), validation_error)
}

/// Attributes for the next block to build (V1: no withdrawals, no beacon root).
#[must_use]
pub fn payload_attributes(
    timestamp: u64,
    prev_randao: B256,
    suggested_fee_recipient: Address,
) -> PayloadAttributes {
    PayloadAttributes {
        timestamp,
        prev_randao,
        suggested_fee_recipient,
        withdrawals: None,
        parent_beacon_block_root: None,
    }
}

/// The part of an `eth_getBlockByNumber` response the adapter needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BlockRef {
    /// Block hash.
    pub hash: B256,
}

/// `txpool_content` response: transactions grouped by sender, then nonce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TxpoolContent {
    /// Executable transactions.
    pub pending: BTreeMap<Address, BTreeMap<String, TxEnvelope>>,

    /// Transactions waiting on a nonce gap.
    pub queued: BTreeMap<Address, BTreeMap<String, TxEnvelope>>,
}

impl TxpoolContent {
    /// Flatten the pool into canonical EIP-2718 encodings.
    ///
    /// All pending transactions come before all queued ones. Within a group,
    /// accounts are ordered by address and each account's transactions by nonce.
    /// This ordering is best-effort, not a protocol guarantee.
    #[must_use]
    pub fn into_transactions(self) -> Vec<Transaction> {
        let Self { pending, queued } = self;
        let mut txs = Vec::new();
        for group in [pending, queued] {
            for account_txs in group.into_values() {
                let mut account_txs: Vec<TxEnvelope> = account_txs.into_values().collect();
                account_txs.sort_by_key(|tx| tx.nonce());
                txs.extend(account_txs.iter().map(|tx| Transaction::new(tx.encoded_2718())));
            }
        }
        txs
    }

    /// Total number of transactions in both groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.values().chain(self.queued.values()).map(BTreeMap::len).sum()
    }

    /// Whether both groups are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}


#[cfg(test)]
mod tests {
    use alloy_primitives::Bytes;

    use super::test_utils::legacy_tx;
    use super::*;

    fn pool() -> TxpoolContent {
        let alice = Address::repeat_byte(0x0a);
        let bob = Address::repeat_byte(0x0b);

        let mut pending = BTreeMap::new();
        // nonce keys are decimal strings, "10" sorts before "9" as text
        pending.insert(
            bob,
            BTreeMap::from([("10".to_string(), legacy_tx(10)), ("9".to_string(), legacy_tx(9))]),
        );
        pending.insert(alice, BTreeMap::from([("0".to_string(), legacy_tx(0))]));

        let mut queued = BTreeMap::new();
        queued.insert(alice, BTreeMap::from([("5".to_string(), legacy_tx(5))]));

        TxpoolContent { pending, queued }
    }

    #[test]
    fn test_flatten_keeps_every_transaction_once() {
        let content = pool();
        assert_eq!(content.len(), 4);

        let txs = content.into_transactions();
        assert_eq!(txs.len(), 4);

        let expected: Vec<Bytes> =
            [0u64, 9, 10, 5].iter().map(|n| legacy_tx(*n).encoded_2718().into()).collect();
        let actual: Vec<Bytes> = txs.into_iter().map(Transaction::into_bytes).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_empty_pool() {
        let content: TxpoolContent =
            serde_json::from_str(r#"{"pending":{},"queued":{}}"#).unwrap();
        assert!(content.is_empty());
        assert!(content.into_transactions().is_empty());
    }

    #[test]
    fn test_pool_requires_both_groups() {
        let result = serde_json::from_str::<TxpoolContent>(r#"{"pending":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_status_parts() {
        let status = PayloadStatus::new(
            PayloadStatusEnum::Invalid { validation_error: "bad root".into() },
            None,
        );
        assert_eq!(status_parts(&status), (EngineStatus::Invalid, Some("bad root".into())));

        let status = PayloadStatus::new(PayloadStatusEnum::Syncing, None);
        assert_eq!(status_parts(&status), (EngineStatus::Syncing, None));
    }

    #[test]
    fn test_block_ref_ignores_other_fields() {
        let json = r#"{"hash":"0x0202020202020202020202020202020202020202020202020202020202020202","number":"0x5"}"#;
        let block: BlockRef = serde_json::from_str(json).unwrap();
        assert_eq!(block.hash, B256::repeat_byte(0x02));
    }

    #[test]
    fn test_v1_attributes_omit_later_fields() {
        let attrs = payload_attributes(1_700_000_000, B256::ZERO, Address::ZERO);
        let json = serde_json::to_value(&attrs).unwrap();
        assert_eq!(json["timestamp"], "0x6553f100");
        assert!(json.get("withdrawals").is_none());
        assert!(json.get("parentBeaconBlockRoot").is_none());
    }
}
