//! Transaction types.

use alloy_primitives::{keccak256, Bytes, B256};
use serde::{Deserialize, Serialize};

/// Hash of a transaction.
pub type TransactionHash = B256;

/// A transaction to be included in a block.
///
/// Transactions are opaque bytes - the execution engine interprets them. The
/// adapter never inspects or re-encodes them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transaction {
    /// Raw transaction bytes (EIP-2718 encoded).
    data: Bytes,
}

impl Transaction {
    /// Create a new transaction from raw bytes.
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Get the raw transaction bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume and return the raw bytes.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// Length of the transaction data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if transaction data is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Compute the transaction hash (keccak256).
    #[must_use]
    pub fn hash(&self) -> TransactionHash {
        keccak256(&self.data)
    }
}

impl From<Bytes> for Transaction {
    fn from(data: Bytes) -> Self {
        Self { data }
    }
}

impl From<Vec<u8>> for Transaction {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}
