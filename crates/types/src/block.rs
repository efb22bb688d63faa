//! Results of the block-production lifecycle.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// Chain parameters reported by the engine at genesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInit {
    /// State root of the first payload built on top of genesis.
    pub state_root: B256,

    /// Gas limit the engine will apply to blocks.
    pub gas_limit: u64,
}

/// A block the engine accepted with status `VALID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutedBlock {
    /// Post-execution state root.
    pub state_root: B256,

    /// Gas used by all transactions.
    pub gas_used: u64,

    /// Engine-computed block hash.
    pub block_hash: B256,

    /// Engine block number.
    pub block_number: u64,
}
