//! Forkchoice state management.

use alloy_primitives::B256;
use alloy_rpc_types_engine::ForkchoiceState as EngineForkchoiceState;

/// The three block-hash pointers sent with every fork-choice update.
///
/// The adapter never re-orgs, so all constructors here pin the three pointers
/// to the same hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForkchoiceState {
    /// Head block hash.
    pub head: B256,

    /// Safe block hash.
    pub safe: B256,

    /// Finalized block hash.
    pub finalized: B256,
}

impl ForkchoiceState {
    /// Forkchoice state with head, safe and finalized all at `block_hash`.
    #[must_use]
    pub const fn pinned(block_hash: B256) -> Self {
        Self { head: block_hash, safe: block_hash, finalized: block_hash }
    }

    /// Forkchoice state at genesis.
    #[must_use]
    pub const fn genesis(genesis_hash: B256) -> Self {
        Self::pinned(genesis_hash)
    }
}

impl From<ForkchoiceState> for EngineForkchoiceState {
    fn from(state: ForkchoiceState) -> Self {
        Self {
            head_block_hash: state.head,
            safe_block_hash: state.safe,
            finalized_block_hash: state.finalized,
        }
    }
}
