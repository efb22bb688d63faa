//! `prevRandao` derivation for built blocks.

use alloy_primitives::{B256, U256};

/// Supplies the randomness seed sent with each build request.
///
/// Implementations must be deterministic: the same height always yields the
/// same seed.
pub trait RandaoSource: Send + Sync {
    /// Seed for the block at `block_height`.
    fn prev_randao(&self, block_height: u64) -> B256;
}

/// Uses the block height itself, as a big-endian 32-byte word.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeightRandao;

impl RandaoSource for HeightRandao {
    fn prev_randao(&self, block_height: u64) -> B256 {
        B256::from(U256::from(block_height))
    }
}
