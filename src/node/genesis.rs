//! Genesis block generation
//!
//! A fresh ledger chain starts from a mined genesis block committing the
//! chain's opening snapshot. Genesis goes through the same assembly and
//! mining path as every later block; only its previous hash (all zeros)
//! and height (0) are special.

use std::time::Instant;

use crate::consensus::{Block, CompactBits, Target};
use crate::constants::DEFAULT_TARGET_HEX;
use crate::crypto::Hash;
use crate::ledger::LedgerSnapshot;
use crate::mining::{MineError, Miner};

/// Bits every new chain starts from: the default target, quantized.
pub fn default_bits() -> CompactBits {
    // The constant is a compile-time-checked 64-char hex string.
    Target::from_hex(DEFAULT_TARGET_HEX)
        .expect("default target constant parses")
        .to_bits()
}

/// Mine the genesis block for a new chain.
pub fn create_genesis_block(
    miner: &Miner,
    snapshot: &LedgerSnapshot,
    bits: CompactBits,
    deadline: Option<Instant>,
) -> Result<Block, MineError> {
    let header = miner.assemble_header_at(Hash::zero(), bits, snapshot)?;
    let target = bits.to_target()?;
    let mined = miner.mine_header(header, &target, deadline)?;
    Ok(Block::seal(0, mined, snapshot.to_payload()))
}

/// Genesis block statistics
#[derive(Debug, Clone)]
pub struct GenesisInfo {
    pub hash: Hash,
    pub merkle_root: Hash,
    pub timestamp: u32,
    pub bits: CompactBits,
    pub entry_count: usize,
}

impl GenesisInfo {
    pub fn from_block(block: &Block) -> Self {
        let entry_count = LedgerSnapshot::from_payload(&block.payload)
            .map(|s| s.len())
            .unwrap_or(0);
        Self {
            hash: block.block_hash,
            merkle_root: block.header.merkle_root,
            timestamp: block.header.timestamp,
            bits: block.header.bits,
            entry_count,
        }
    }
}
