//! Chain state management
//!
//! Tracks the in-memory chain: the ordered blocks, the tip hash, and the
//! active difficulty for the next block. Appending is single-writer:
//! concurrent miners share one `Arc<Mutex<ChainState>>` so two of them
//! cannot both land a block at the same height. Durable storage is the
//! external collaborator's job; it receives sealed blocks and whole
//! chains through the encoding in `storage::codec`.

use crate::consensus::{
    validate_block_at, validate_chain, Block, ChainError, CompactBits,
};
use crate::crypto::Hash;

/// Complete chain state
#[derive(Debug, Clone)]
pub struct ChainState {
    /// Blocks ordered by height, starting at genesis
    blocks: Vec<Block>,
    /// Hash of the current tip
    tip_hash: Hash,
    /// Difficulty the next block must be mined against
    bits: CompactBits,
}

impl ChainState {
    /// Create a new chain state from a mined genesis block.
    ///
    /// The genesis block is validated like any other: height 0, zero
    /// previous hash, proof of work for its own bits.
    pub fn new(genesis: Block) -> Result<Self, ChainError> {
        validate_block_at(&genesis, 0, &Hash::zero())?;
        let bits = genesis.header.bits;
        let tip_hash = genesis.block_hash;
        Ok(Self {
            blocks: vec![genesis],
            tip_hash,
            bits,
        })
    }

    /// Current block height (genesis is 0).
    pub fn height(&self) -> u64 {
        (self.blocks.len() - 1) as u64
    }

    /// Hash of the current tip
    pub fn tip_hash(&self) -> Hash {
        self.tip_hash
    }

    /// Difficulty for the next block to be mined.
    pub fn next_bits(&self) -> CompactBits {
        self.bits
    }

    /// All blocks in height order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Block at the given height, if present.
    pub fn block_at(&self, height: u64) -> Option<&Block> {
        self.blocks.get(height as usize)
    }

    /// Append a freshly mined block.
    ///
    /// The block is fully validated against the current tip before it is
    /// accepted; a block mined against a stale tip fails with
    /// `ChainLinkMismatch` and is discarded. Returns the new height.
    pub fn append(&mut self, block: Block) -> Result<u64, ChainError> {
        let next_height = self.blocks.len() as u64;
        validate_block_at(&block, next_height, &self.tip_hash)?;

        self.tip_hash = block.block_hash;
        self.blocks.push(block);
        Ok(next_height)
    }

    /// Longest valid chain wins, evaluated locally.
    ///
    /// The candidate chain is validated end to end and adopted only when
    /// it is strictly longer than the current one. Blocks are never
    /// mutated in place; adoption replaces the chain wholesale. Returns
    /// whether the candidate was adopted.
    pub fn reconcile(&mut self, candidate: Vec<Block>) -> Result<bool, ChainError> {
        validate_chain(&candidate)?;

        if candidate.len() <= self.blocks.len() {
            return Ok(false);
        }

        // Candidate is non-empty here: strictly longer than a chain that
        // always holds at least genesis.
        self.tip_hash = candidate[candidate.len() - 1].block_hash;
        self.bits = candidate[candidate.len() - 1].header.bits;
        self.blocks = candidate;
        Ok(true)
    }

    /// Get statistics about the chain state
    pub fn stats(&self) -> ChainStats {
        ChainStats {
            height: self.height(),
            tip_hash: self.tip_hash,
            block_count: self.blocks.len() as u64,
            total_payload_bytes: self.blocks.iter().map(|b| b.size() as u64).sum(),
            bits: self.bits,
        }
    }
}

/// Statistics about the chain state
#[derive(Debug, Clone)]
pub struct ChainStats {
    pub height: u64,
    pub tip_hash: Hash,
    pub block_count: u64,
    pub total_payload_bytes: u64,
    pub bits: CompactBits,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::BlockHeader;
    use crate::constants::DEFAULT_VERSION;
    use crate::ledger::{JournalEntry, LedgerSnapshot};
    use crate::mining::Miner;

    fn easy_bits() -> CompactBits {
        CompactBits::from_consensus(0x207fffff)
    }

    fn snapshot(tag: &str) -> LedgerSnapshot {
        LedgerSnapshot::new(vec![JournalEntry::new("2026-02-10", tag.to_string(), 9_900)])
    }

    fn mined_block(height: u64, previous: Hash, tag: &str) -> Block {
        let snap = snapshot(tag);
        let header = BlockHeader::new(
            DEFAULT_VERSION,
            previous,
            snap.merkle_root(),
            1_736_341_000 + height as u32,
            easy_bits(),
            0,
        );
        let target = easy_bits().to_target().unwrap();
        let mined = Miner::new().mine_header(header, &target, None).unwrap();
        Block::seal(height, mined, snap.to_payload())
    }

    fn genesis_state() -> ChainState {
        ChainState::new(mined_block(0, Hash::zero(), "genesis")).unwrap()
    }

    #[test]
    fn test_genesis_initialization() {
        let state = genesis_state();
        assert_eq!(state.height(), 0);
        assert_eq!(state.tip_hash(), state.blocks()[0].block_hash);
        assert_eq!(state.next_bits(), easy_bits());
    }

    #[test]
    fn test_append_advances_tip() {
        let mut state = genesis_state();
        let block = mined_block(1, state.tip_hash(), "first");
        let hash = block.block_hash;

        assert_eq!(state.append(block).unwrap(), 1);
        assert_eq!(state.height(), 1);
        assert_eq!(state.tip_hash(), hash);
    }

    #[test]
    fn test_append_rejects_stale_tip() {
        let mut state = genesis_state();
        let stale = mined_block(1, Hash::zero(), "stale");
        assert_eq!(
            state.append(stale).unwrap_err(),
            ChainError::ChainLinkMismatch { height: 1 }
        );
        assert_eq!(state.height(), 0);
    }

    #[test]
    fn test_reconcile_adopts_strictly_longer_chain() {
        let mut state = genesis_state();

        let other_genesis = mined_block(0, Hash::zero(), "other genesis");
        let other_second = mined_block(1, other_genesis.block_hash, "other first");
        let tip = other_second.block_hash;

        let adopted = state
            .reconcile(vec![other_genesis, other_second])
            .unwrap();
        assert!(adopted);
        assert_eq!(state.height(), 1);
        assert_eq!(state.tip_hash(), tip);
    }

    #[test]
    fn test_reconcile_keeps_chain_on_equal_length() {
        let mut state = genesis_state();
        let original_tip = state.tip_hash();

        let rival = mined_block(0, Hash::zero(), "rival genesis");
        assert!(!state.reconcile(vec![rival]).unwrap());
        assert_eq!(state.tip_hash(), original_tip);
    }

    #[test]
    fn test_reconcile_rejects_invalid_candidate() {
        let mut state = genesis_state();

        let other_genesis = mined_block(0, Hash::zero(), "other genesis");
        let mut broken = mined_block(1, other_genesis.block_hash, "broken");
        broken.header.nonce ^= 0xffff;

        let err = state
            .reconcile(vec![other_genesis, broken])
            .unwrap_err();
        assert_eq!(err.height(), 1);
        assert_eq!(state.height(), 0);
    }

    #[test]
    fn test_stats() {
        let mut state = genesis_state();
        let block = mined_block(1, state.tip_hash(), "first");
        let payload_len = block.size() as u64;
        state.append(block).unwrap();

        let stats = state.stats();
        assert_eq!(stats.height, 1);
        assert_eq!(stats.block_count, 2);
        assert!(stats.total_payload_bytes >= payload_len);
    }
}
