//! Block and chain validation
//!
//! Pure functions that verify structural and proof-of-work integrity of a
//! stored chain. The walk is linear, early-exits on the first failure, and
//! every error names the offending height; no block is silently skipped.

use thiserror::Error;

use crate::consensus::Block;
use crate::crypto::Hash;
use crate::ledger::LedgerSnapshot;

/// Chain validation errors. Each variant carries the height of the block
/// that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Undecodable header/payload data, a non-contiguous height, a stored
    /// hash that fails recomputation, or a merkle root the payload does
    /// not reproduce.
    #[error("block {height}: malformed input: {detail}")]
    MalformedInput { height: u64, detail: String },

    /// Previous-hash discontinuity.
    #[error("block {height}: previous hash does not link to the chain")]
    ChainLinkMismatch { height: u64 },

    /// Header hash does not satisfy the block's own target.
    #[error("block {height}: proof of work not satisfied")]
    ProofOfWorkFailure { height: u64 },

    /// Bits that do not expand to a usable target.
    #[error("block {height}: invalid difficulty: {detail}")]
    InvalidDifficulty { height: u64, detail: String },
}

impl ChainError {
    /// Height of the offending block.
    pub fn height(&self) -> u64 {
        match self {
            Self::MalformedInput { height, .. }
            | Self::ChainLinkMismatch { height }
            | Self::ProofOfWorkFailure { height }
            | Self::InvalidDifficulty { height, .. } => *height,
        }
    }
}

/// Validate one block against the position it claims in the chain.
///
/// `expected_previous` is the predecessor's block hash, or the zero digest
/// for genesis. Used both by the full-chain walk and by
/// `ChainState::append` when linking a freshly mined block.
pub fn validate_block_at(
    block: &Block,
    height: u64,
    expected_previous: &Hash,
) -> Result<(), ChainError> {
    let malformed = |detail: String| ChainError::MalformedInput { height, detail };

    if block.height != height {
        return Err(malformed(format!(
            "height {} where {height} was expected",
            block.height
        )));
    }

    block
        .header
        .check_well_formed()
        .map_err(|e| malformed(e.to_string()))?;

    if block.header.previous_hash != *expected_previous {
        return Err(ChainError::ChainLinkMismatch { height });
    }

    // Tamper check: the sealed hash must be reproducible from the header.
    let recomputed = block.header.hash();
    if recomputed != block.block_hash {
        return Err(malformed(format!(
            "stored block hash {} does not match recomputed {recomputed}",
            block.block_hash
        )));
    }

    // Payload binding: the committed merkle root must be re-derivable
    // from the snapshot the payload decodes to.
    let snapshot =
        LedgerSnapshot::from_payload(&block.payload).map_err(|e| malformed(e.to_string()))?;
    if snapshot.merkle_root() != block.header.merkle_root {
        return Err(malformed(
            "merkle root not reproduced by the payload".to_string(),
        ));
    }

    let target = block
        .header
        .bits
        .to_target()
        .map_err(|e| ChainError::InvalidDifficulty {
            height,
            detail: e.to_string(),
        })?;

    if !target.allows(&block.block_hash) {
        return Err(ChainError::ProofOfWorkFailure { height });
    }

    Ok(())
}

/// Validate a whole chain in ascending height order.
///
/// Heights must be contiguous from 0, every block must link to its
/// predecessor's hash (genesis to the zero digest), and every header must
/// satisfy the proof-of-work inequality for its own bits. An empty chain
/// is vacuously valid.
pub fn validate_chain(blocks: &[Block]) -> Result<(), ChainError> {
    let mut expected_previous = Hash::zero();

    for (index, block) in blocks.iter().enumerate() {
        validate_block_at(block, index as u64, &expected_previous)?;
        expected_previous = block.block_hash;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{BlockHeader, CompactBits};
    use crate::constants::DEFAULT_VERSION;
    use crate::crypto::sha256;
    use crate::ledger::JournalEntry;
    use crate::mining::Miner;

    /// Bits whose target roughly half of all digests satisfy; test blocks
    /// mine in a couple of iterations.
    fn easy_bits() -> CompactBits {
        CompactBits::from_consensus(0x207fffff)
    }

    fn snapshot(tag: &str) -> LedgerSnapshot {
        LedgerSnapshot::new(vec![
            JournalEntry::new("2026-02-01", format!("{tag} debit"), 1_500),
            JournalEntry::new("2026-02-02", format!("{tag} credit"), 2_500),
        ])
    }

    fn mined_block(height: u64, previous: Hash, tag: &str) -> Block {
        let snap = snapshot(tag);
        let header = BlockHeader::new(
            DEFAULT_VERSION,
            previous,
            snap.merkle_root(),
            1_736_340_000 + height as u32,
            easy_bits(),
            0,
        );
        let target = easy_bits().to_target().unwrap();
        let mined = Miner::new().mine_header(header, &target, None).unwrap();
        Block::seal(height, mined, snap.to_payload())
    }

    fn three_block_chain() -> Vec<Block> {
        let genesis = mined_block(0, Hash::zero(), "genesis");
        let second = mined_block(1, genesis.block_hash, "second");
        let third = mined_block(2, second.block_hash, "third");
        vec![genesis, second, third]
    }

    #[test]
    fn test_valid_three_block_chain() {
        assert!(validate_chain(&three_block_chain()).is_ok());
    }

    #[test]
    fn test_empty_chain_is_valid() {
        assert!(validate_chain(&[]).is_ok());
    }

    #[test]
    fn test_tampered_header_fails_at_its_height() {
        let mut chain = three_block_chain();
        chain[1].header.timestamp ^= 1;
        let err = validate_chain(&chain).unwrap_err();
        assert_eq!(err.height(), 1);
        assert!(matches!(err, ChainError::MalformedInput { .. }));

        // Everything before the tampered block still validates.
        assert!(validate_chain(&chain[..1]).is_ok());
    }

    #[test]
    fn test_tampered_payload_fails_at_its_height() {
        let mut chain = three_block_chain();
        let last = chain[2].payload.len() - 2;
        chain[2].payload[last] ^= 0x01;
        let err = validate_chain(&chain).unwrap_err();
        assert_eq!(err.height(), 2);
        assert!(matches!(err, ChainError::MalformedInput { .. }));
        assert!(validate_chain(&chain[..2]).is_ok());
    }

    #[test]
    fn test_broken_link_reports_mismatch_at_height_one() {
        let mut chain = three_block_chain();
        // Re-mine block 1 against a bogus previous hash, then re-link
        // block 2 so only the linkage of block 1 is wrong.
        let bogus = mined_block(1, sha256(b"not the genesis hash"), "second");
        chain[1] = bogus;
        assert_eq!(
            validate_chain(&chain).unwrap_err(),
            ChainError::ChainLinkMismatch { height: 1 }
        );
    }

    #[test]
    fn test_non_contiguous_height_rejected() {
        let mut chain = three_block_chain();
        chain[2].height = 5;
        let err = validate_chain(&chain).unwrap_err();
        assert_eq!(err.height(), 2);
        assert!(matches!(err, ChainError::MalformedInput { .. }));
    }

    #[test]
    fn test_stored_hash_mismatch_is_tampering() {
        let mut chain = three_block_chain();
        chain[0].block_hash = sha256(b"forged");
        let err = validate_chain(&chain).unwrap_err();
        assert_eq!(err.height(), 0);
        assert!(matches!(err, ChainError::MalformedInput { .. }));
    }

    #[test]
    fn test_unsatisfied_pow_detected() {
        // Target of 1: only the all-zero digest would pass, so an unmined
        // header cannot satisfy it.
        let snap = snapshot("genesis");
        let header = BlockHeader::new(
            DEFAULT_VERSION,
            Hash::zero(),
            snap.merkle_root(),
            1_736_340_000,
            CompactBits::from_consensus(0x03000001),
            0,
        );
        let block = Block::seal(0, header, snap.to_payload());
        assert_eq!(
            validate_chain(&[block]).unwrap_err(),
            ChainError::ProofOfWorkFailure { height: 0 }
        );
    }

    #[test]
    fn test_version_floor_enforced() {
        let mut chain = three_block_chain();
        let mut header = chain[0].header;
        header.version = DEFAULT_VERSION - 1;
        let payload = chain[0].payload.clone();
        chain[0] = Block::seal(0, header, payload);
        let err = validate_chain(&chain).unwrap_err();
        assert_eq!(err.height(), 0);
        assert!(matches!(err, ChainError::MalformedInput { .. }));
    }
}
