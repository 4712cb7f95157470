//! Whole-chain handoff encoding
//!
//! The persistence collaborator and the reconcile endpoint exchange whole
//! chains as one bincode blob. Blocks are append-only; a chain rewrite
//! ships a full replacement through this codec rather than mutating
//! stored blocks.

use crate::consensus::Block;

/// Serialize an ordered chain for handoff.
pub fn encode_chain(blocks: &[Block]) -> Vec<u8> {
    bincode::serialize(blocks).expect("blocks serialize with bincode")
}

/// Decode a chain received from a collaborator. The result still has to
/// pass `validate_chain` before anyone trusts it.
pub fn decode_chain(bytes: &[u8]) -> Result<Vec<Block>, bincode::Error> {
    bincode::deserialize(bytes)
}
