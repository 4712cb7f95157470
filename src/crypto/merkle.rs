//! Merkle root computation
//!
//! Summarizes the ordered transaction ids of a snapshot into one digest.
//! Conventions, applied uniformly:
//! - empty input: digest of the empty byte string (`empty_digest`)
//! - single input: that digest unchanged, no extra hashing pass
//! - otherwise: duplicate-last padding to even length, then pairwise
//!   `sha256d(left || right)` until one node remains

use super::{empty_digest, hash_pair, Hash};

/// Compute the merkle root of an ordered list of transaction ids.
///
/// The root depends on the order of the ids; reordering changes it.
pub fn compute_merkle_root(txids: &[Hash]) -> Hash {
    if txids.is_empty() {
        return empty_digest();
    }

    if txids.len() == 1 {
        return txids[0];
    }

    let mut current_level: Vec<Hash> = txids.to_vec();

    while current_level.len() > 1 {
        // If odd number, duplicate last
        if current_level.len() % 2 == 1 {
            current_level.push(*current_level.last().unwrap());
        }

        let mut next_level = Vec::with_capacity(current_level.len() / 2);

        for chunk in current_level.chunks(2) {
            next_level.push(hash_pair(&chunk[0], &chunk[1]));
        }

        current_level = next_level;
    }

    current_level[0]
}

/// Boundary helper for collaborators that supply transaction ids as
/// 64-character hex strings. Rejects ids that do not decode to exactly
/// 32 bytes.
pub fn merkle_root_from_hex<S: AsRef<str>>(txids: &[S]) -> Result<Hash, hex::FromHexError> {
    let mut leaves = Vec::with_capacity(txids.len());
    for txid in txids {
        leaves.push(Hash::from_hex(txid.as_ref())?);
    }
    Ok(compute_merkle_root(&leaves))
}
