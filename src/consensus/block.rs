//! Block and header structures
//!
//! The header is an immutable value; its hash is always derived from the
//! canonical 80-byte serialization, never stored as an independent input.
//! A block seals a mined header together with the snapshot payload it
//! commits to.
//!
//! Block life cycle: pending (assembled, no valid nonce) -> mined (proof
//! of work satisfied, hash sealed) -> linked (appended to a chain at a
//! height) -> validated (re-confirmed by a later full-chain pass). There
//! is no transition back; a rewrite replaces the chain wholesale.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::constants::{HEADER_SIZE, MIN_VERSION};
use crate::consensus::CompactBits;
use crate::crypto::{sha256d, Hash};

/// Header codec errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Wrong-length or undecodable header, hash, or payload data.
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

/// Block header containing all metadata
///
/// Canonical wire order: `version | previous_hash | merkle_root |
/// timestamp | bits | nonce`; integers little-endian, hashes in natural
/// byte order; 80 bytes total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Protocol version (floor `MIN_VERSION`)
    pub version: u32,
    /// Hash of the previous block header; all-zero for genesis
    pub previous_hash: Hash,
    /// Merkle root of the snapshot's transaction ids
    pub merkle_root: Hash,
    /// Seconds since the Unix epoch
    pub timestamp: u32,
    /// Compact difficulty target
    pub bits: CompactBits,
    /// Proof-of-work search counter
    pub nonce: u32,
}

impl BlockHeader {
    /// Create a new block header
    pub fn new(
        version: u32,
        previous_hash: Hash,
        merkle_root: Hash,
        timestamp: u32,
        bits: CompactBits,
        nonce: u32,
    ) -> Self {
        Self {
            version,
            previous_hash,
            merkle_root,
            timestamp,
            bits,
            nonce,
        }
    }

    /// Serialize to the canonical 80-byte layout. Pure; the header is
    /// never mutated as a side effect of encoding.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.version.to_le_bytes());
        buf[4..36].copy_from_slice(&self.previous_hash.0);
        buf[36..68].copy_from_slice(&self.merkle_root.0);
        buf[68..72].copy_from_slice(&self.timestamp.to_le_bytes());
        buf[72..76].copy_from_slice(&self.bits.to_consensus().to_le_bytes());
        buf[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        buf
    }

    /// Exact inverse of [`encode`](Self::encode).
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() != HEADER_SIZE {
            return Err(CodecError::MalformedInput(format!(
                "header must be exactly {HEADER_SIZE} bytes, got {}",
                bytes.len()
            )));
        }

        let mut word = [0u8; 4];
        let mut digest = [0u8; 32];

        word.copy_from_slice(&bytes[0..4]);
        let version = u32::from_le_bytes(word);

        digest.copy_from_slice(&bytes[4..36]);
        let previous_hash = Hash::from_bytes(digest);

        digest.copy_from_slice(&bytes[36..68]);
        let merkle_root = Hash::from_bytes(digest);

        word.copy_from_slice(&bytes[68..72]);
        let timestamp = u32::from_le_bytes(word);

        word.copy_from_slice(&bytes[72..76]);
        let bits = CompactBits::from_consensus(u32::from_le_bytes(word));

        word.copy_from_slice(&bytes[76..80]);
        let nonce = u32::from_le_bytes(word);

        Ok(Self {
            version,
            previous_hash,
            merkle_root,
            timestamp,
            bits,
            nonce,
        })
    }

    /// Hex encoding of the canonical layout.
    pub fn to_hex(&self) -> String {
        hex::encode(self.encode())
    }

    /// Parse the hex encoding of the canonical layout.
    pub fn from_hex(hex_str: &str) -> Result<Self, CodecError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| CodecError::MalformedInput(e.to_string()))?;
        Self::decode(&bytes)
    }

    /// Derived header hash: double SHA-256 of the canonical layout.
    pub fn hash(&self) -> Hash {
        sha256d(&self.encode())
    }

    /// Field-level well-formedness beyond what the codec enforces.
    pub fn check_well_formed(&self) -> Result<(), CodecError> {
        if self.version < MIN_VERSION {
            return Err(CodecError::MalformedInput(format!(
                "version 0x{:08x} below the 0x{MIN_VERSION:08x} floor",
                self.version
            )));
        }
        Ok(())
    }
}

/// Current time as a wire timestamp.
pub fn current_timestamp() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

/// A sealed block: a mined header, the payload it commits to, and the
/// hash frozen at sealing time. Validators recompute the hash and treat
/// a mismatch as tampering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Height in the chain; 0 is genesis
    pub height: u64,
    /// Mined header
    pub header: BlockHeader,
    /// Header hash frozen when the block was sealed
    pub block_hash: Hash,
    /// Opaque serialized snapshot data
    pub payload: Vec<u8>,
}

impl Block {
    /// Seal a mined header with its payload. The stored hash is derived
    /// here and nowhere else.
    pub fn seal(height: u64, header: BlockHeader, payload: Vec<u8>) -> Self {
        let block_hash = header.hash();
        Self {
            height,
            header,
            block_hash,
            payload,
        }
    }

    /// Payload length in bytes (derived, not stored).
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Check if this is the genesis block
    pub fn is_genesis(&self) -> bool {
        self.height == 0 && self.header.previous_hash == Hash::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sha256;

    fn sample_header() -> BlockHeader {
        BlockHeader::new(
            MIN_VERSION,
            sha256(b"previous"),
            sha256(b"merkle"),
            1_736_339_922,
            CompactBits::from_consensus(0x1d00ffff),
            42,
        )
    }

    #[test]
    fn test_encode_length_and_field_order() {
        let header = sample_header();
        let bytes = header.encode();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[0..4], &MIN_VERSION.to_le_bytes());
        assert_eq!(&bytes[4..36], header.previous_hash.as_bytes());
        assert_eq!(&bytes[36..68], header.merkle_root.as_bytes());
        assert_eq!(&bytes[68..72], &header.timestamp.to_le_bytes());
        assert_eq!(&bytes[72..76], &0x1d00ffffu32.to_le_bytes());
        assert_eq!(&bytes[76..80], &42u32.to_le_bytes());
    }

    #[test]
    fn test_decode_is_exact_inverse() {
        let header = sample_header();
        let decoded = BlockHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert!(matches!(
            BlockHeader::decode(&[0u8; 79]),
            Err(CodecError::MalformedInput(_))
        ));
        assert!(BlockHeader::decode(&[0u8; 81]).is_err());
    }

    #[test]
    fn test_hex_roundtrip() {
        let header = sample_header();
        let restored = BlockHeader::from_hex(&header.to_hex()).unwrap();
        assert_eq!(restored, header);
    }

    #[test]
    fn test_hash_changes_with_nonce() {
        let mut header = sample_header();
        let before = header.hash();
        header.nonce += 1;
        assert_ne!(before, header.hash());
    }

    #[test]
    fn test_version_floor() {
        let mut header = sample_header();
        assert!(header.check_well_formed().is_ok());
        header.version = MIN_VERSION - 1;
        assert!(header.check_well_formed().is_err());
    }

    #[test]
    fn test_sealed_hash_matches_header() {
        let header = sample_header();
        let block = Block::seal(3, header, b"payload".to_vec());
        assert_eq!(block.block_hash, header.hash());
        assert_eq!(block.size(), 7);
        assert!(!block.is_genesis());
    }

    #[test]
    fn test_genesis_detection() {
        let mut header = sample_header();
        header.previous_hash = Hash::zero();
        let block = Block::seal(0, header, Vec::new());
        assert!(block.is_genesis());
    }
}
