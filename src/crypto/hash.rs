//! SHA-256 hashing implementation
//!
//! All digests in LedgerChain are SHA-256 based; headers and Merkle pairs
//! use the double hash. Digests are stored, transmitted, and hex-encoded
//! in natural byte order. Only the proof-of-work comparison reads a digest
//! byte-reversed, as a big-endian integer (see `consensus::difficulty`).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// 32-byte hash output
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// Create a zero hash (used for genesis previous hash)
    pub const fn zero() -> Self {
        Hash([0u8; 32])
    }

    /// Create hash from bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }

    /// Create hash from hex string
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(hex)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Hash(arr))
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get as bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Byte-reversed copy of the digest. Read as a big-endian integer this
    /// is the value the proof-of-work check compares against the target.
    pub fn pow_bytes(&self) -> [u8; 32] {
        let mut rev = self.0;
        rev.reverse();
        rev
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Default for Hash {
    fn default() -> Self {
        Self::zero()
    }
}

/// Hash arbitrary bytes using SHA-256
pub fn sha256(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Hash(hasher.finalize().into())
}

/// Double SHA-256 (hash of the hash), used for header hashes and
/// Merkle pair hashes
pub fn sha256d(data: &[u8]) -> Hash {
    let first = sha256(data);
    sha256(&first.0)
}

/// Hash two digests together (for Merkle tree levels)
pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(&left.0);
    data[32..].copy_from_slice(&right.0);
    sha256d(&data)
}

/// Digest of the empty byte string. Root of an empty snapshot, distinct
/// from the all-zero hash.
pub fn empty_digest() -> Hash {
    sha256(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let data = b"hello world";
        let hash1 = sha256(data);
        let hash2 = sha256(data);
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256(b"hello world").to_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_double_hash_differs_from_single() {
        let data = b"hello";
        assert_ne!(sha256(data), sha256d(data));
        assert_eq!(sha256d(data), sha256(sha256(data).as_bytes()));
    }

    #[test]
    fn test_zero_hash() {
        let zero = Hash::zero();
        assert_eq!(zero.0, [0u8; 32]);
    }

    #[test]
    fn test_hex_roundtrip() {
        let hash = sha256(b"test");
        let hex = hash.to_hex();
        let recovered = Hash::from_hex(&hex).unwrap();
        assert_eq!(hash, recovered);
    }

    #[test]
    fn test_from_hex_rejects_wrong_length() {
        assert!(Hash::from_hex("abcd").is_err());
        assert!(Hash::from_hex(&"00".repeat(33)).is_err());
    }

    #[test]
    fn test_hash_pair_order_matters() {
        let left = sha256(b"left");
        let right = sha256(b"right");
        assert_ne!(hash_pair(&left, &right), hash_pair(&right, &left));
    }

    #[test]
    fn test_pow_bytes_reverses() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xab;
        bytes[31] = 0xcd;
        let hash = Hash::from_bytes(bytes);
        let pow = hash.pow_bytes();
        assert_eq!(pow[0], 0xcd);
        assert_eq!(pow[31], 0xab);
    }

    #[test]
    fn test_empty_digest_is_sha256_of_nothing() {
        assert_eq!(
            empty_digest().to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
