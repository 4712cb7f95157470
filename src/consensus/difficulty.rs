//! Compact difficulty encoding
//!
//! Conversion between the 4-byte compact "bits" form (1 exponent byte,
//! 3 coefficient bytes) and the full 256-bit target, plus the single
//! proof-of-work comparison point.
//!
//! The compact form is a floating-point-like encoding and quantizes the
//! target to 24 significant bits: `bits -> target -> bits` is lossless,
//! `target -> bits -> target` only reproduces the quantized approximation.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::crypto::Hash;

/// Difficulty errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DifficultyError {
    /// Bits not exactly 4 bytes, or bits that decode to a non-positive
    /// or overflowing target.
    #[error("invalid difficulty: {0}")]
    InvalidDifficulty(String),
}

/// Compact 4-byte difficulty encoding.
///
/// Stored as the big-endian interpretation of its 4 bytes, so the familiar
/// `0x1d00ffff` literal reads exponent `0x1d`, coefficient `0x00ffff`.
/// On the header wire it is serialized little-endian like the other
/// integer fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactBits(u32);

impl CompactBits {
    /// Wrap a raw compact value, e.g. `0x1d00ffff`.
    pub const fn from_consensus(value: u32) -> Self {
        CompactBits(value)
    }

    /// Raw compact value.
    pub const fn to_consensus(self) -> u32 {
        self.0
    }

    /// Build from the canonical 4-byte form: exponent byte first.
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        CompactBits(u32::from_be_bytes(bytes))
    }

    /// Canonical 4-byte form: exponent byte first.
    pub fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Parse the 8-character hex form, e.g. `"1d00ffff"`.
    pub fn from_hex(hex: &str) -> Result<Self, DifficultyError> {
        let bytes = hex::decode(hex)
            .map_err(|e| DifficultyError::InvalidDifficulty(e.to_string()))?;
        if bytes.len() != 4 {
            return Err(DifficultyError::InvalidDifficulty(format!(
                "bits must be exactly 4 bytes, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 4];
        arr.copy_from_slice(&bytes);
        Ok(Self::from_bytes(arr))
    }

    /// Hex form of the canonical 4 bytes.
    pub fn to_hex(self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Exponent byte (total significant-byte count of the target).
    pub fn exponent(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// 3-byte coefficient.
    pub fn coefficient(self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Expand to the full 256-bit target:
    /// `target = coefficient * 2^(8 * (exponent - 3))`.
    ///
    /// Rejects coefficients with the sign bit set (they would be misread
    /// as negative in the reference convention), expansions past 256 bits,
    /// and anything that decodes to a zero target.
    pub fn to_target(self) -> Result<Target, DifficultyError> {
        let exponent = self.exponent() as usize;
        let coefficient = self.coefficient();

        if coefficient & 0x0080_0000 != 0 {
            return Err(DifficultyError::InvalidDifficulty(format!(
                "coefficient 0x{coefficient:06x} has the sign bit set"
            )));
        }
        if exponent > 32 {
            return Err(DifficultyError::InvalidDifficulty(format!(
                "exponent {exponent} overflows a 256-bit target"
            )));
        }

        let mut target = [0u8; 32];

        if exponent <= 3 {
            let value = coefficient >> (8 * (3 - exponent));
            target[29] = ((value >> 16) & 0xFF) as u8;
            target[30] = ((value >> 8) & 0xFF) as u8;
            target[31] = (value & 0xFF) as u8;
        } else {
            let start = 32 - exponent;
            target[start] = ((coefficient >> 16) & 0xFF) as u8;
            if start + 1 < 32 {
                target[start + 1] = ((coefficient >> 8) & 0xFF) as u8;
            }
            if start + 2 < 32 {
                target[start + 2] = (coefficient & 0xFF) as u8;
            }
        }

        let target = Target(target);
        if target.is_zero() {
            return Err(DifficultyError::InvalidDifficulty(
                "bits decode to a non-positive target".to_string(),
            ));
        }
        Ok(target)
    }
}

impl fmt::Display for CompactBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Full-precision 256-bit proof-of-work threshold, big-endian bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Target(pub [u8; 32]);

impl Target {
    /// All-zero target (met by no hash).
    pub const fn zero() -> Self {
        Target([0u8; 32])
    }

    /// Wrap big-endian bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Target(bytes)
    }

    /// Big-endian bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse the 64-character big-endian hex form.
    pub fn from_hex(hex_str: &str) -> Result<Self, DifficultyError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| DifficultyError::InvalidDifficulty(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(DifficultyError::InvalidDifficulty(format!(
                "target must be exactly 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Target(arr))
    }

    /// Big-endian hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Quantize to the compact form: strip leading zero bytes, keep the
    /// first 3 significant bytes as coefficient and the significant-byte
    /// count as exponent. If the leading coefficient byte would set the
    /// sign bit, shift right one byte and bump the exponent.
    ///
    /// Total by construction; quantization is defined for every 256-bit
    /// value including zero.
    pub fn to_bits(&self) -> CompactBits {
        let first_nonzero = match self.0.iter().position(|&b| b != 0) {
            Some(i) => i,
            None => return CompactBits(0),
        };

        let mut exponent = (32 - first_nonzero) as u32;

        let mut coefficient: u32 = (self.0[first_nonzero] as u32) << 16;
        if first_nonzero + 1 < 32 {
            coefficient |= (self.0[first_nonzero + 1] as u32) << 8;
        }
        if first_nonzero + 2 < 32 {
            coefficient |= self.0[first_nonzero + 2] as u32;
        }

        if coefficient & 0x0080_0000 != 0 {
            coefficient >>= 8;
            exponent += 1;
        }

        CompactBits((exponent << 24) | coefficient)
    }

    /// Proof-of-work check: the digest, byte-reversed and read as a
    /// big-endian integer, must be strictly less than the target.
    pub fn allows(&self, hash: &Hash) -> bool {
        let pow = hash.pow_bytes();
        for i in 0..32 {
            if pow[i] < self.0[i] {
                return true;
            }
            if pow[i] > self.0[i] {
                return false;
            }
        }
        false // equal is not below target
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
