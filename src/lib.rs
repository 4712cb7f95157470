//! LedgerChain Core Library
//!
//! A small proof-of-work block chain used to timestamp accounting-ledger
//! snapshots. Each block commits one journal snapshot: the snapshot's
//! transaction ids are summarized into a Merkle root, the header is mined
//! against the chain's compact difficulty target, and the resulting block
//! links to its predecessor by header hash.
//!
//! The ledger itself (accounts, journals, users) lives in an external
//! collaborator; this crate owns the header codec, difficulty encoding,
//! Merkle computation, mining loop, and chain validation.

pub mod consensus;
pub mod crypto;
pub mod ledger;
pub mod mining;
pub mod node;
pub mod rpc;
pub mod storage;

/// Protocol constants - HARD-CODED, NEVER CONFIGURABLE
pub mod constants {
    /// Lowest header version accepted as well-formed.
    pub const MIN_VERSION: u32 = 0x2000_0000;

    /// Version stamped on newly assembled headers.
    pub const DEFAULT_VERSION: u32 = 0x2000_0000;

    /// Serialized header length in bytes.
    pub const HEADER_SIZE: usize = 80;

    /// Difficulty target activated for new chains, before compact
    /// quantization. Low enough that snapshot mining finishes in seconds
    /// on one core.
    pub const DEFAULT_TARGET_HEX: &str =
        "000ffff000000000000000000000000000000000000000000000000000000000";

    /// Chain name used in banners and RPC info.
    pub const CHAIN_NAME: &str = "LedgerChain";

    /// Default JSON-RPC port.
    pub const DEFAULT_RPC_PORT: u16 = 8645;
}
