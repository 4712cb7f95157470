//! Journal snapshots committed into blocks
//!
//! The accounting collaborator hands over an ordered list of journal
//! entries; this module derives their transaction ids, builds the
//! canonical JSON payload a block carries, and recovers entries from a
//! stored payload. The payload codec is what lets the chain validator
//! detect payload tampering: every entry's txid is re-derived on decode.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{compute_merkle_root, sha256, Hash};

/// Snapshot codec errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// Undecodable payload, or an entry whose stored txid does not match
    /// its content.
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

/// One general-journal transaction, as the ledger collaborator reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Posting date, ISO-8601
    pub date: String,
    /// Free-form description
    pub description: String,
    /// Balanced transaction total, in cents
    pub total_cents: i64,
}

impl JournalEntry {
    pub fn new(date: impl Into<String>, description: impl Into<String>, total_cents: i64) -> Self {
        Self {
            date: date.into(),
            description: description.into(),
            total_cents,
        }
    }

    /// Transaction id: SHA-256 of the entry's canonical JSON form.
    pub fn txid(&self) -> Hash {
        let serialized =
            serde_json::to_vec(self).expect("journal entry serializes to JSON");
        sha256(&serialized)
    }
}

/// Stored payload record for one entry.
#[derive(Debug, Serialize, Deserialize)]
struct PayloadEntry {
    txid: String,
    date: String,
    description: String,
    value: i64,
}

/// Stored payload shape: `{"transactions": [...]}`.
#[derive(Debug, Serialize, Deserialize)]
struct Payload {
    transactions: Vec<PayloadEntry>,
}

/// An ordered set of journal entries headed for one block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LedgerSnapshot {
    entries: Vec<JournalEntry>,
}

impl LedgerSnapshot {
    pub fn new(entries: Vec<JournalEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Transaction ids in snapshot order.
    pub fn txids(&self) -> Vec<Hash> {
        self.entries.iter().map(|e| e.txid()).collect()
    }

    /// Merkle root over the snapshot's transaction ids.
    pub fn merkle_root(&self) -> Hash {
        compute_merkle_root(&self.txids())
    }

    /// Serialize to the canonical JSON payload a block carries.
    pub fn to_payload(&self) -> Vec<u8> {
        let payload = Payload {
            transactions: self
                .entries
                .iter()
                .map(|e| PayloadEntry {
                    txid: e.txid().to_hex(),
                    date: e.date.clone(),
                    description: e.description.clone(),
                    value: e.total_cents,
                })
                .collect(),
        };
        serde_json::to_vec(&payload).expect("snapshot serializes to JSON")
    }

    /// Recover a snapshot from a stored payload, re-deriving every txid.
    /// A stored txid that does not match its entry's content is tampering.
    pub fn from_payload(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let payload: Payload = serde_json::from_slice(bytes)
            .map_err(|e| SnapshotError::MalformedInput(format!("payload: {e}")))?;

        let mut entries = Vec::with_capacity(payload.transactions.len());
        for record in payload.transactions {
            let entry = JournalEntry::new(record.date, record.description, record.value);
            let derived = entry.txid().to_hex();
            if derived != record.txid {
                return Err(SnapshotError::MalformedInput(format!(
                    "txid {} does not match entry content",
                    record.txid
                )));
            }
            entries.push(entry);
        }
        Ok(Self { entries })
    }
}
