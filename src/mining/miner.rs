//! Block miner implementation
//!
//! Assembles candidate headers from ledger snapshots and performs the
//! proof-of-work search. The search is synchronous, single-threaded, and
//! deterministic: given the same starting nonce and target it always
//! returns the smallest satisfying nonce at or after the start. Callers
//! in a request context must offload it (`spawn_blocking`) and hold no
//! shared lock while mining.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::consensus::{
    current_timestamp, Block, BlockHeader, CompactBits, DifficultyError, Target,
};
use crate::constants::DEFAULT_VERSION;
use crate::crypto::Hash;
use crate::ledger::LedgerSnapshot;
use crate::storage::ChainState;

/// How many nonces are tried between deadline checks.
const DEADLINE_CHECK_INTERVAL: u32 = 1024;

/// Mining errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MineError {
    /// Mining requested for a snapshot with no transactions.
    #[error("cannot mine a block from an empty snapshot")]
    EmptyPayload,

    /// The 32-bit nonce space ran out without a hit. The caller rolls the
    /// header timestamp and restarts the search at nonce 0.
    #[error("nonce space exhausted without satisfying the target")]
    NonceExhausted,

    /// The stop signal was raised.
    #[error("mining cancelled")]
    Cancelled,

    /// The deadline passed before a valid nonce was found.
    #[error("mining deadline exceeded")]
    TimedOut,

    /// The active bits do not expand to a usable target.
    #[error(transparent)]
    InvalidDifficulty(#[from] DifficultyError),
}

/// Proof-of-work miner with a cooperative stop signal.
#[derive(Debug, Clone, Default)]
pub struct Miner {
    /// Stop signal shared with whoever supervises the search
    stop_signal: Arc<AtomicBool>,
}

impl Miner {
    /// Create a new miner
    pub fn new() -> Self {
        Self {
            stop_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a stop signal handle
    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_signal)
    }

    /// Stop mining
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Reset stop signal
    pub fn reset(&self) {
        self.stop_signal.store(false, Ordering::SeqCst);
    }

    /// Assemble a candidate header for the next block: previous hash from
    /// the chain tip, merkle root from the snapshot, active bits, current
    /// timestamp, nonce 0.
    pub fn assemble_header(
        &self,
        state: &ChainState,
        snapshot: &LedgerSnapshot,
    ) -> Result<BlockHeader, MineError> {
        self.assemble_header_at(state.tip_hash(), state.next_bits(), snapshot)
    }

    /// Assemble against an explicit tip and bits. Genesis construction
    /// passes the zero digest.
    pub fn assemble_header_at(
        &self,
        previous_hash: Hash,
        bits: CompactBits,
        snapshot: &LedgerSnapshot,
    ) -> Result<BlockHeader, MineError> {
        if snapshot.is_empty() {
            return Err(MineError::EmptyPayload);
        }

        Ok(BlockHeader::new(
            DEFAULT_VERSION,
            previous_hash,
            snapshot.merkle_root(),
            current_timestamp(),
            bits,
            0,
        ))
    }

    /// Find the smallest nonce at or after the header's current one whose
    /// double hash falls below the target.
    ///
    /// Only `nonce` is varied; the other six fields are fixed by the
    /// caller before the search starts.
    pub fn mine_header(
        &self,
        header: BlockHeader,
        target: &Target,
        deadline: Option<Instant>,
    ) -> Result<BlockHeader, MineError> {
        self.mine_with_progress(header, target, deadline, u32::MAX as u64, |_| {})
    }

    /// Same search, reporting every `progress_interval` attempts.
    pub fn mine_with_progress<F>(
        &self,
        mut header: BlockHeader,
        target: &Target,
        deadline: Option<Instant>,
        progress_interval: u64,
        mut callback: F,
    ) -> Result<BlockHeader, MineError>
    where
        F: FnMut(u64), // attempts so far
    {
        let mut attempts = 0u64;

        loop {
            if self.stop_signal.load(Ordering::SeqCst) {
                return Err(MineError::Cancelled);
            }

            if let Some(deadline) = deadline {
                if attempts % DEADLINE_CHECK_INTERVAL as u64 == 0 && Instant::now() >= deadline {
                    return Err(MineError::TimedOut);
                }
            }

            let digest = header.hash();
            if target.allows(&digest) {
                return Ok(header);
            }

            header.nonce = match header.nonce.checked_add(1) {
                Some(next) => next,
                None => return Err(MineError::NonceExhausted),
            };

            attempts += 1;
            if attempts % progress_interval == 0 {
                callback(attempts);
            }
        }
    }

    /// Assemble, mine, and seal the next block for the chain.
    pub fn mine_block(
        &self,
        state: &ChainState,
        snapshot: &LedgerSnapshot,
        deadline: Option<Instant>,
    ) -> Result<Block, MineError> {
        let header = self.assemble_header(state, snapshot)?;
        let target = header.bits.to_target()?;
        let mined = self.mine_header(header, &target, deadline)?;
        Ok(Block::seal(
            state.height() + 1,
            mined,
            snapshot.to_payload(),
        ))
    }
}
