//! LedgerChain Node
//!
//! Main entry point. Bootstraps a chain from a mined genesis snapshot,
//! serves the JSON-RPC API, and keeps a demo mining loop running that
//! timestamps a small generated journal snapshot at a fixed cadence.

use ledger_core::constants::{CHAIN_NAME, DEFAULT_RPC_PORT};
use ledger_core::ledger::{JournalEntry, LedgerSnapshot};
use ledger_core::mining::{MineError, Miner};
use ledger_core::node::{create_genesis_block, default_bits, GenesisInfo};
use ledger_core::rpc::{start_rpc_server, RpcState};
use ledger_core::storage::ChainState;
use rand::Rng;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

/// Seconds between demo snapshots.
const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(20);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║                 LEDGERCHAIN NODE                         ║");
    println!("║        Snapshot · Timestamp · Verify                     ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();

    let miner = Miner::new();
    let bits = default_bits();

    // Mine the genesis block from the chain's opening snapshot.
    let opening = LedgerSnapshot::new(vec![JournalEntry::new(
        "2026-01-01",
        format!("{CHAIN_NAME} opened"),
        0,
    )]);
    let genesis = create_genesis_block(&miner, &opening, bits, None)?;
    let info = GenesisInfo::from_block(&genesis);

    println!("Genesis Block:");
    println!("  Hash:        {}", info.hash);
    println!("  Merkle Root: {}", info.merkle_root);
    println!("  Timestamp:   {}", info.timestamp);
    println!("  Bits:        {}", info.bits);
    println!();

    let chain = Arc::new(Mutex::new(ChainState::new(genesis)?));
    let state = RpcState {
        chain: Arc::clone(&chain),
        miner: miner.clone(),
    };

    println!("RPC on port {DEFAULT_RPC_PORT}. Press Ctrl+C to stop.");
    println!();

    // Demo mining loop: snapshot a generated journal every interval.
    let loop_chain = Arc::clone(&chain);
    let loop_miner = miner.clone();

    tokio::spawn(async move {
        let num_workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1) as u32;

        loop {
            sleep(SNAPSHOT_INTERVAL).await;

            let snapshot = demo_snapshot();
            match mine_snapshot_parallel(&loop_miner, &loop_chain, &snapshot, num_workers).await {
                Ok(height) => {
                    let stats = loop_chain.lock().unwrap().stats();
                    println!(
                        "⛏️  Block #{height} | Tip: {}... | {} entries | {} bytes on chain",
                        &stats.tip_hash.to_hex()[..12],
                        snapshot.len(),
                        stats.total_payload_bytes
                    );
                }
                Err(MineError::Cancelled) => break,
                Err(err) => log::warn!("snapshot mining failed: {err}"),
            }
        }
    });

    tokio::select! {
        result = start_rpc_server(state, DEFAULT_RPC_PORT) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutdown signal received. Stopping node...");
            miner.stop();
        }
    }

    Ok(())
}

/// Small generated journal standing in for the external ledger.
fn demo_snapshot() -> LedgerSnapshot {
    let mut rng = rand::thread_rng();
    let entries = (0..rng.gen_range(1..=4))
        .map(|i| {
            JournalEntry::new(
                "2026-08-08",
                format!("Demo posting #{i}"),
                rng.gen_range(1_00..1_000_00),
            )
        })
        .collect();
    LedgerSnapshot::new(entries)
}

/// Fan the nonce range out over worker threads; first hit wins and the
/// others are stopped. When every worker exhausts its range, the header
/// timestamp is rolled and the whole search restarts from nonce 0.
async fn mine_snapshot_parallel(
    miner: &Miner,
    chain: &Arc<Mutex<ChainState>>,
    snapshot: &LedgerSnapshot,
    num_workers: u32,
) -> Result<u64, MineError> {
    loop {
        // Assemble under the lock, search without it.
        let (template, target, next_height) = {
            let state = chain.lock().unwrap();
            let template = miner.assemble_header(&state, snapshot)?;
            let target = template.bits.to_target()?;
            (template, target, state.height() + 1)
        };

        miner.reset();
        let (tx, mut rx) = tokio::sync::mpsc::channel(num_workers as usize);

        for i in 0..num_workers {
            let worker = miner.clone();
            let tx_worker = tx.clone();
            let mut header = template;

            // Offset start nonces to avoid duplicate work.
            header.nonce = i * (u32::MAX / num_workers);

            tokio::task::spawn_blocking(move || {
                let result = worker.mine_header(header, &target, None);
                let _ = tx_worker.blocking_send(result);
            });
        }
        drop(tx);

        let mut mined = None;
        let mut exhausted = 0u32;
        while let Some(result) = rx.recv().await {
            match result {
                Ok(header) => {
                    mined = Some(header);
                    miner.stop();
                    break;
                }
                Err(MineError::NonceExhausted) => exhausted += 1,
                Err(MineError::Cancelled) => {}
                Err(err) => return Err(err),
            }
        }
        miner.reset();

        let Some(header) = mined else {
            if exhausted == num_workers {
                // Whole nonce space missed; roll the timestamp and retry.
                log::info!("nonce space exhausted, rolling timestamp");
                continue;
            }
            return Err(MineError::Cancelled);
        };

        let block = ledger_core::consensus::Block::seal(next_height, header, snapshot.to_payload());
        let mut state = chain.lock().unwrap();
        match state.append(block) {
            Ok(height) => return Ok(height),
            Err(err) => {
                // Tip moved while we were mining; start over.
                log::info!("discarding stale block: {err}");
                drop(state);
                continue;
            }
        }
    }
}
