//! Mining module - candidate assembly and proof-of-work search

mod miner;

pub use miner::*;
