//! JSON-RPC API Module
//!
//! HTTP interface through which the ledger front end mines snapshots and
//! queries or validates the chain.

mod methods;
mod server;

pub use methods::*;
pub use server::*;
