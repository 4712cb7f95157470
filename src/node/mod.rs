//! Node module - genesis bootstrap

mod genesis;

pub use genesis::*;
