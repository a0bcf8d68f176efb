//! Block production
//!
//! Candidate construction and the proof-of-work search.

pub mod miner;

pub use miner::{Miner, MiningError, MiningJob};
