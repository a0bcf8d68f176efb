//! Nanochain: a minimal proof-of-work ledger in Rust
//!
//! This crate maintains an append-only, hash-linked sequence of blocks and
//! enforces the rules under which blocks are accepted, competing chains
//! replace the local one, and new blocks are produced. It features:
//! - Canonical SHA-256 block hashing with a fixed genesis block
//! - Ordered block validation with expected-vs-actual error reporting
//! - Longest-valid-chain fork resolution, all-or-nothing
//! - A pluggable difficulty policy derived purely from chain history
//! - Proof-of-work search dispatched to a blocking worker
//! - Whole-snapshot JSON persistence and typed change events
//!
//! Block payloads are opaque: the chain never interprets them.
//!
//! # Example
//!
//! ```rust
//! use nanochain::core::{ChainManager, StepCurvePolicy};
//! use nanochain::mining::Miner;
//! use nanochain::storage::MemoryBlockStore;
//!
//! // Open a chain; an empty store is seeded with the genesis block
//! let mut chain = ChainManager::open(
//!     Box::new(MemoryBlockStore::new()),
//!     Box::new(StepCurvePolicy::default()),
//! )
//! .unwrap();
//!
//! // Build a candidate, search for a satisfying nonce, submit
//! let candidate = Miner::generate_next_block("hello", &chain);
//! let target = chain.required_difficulty(candidate.index);
//! let mined = Miner::prove_work_for(candidate, target);
//!
//! chain.add_block(mined).unwrap();
//! assert_eq!(chain.last_block().index, 1);
//! ```

pub mod core;
pub mod mining;
pub mod storage;

// Re-export commonly used types
pub use crate::core::{
    Block, BlockValidationError, ChainError, ChainEvent, ChainEventBus, ChainManager,
    ChainValidationError, DifficultyPolicy, StepCurvePolicy,
};
pub use crate::mining::{Miner, MiningError, MiningJob};
pub use crate::storage::{
    BlockStore, JsonBlockStore, MemoryBlockStore, StorageConfig, StorageError,
};
