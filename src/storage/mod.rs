//! Persistence for the chain snapshot

pub mod persistence;

pub use persistence::{BlockStore, JsonBlockStore, MemoryBlockStore, StorageConfig, StorageError};
