//! Chain persistence layer
//!
//! A [`BlockStore`] holds the persisted chain snapshot. Writes replace the
//! whole snapshot; there is no incremental append.

use crate::core::block::Block;
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Persisted chain snapshot, read whole and written whole
pub trait BlockStore: Send {
    /// Read the full snapshot; an absent snapshot reads as empty
    fn read(&self) -> Result<Vec<Block>, StorageError>;

    /// Overwrite the full snapshot
    fn write(&self, blocks: &[Block]) -> Result<(), StorageError>;
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub chain_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".nanochain_data"),
            chain_file: "blocks.json".to_string(),
        }
    }
}

/// File-backed store keeping the chain as a JSON document
pub struct JsonBlockStore {
    config: StorageConfig,
}

impl JsonBlockStore {
    /// Create a store rooted at the configured data directory
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    /// Create with default configuration
    pub fn with_defaults() -> Result<Self, StorageError> {
        Self::new(StorageConfig::default())
    }

    /// Path of the persisted chain file
    pub fn chain_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.chain_file)
    }

    /// Check if a persisted snapshot exists
    pub fn exists(&self) -> bool {
        self.chain_path().exists()
    }
}

impl BlockStore for JsonBlockStore {
    fn read(&self) -> Result<Vec<Block>, StorageError> {
        let path = self.chain_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    fn write(&self, blocks: &[Block]) -> Result<(), StorageError> {
        // Write to a temporary file first, then rename into place so a
        // failed write never clobbers the previous snapshot.
        let temp_path = self
            .config
            .data_dir
            .join(format!("{}.tmp", self.config.chain_file));
        let file = fs::File::create(&temp_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, blocks)?;

        fs::rename(&temp_path, self.chain_path())?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral chains
///
/// Clones share the same underlying snapshot, which lets a test keep a
/// handle onto whatever the chain persisted.
#[derive(Clone, Debug, Default)]
pub struct MemoryBlockStore {
    blocks: Arc<Mutex<Vec<Block>>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current snapshot
    pub fn snapshot(&self) -> Vec<Block> {
        self.blocks
            .lock()
            .expect("block store lock poisoned")
            .clone()
    }
}

impl BlockStore for MemoryBlockStore {
    fn read(&self) -> Result<Vec<Block>, StorageError> {
        Ok(self.snapshot())
    }

    fn write(&self, blocks: &[Block]) -> Result<(), StorageError> {
        let mut guard = self.blocks.lock().expect("block store lock poisoned");
        *guard = blocks.to_vec();
        Ok(())
    }
}
