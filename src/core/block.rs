//! Block implementation for the ledger
//!
//! A block carries an opaque payload and commits to its position in the
//! chain through a SHA-256 hash over a canonical field encoding.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// =============================================================================
// Genesis Constants
// =============================================================================

/// Sentinel previous-hash value carried by the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Fixed creation timestamp of the genesis block (epoch seconds)
pub const GENESIS_TIMESTAMP: u64 = 1465154705;

/// Hash of the genesis block, precomputed over its canonical encoding
pub const GENESIS_HASH: &str = "b858b2bf701e6660dc214a19abd6e2d20d4c680473838ae8a292433b3bc19a8c";

/// Number of leading hex digits of a hash that form its difficulty score
pub const DIFFICULTY_SCORE_HEX_DIGITS: usize = 14;

/// A block in the chain
///
/// Immutable once accepted; the `hash` field must equal [`Block::compute_hash`]
/// over the remaining fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain (genesis = 0)
    pub index: u64,
    /// Hash of the predecessor block (`"0"` for genesis)
    pub previous_hash: String,
    /// Creation/mining time in epoch seconds (advisory, committed by the hash)
    pub timestamp: u64,
    /// Opaque payload; never interpreted by the chain
    pub data: String,
    /// Proof-of-work search counter
    pub nonce: u64,
    /// SHA-256 commitment over all other fields, lowercase hex
    pub hash: String,
}

impl Block {
    /// Create an unmined candidate block (nonce 0, empty hash)
    pub fn new(
        index: u64,
        previous_hash: impl Into<String>,
        timestamp: u64,
        data: impl Into<String>,
    ) -> Self {
        Self {
            index,
            previous_hash: previous_hash.into(),
            timestamp,
            data: data.into(),
            nonce: 0,
            hash: String::new(),
        }
    }

    /// The fixed genesis block, identical across all instances
    ///
    /// Never mined and never replaced; matched field-for-field when an
    /// external chain is validated.
    pub fn genesis() -> Self {
        Self {
            index: 0,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            timestamp: GENESIS_TIMESTAMP,
            data: String::new(),
            nonce: 0,
            hash: GENESIS_HASH.to_string(),
        }
    }

    /// Calculate the hash commitment of this block
    ///
    /// The preimage is the canonical encoding: decimal index, previous hash,
    /// decimal timestamp, payload, decimal nonce, concatenated in that order.
    /// Stable across runs and implementations.
    pub fn compute_hash(&self) -> String {
        let preimage = format!(
            "{}{}{}{}{}",
            self.index, self.previous_hash, self.timestamp, self.data, self.nonce
        );

        let mut hasher = Sha256::new();
        hasher.update(preimage.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Difficulty score of this block's hash
    ///
    /// The integer value of the first 14 hex digits of the hash. Smaller
    /// scores are harder to find; a block is acceptable when its score is
    /// strictly below the required target. An empty or malformed hash scores
    /// `u64::MAX` and therefore never satisfies any target.
    pub fn difficulty_score(&self) -> u64 {
        score_for_hash(&self.hash)
    }

    /// Check that the stored hash matches the canonical encoding
    pub fn verify_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }
}

/// Difficulty score of an arbitrary hash string (see [`Block::difficulty_score`])
pub fn score_for_hash(hash: &str) -> u64 {
    hash.get(..DIFFICULTY_SCORE_HEX_DIGITS)
        .and_then(|prefix| u64::from_str_radix(prefix, 16).ok())
        .unwrap_or(u64::MAX)
}

/// Current time in epoch seconds, as stamped into candidate blocks
pub fn now_timestamp() -> u64 {
    Utc::now().timestamp().max(0) as u64
}
