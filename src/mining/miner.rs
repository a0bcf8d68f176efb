//! Proof-of-work mining
//!
//! Builds a candidate block on top of the current head and searches for a
//! nonce whose hash clears the required difficulty target. The search is
//! CPU-bound and runs on a blocking worker so the caller's path stays free;
//! the caller observes completion through a [`MiningJob`] handle.

use crate::core::block::{now_timestamp, Block};
use crate::core::chain::ChainManager;
use std::time::Instant;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Mining failures surfaced by a job handle
#[derive(Error, Debug)]
pub enum MiningError {
    #[error("Mining job was discarded before a block was found")]
    Discarded,
    #[error("Mining worker panicked")]
    WorkerPanicked,
}

/// Handle onto a dispatched proof-of-work search
///
/// One search per handle; the worker is torn down once the result is
/// delivered or the handle is discarded.
pub struct MiningJob {
    handle: JoinHandle<Block>,
}

impl MiningJob {
    /// Await the completed, target-clearing block
    ///
    /// This is the only suspension point: dispatch itself never blocks the
    /// caller.
    pub async fn block(self) -> Result<Block, MiningError> {
        self.handle.await.map_err(|err| {
            if err.is_cancelled() {
                MiningError::Discarded
            } else {
                MiningError::WorkerPanicked
            }
        })
    }

    /// Discard the job
    ///
    /// The only cancellation primitive: a search that has not started never
    /// runs, and a running search is detached with its result dropped. There
    /// is no cooperative cancellation signal into the loop.
    pub fn discard(&self) {
        self.handle.abort();
    }
}

/// Produces blocks that satisfy the chain's current difficulty target
#[derive(Debug, Default)]
pub struct Miner;

impl Miner {
    /// Create a new miner
    pub fn new() -> Self {
        Self
    }

    /// Build an unmined candidate on top of the chain's current head
    ///
    /// Pure construction: stamps the current time, nonce 0, hash unset.
    /// The chain is not touched.
    pub fn generate_next_block(data: impl Into<String>, chain: &ChainManager) -> Block {
        let previous = chain.last_block();
        Block::new(
            previous.index + 1,
            previous.hash.clone(),
            now_timestamp(),
            data,
        )
    }

    /// Dispatch a proof-of-work search for a block carrying `data`
    ///
    /// The head block and the required difficulty are captured once, here;
    /// the search never re-reads the chain. Submission of the completed
    /// block back through [`ChainManager::add_block`] is the caller's
    /// responsibility.
    ///
    /// Must be called within a tokio runtime.
    pub fn mine(&self, chain: &ChainManager, data: impl Into<String>) -> MiningJob {
        let candidate = Self::generate_next_block(data, chain);
        let target = chain.required_difficulty(candidate.index);

        log::info!(
            "Mining block {} with target {}...",
            candidate.index,
            target
        );

        let handle = tokio::task::spawn_blocking(move || Self::prove_work_for(candidate, target));
        MiningJob { handle }
    }

    /// Exhaustive nonce search
    ///
    /// Refreshes the timestamp, increments the nonce and rehashes until the
    /// difficulty score falls below `target`. Unbounded by construction; a
    /// satisfying hash is eventually found.
    pub fn prove_work_for(mut block: Block, target: u64) -> Block {
        let start = Instant::now();

        loop {
            block.timestamp = now_timestamp();
            block.nonce += 1;
            block.hash = block.compute_hash();
            if block.difficulty_score() < target {
                break;
            }
        }

        log::info!(
            "Block found: time '{}s' target '{}' hash '{}' nonce '{}'",
            start.elapsed().as_secs(),
            target,
            block.hash,
            block.nonce
        );

        block
    }
}
