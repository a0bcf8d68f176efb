//! Chain management
//!
//! The [`ChainManager`] owns the ordered block sequence and is the sole
//! writer to persisted state. It validates individual blocks and whole
//! candidate chains, resolves forks by the longest-valid-chain rule, and
//! publishes change events after each successful mutation.

use crate::core::block::Block;
use crate::core::difficulty::DifficultyPolicy;
use crate::core::events::{ChainEvent, ChainEventBus};
use crate::storage::{BlockStore, StorageError};
use thiserror::Error;

/// A block failed validation against its predecessor
///
/// Carries the first violated rule with expected vs. actual values, enough
/// to tell a stale local chain from a corrupt peer block.
#[derive(Error, Debug)]
pub enum BlockValidationError {
    #[error("Invalid index: expected '{expected}' got '{actual}'")]
    IndexMismatch { expected: u64, actual: u64 },
    #[error("Invalid previous hash: expected '{expected}' got '{actual}'")]
    PreviousHashMismatch { expected: String, actual: String },
    #[error("Invalid hash: expected '{expected}' got '{actual}'")]
    HashMismatch { expected: String, actual: String },
    #[error("Invalid proof of work: expected score '{score}' to be smaller than '{target}'")]
    DifficultyNotMet { score: u64, target: u64 },
}

/// An externally supplied chain failed validation
#[derive(Error, Debug)]
pub enum ChainValidationError {
    #[error("Candidate chain ({candidate} blocks) is not longer than the current chain ({current} blocks)")]
    NotLonger { candidate: usize, current: usize },
    #[error("Genesis blocks aren't the same")]
    GenesisMismatch,
    #[error("Invalid block sequence at index {index}: {source}")]
    InvalidSequence {
        index: u64,
        source: BlockValidationError,
    },
}

/// Any failure of a chain mutation or of opening the chain
#[derive(Error, Debug)]
pub enum ChainError {
    #[error(transparent)]
    Block(#[from] BlockValidationError),
    #[error(transparent)]
    Chain(#[from] ChainValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Owner of the block sequence and the persisted snapshot
///
/// Operations run synchronously on the caller's path; callers with multiple
/// submission sources (network + local mining) must serialize access.
pub struct ChainManager {
    blocks: Vec<Block>,
    store: Box<dyn BlockStore>,
    policy: Box<dyn DifficultyPolicy>,
    events: ChainEventBus,
}

impl ChainManager {
    /// Open a chain backed by the given store and difficulty policy
    ///
    /// Reads the persisted snapshot; an empty store is seeded with the
    /// genesis block and written back.
    pub fn open(
        store: Box<dyn BlockStore>,
        policy: Box<dyn DifficultyPolicy>,
    ) -> Result<Self, ChainError> {
        let blocks = store.read()?;
        let mut manager = Self {
            blocks,
            store,
            policy,
            events: ChainEventBus::new(),
        };

        if manager.blocks.is_empty() {
            log::info!("Chain empty, seeding genesis block");
            manager.blocks.push(Block::genesis());
            manager.store.write(&manager.blocks)?;
        }

        Ok(manager)
    }

    /// The full chain, in index order
    pub fn all_blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Number of blocks in the chain (genesis included)
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// A chain is never empty once opened
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Look up a block by its chain position
    pub fn block_by_index(&self, index: u64) -> Option<&Block> {
        self.blocks.iter().find(|block| block.index == index)
    }

    /// Look up a block by its hash
    pub fn block_by_hash(&self, hash: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.hash == hash)
    }

    /// The current head of the chain
    pub fn last_block(&self) -> &Block {
        self.blocks
            .last()
            .expect("chain holds at least the genesis block")
    }

    /// Required difficulty target for a block at `index`, derived from the
    /// current chain by the configured policy
    pub fn required_difficulty(&self, index: u64) -> u64 {
        self.policy.required_difficulty(&self.blocks, index)
    }

    /// Event bus publishing [`ChainEvent`]s after successful mutations
    pub fn events(&self) -> &ChainEventBus {
        &self.events
    }

    /// Validate and append a block to the head of the chain
    ///
    /// On success the full snapshot is persisted and a
    /// [`ChainEvent::BlockAdded`] is published. No mutation occurs when
    /// validation fails; a store failure propagates after the in-memory
    /// append (single-writer consistency gap, accepted by design).
    pub fn add_block(&mut self, block: Block) -> Result<&Block, ChainError> {
        self.append(block, true)
    }

    fn append(&mut self, block: Block, notify: bool) -> Result<&Block, ChainError> {
        self.check_block(&block, self.last_block(), &self.blocks)?;

        self.blocks.push(block);
        self.store.write(&self.blocks)?;

        let added = self
            .blocks
            .last()
            .expect("chain holds the block just appended");
        log::info!("Block added: {}", added.hash);
        log::debug!("Block added: {:?}", added);

        if notify {
            self.events.publish(ChainEvent::BlockAdded(added.clone()));
        }

        Ok(added)
    }

    /// Validate `new_block` as the successor of `previous_block`
    ///
    /// Rules are evaluated in order and the first violation wins:
    /// index continuity, previous-hash link, hash self-consistency, and the
    /// proof-of-work threshold derived from `reference` for the block's index.
    pub fn check_block(
        &self,
        new_block: &Block,
        previous_block: &Block,
        reference: &[Block],
    ) -> Result<(), BlockValidationError> {
        let expected_index = previous_block.index + 1;
        if new_block.index != expected_index {
            return Err(BlockValidationError::IndexMismatch {
                expected: expected_index,
                actual: new_block.index,
            });
        }

        if new_block.previous_hash != previous_block.hash {
            return Err(BlockValidationError::PreviousHashMismatch {
                expected: previous_block.hash.clone(),
                actual: new_block.previous_hash.clone(),
            });
        }

        let expected_hash = new_block.compute_hash();
        if new_block.hash != expected_hash {
            return Err(BlockValidationError::HashMismatch {
                expected: expected_hash,
                actual: new_block.hash.clone(),
            });
        }

        let target = self.policy.required_difficulty(reference, new_block.index);
        let score = new_block.difficulty_score();
        if score >= target {
            return Err(BlockValidationError::DifficultyNotMet { score, target });
        }

        Ok(())
    }

    /// Validate an externally supplied chain in full
    ///
    /// The first block must equal the canonical genesis field-for-field;
    /// every subsequent pair must pass [`ChainManager::check_block`] with the
    /// candidate itself as the difficulty reference.
    pub fn check_chain(&self, candidate: &[Block]) -> Result<(), ChainValidationError> {
        if candidate.first() != Some(&Block::genesis()) {
            return Err(ChainValidationError::GenesisMismatch);
        }

        for i in 1..candidate.len() {
            self.check_block(&candidate[i], &candidate[i - 1], candidate)
                .map_err(|source| ChainValidationError::InvalidSequence {
                    index: candidate[i].index,
                    source,
                })?;
        }

        Ok(())
    }

    /// Adopt a strictly longer valid chain
    ///
    /// A candidate no longer than the current chain is rejected before any
    /// validation runs (longest-valid-chain rule; no work-sum comparison).
    /// Otherwise the whole candidate is validated, the suffix beyond the
    /// current length is appended block by block through the regular
    /// validation path, and a single [`ChainEvent::BlockchainReplaced`]
    /// carrying that suffix is published. A failed validation leaves the
    /// local chain untouched.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> Result<(), ChainError> {
        if candidate.len() <= self.blocks.len() {
            log::warn!("Candidate chain not longer than the current chain, rejecting");
            return Err(ChainValidationError::NotLonger {
                candidate: candidate.len(),
                current: self.blocks.len(),
            }
            .into());
        }

        self.check_chain(&candidate)?;

        log::info!("Received chain is valid, replacing current chain");
        let suffix: Vec<Block> = candidate[self.blocks.len()..].to_vec();
        for block in &suffix {
            self.append(block.clone(), false)?;
        }

        self.events.publish(ChainEvent::BlockchainReplaced(suffix));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::now_timestamp;
    use crate::core::difficulty::StepCurvePolicy;
    use crate::mining::Miner;
    use crate::storage::MemoryBlockStore;

    fn open_chain() -> (ChainManager, MemoryBlockStore) {
        let store = MemoryBlockStore::new();
        let manager = ChainManager::open(
            Box::new(store.clone()),
            Box::new(StepCurvePolicy::default()),
        )
        .unwrap();
        (manager, store)
    }

    fn mined_block(manager: &ChainManager, data: &str) -> Block {
        let candidate = Miner::generate_next_block(data, manager);
        let target = manager.required_difficulty(candidate.index);
        Miner::prove_work_for(candidate, target)
    }

    #[test]
    fn test_open_seeds_genesis() {
        let (manager, store) = open_chain();

        assert_eq!(manager.len(), 1);
        assert_eq!(manager.last_block(), &Block::genesis());
        assert_eq!(store.snapshot().len(), 1);
    }

    #[test]
    fn test_open_reuses_existing_chain() {
        let (mut manager, store) = open_chain();
        manager.add_block(mined_block(&manager, "one")).unwrap();

        let reopened = ChainManager::open(
            Box::new(store.clone()),
            Box::new(StepCurvePolicy::default()),
        )
        .unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.last_block().data, "one");
    }

    #[test]
    fn test_add_valid_block() {
        let (mut manager, store) = open_chain();
        let mut rx = manager.events().subscribe();

        let block = mined_block(&manager, "payload");
        let added = manager.add_block(block).unwrap();

        assert_eq!(added.index, 1);
        assert!(added.verify_hash());
        assert_eq!(manager.len(), 2);
        assert_eq!(store.snapshot().len(), 2);

        match rx.try_recv() {
            Ok(ChainEvent::BlockAdded(event_block)) => assert_eq!(event_block.index, 1),
            other => panic!("expected BlockAdded, got {:?}", other),
        }
    }

    #[test]
    fn test_lookups() {
        let (mut manager, _) = open_chain();
        let block = mined_block(&manager, "payload");
        let hash = block.hash.clone();
        manager.add_block(block).unwrap();

        assert_eq!(manager.block_by_index(1).unwrap().hash, hash);
        assert_eq!(manager.block_by_hash(&hash).unwrap().index, 1);
        assert!(manager.block_by_index(7).is_none());
        assert!(manager.block_by_hash("missing").is_none());
    }

    #[test]
    fn test_rejects_index_gap() {
        let (mut manager, _) = open_chain();

        let mut block = mined_block(&manager, "payload");
        block.index += 1;

        match manager.add_block(block) {
            Err(ChainError::Block(BlockValidationError::IndexMismatch { expected, actual })) => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("expected IndexMismatch, got {:?}", other),
        }
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_rejects_broken_link() {
        let (mut manager, _) = open_chain();

        let mut candidate = Miner::generate_next_block("payload", &manager);
        candidate.previous_hash = "not-the-head".to_string();
        let block = Miner::prove_work_for(candidate, manager.required_difficulty(1));

        match manager.add_block(block) {
            Err(ChainError::Block(BlockValidationError::PreviousHashMismatch { .. })) => {}
            other => panic!("expected PreviousHashMismatch, got {:?}", other),
        }
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_rejects_tampered_payload() {
        let (mut manager, _) = open_chain();

        let mut block = mined_block(&manager, "payload");
        block.data = "tampered".to_string();

        match manager.add_block(block) {
            Err(ChainError::Block(BlockValidationError::HashMismatch { .. })) => {}
            other => panic!("expected HashMismatch, got {:?}", other),
        }
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_rejects_insufficient_work() {
        let (mut manager, _) = open_chain();
        let head = manager.last_block().clone();

        // Self-consistent but unmined: recompute the hash without searching
        // for one that clears the target.
        let mut block = Block::new(1, head.hash, now_timestamp(), "payload");
        loop {
            block.hash = block.compute_hash();
            if block.difficulty_score() >= manager.required_difficulty(1) {
                break;
            }
            block.nonce += 1;
        }

        match manager.add_block(block) {
            Err(ChainError::Block(BlockValidationError::DifficultyNotMet { score, target })) => {
                assert!(score >= target);
            }
            other => panic!("expected DifficultyNotMet, got {:?}", other),
        }
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_check_chain_accepts_own_chain_idempotently() {
        let (mut manager, _) = open_chain();
        manager.add_block(mined_block(&manager, "one")).unwrap();
        manager.add_block(mined_block(&manager, "two")).unwrap();

        let chain = manager.all_blocks().to_vec();
        assert!(manager.check_chain(&chain).is_ok());
        assert!(manager.check_chain(&chain).is_ok());
    }

    #[test]
    fn test_check_chain_rejects_foreign_genesis() {
        let (manager, _) = open_chain();

        let mut foreign = Block::genesis();
        foreign.data = "other network".to_string();
        foreign.hash = foreign.compute_hash();

        match manager.check_chain(&[foreign]) {
            Err(ChainValidationError::GenesisMismatch) => {}
            other => panic!("expected GenesisMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_replace_chain_rejects_equal_length_before_validating() {
        let (mut manager, _) = open_chain();
        manager.add_block(mined_block(&manager, "one")).unwrap();

        // Garbage of equal length: the length gate must fire before any
        // chain validation does.
        let junk = vec![
            Block::new(9, "x", 0, "junk"),
            Block::new(10, "y", 0, "junk"),
        ];

        match manager.replace_chain(junk) {
            Err(ChainError::Chain(ChainValidationError::NotLonger { candidate, current })) => {
                assert_eq!(candidate, 2);
                assert_eq!(current, 2);
            }
            other => panic!("expected NotLonger, got {:?}", other),
        }
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_replace_chain_adopts_longer_chain() {
        let (mut local, _) = open_chain();
        let mut rx = local.events().subscribe();

        // A competitor that shares our genesis and grew three blocks ahead.
        let (mut remote, _) = open_chain();
        for data in ["one", "two", "three"] {
            remote.add_block(mined_block(&remote, data)).unwrap();
        }
        let candidate = remote.all_blocks().to_vec();

        local.replace_chain(candidate.clone()).unwrap();

        assert_eq!(local.len(), 4);
        assert_eq!(local.all_blocks(), candidate.as_slice());

        match rx.try_recv() {
            Ok(ChainEvent::BlockchainReplaced(suffix)) => {
                assert_eq!(suffix.len(), 3);
                assert_eq!(suffix[0].index, 1);
                assert_eq!(suffix[2].index, 3);
            }
            other => panic!("expected BlockchainReplaced, got {:?}", other),
        }
        // Suffix blocks are appended without individual notifications.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_replace_chain_is_all_or_nothing() {
        let (mut local, store) = open_chain();

        let (mut remote, _) = open_chain();
        for data in ["one", "two", "three"] {
            remote.add_block(mined_block(&remote, data)).unwrap();
        }
        let mut candidate = remote.all_blocks().to_vec();
        candidate[2].data = "tampered".to_string();

        match local.replace_chain(candidate) {
            Err(ChainError::Chain(ChainValidationError::InvalidSequence { index, .. })) => {
                assert_eq!(index, 2);
            }
            other => panic!("expected InvalidSequence, got {:?}", other),
        }

        assert_eq!(local.len(), 1);
        assert_eq!(store.snapshot().len(), 1);
    }
}
