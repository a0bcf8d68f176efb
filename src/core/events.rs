//! Chain change notifications
//!
//! Provides a typed broadcast channel for publishing chain mutations to
//! interested consumers (network relay, APIs, logging).

use crate::core::block::Block;
use serde::Serialize;
use tokio::sync::broadcast;

/// Maximum number of events to buffer per subscriber
const EVENT_CAPACITY: usize = 100;

/// Events emitted by the chain after a mutation has been persisted
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ChainEvent {
    /// A single block was validated and appended
    BlockAdded(Block),
    /// A longer valid chain replaced the local tail; carries the appended suffix
    BlockchainReplaced(Vec<Block>),
}

/// Broadcaster for chain events
#[derive(Debug)]
pub struct ChainEventBus {
    sender: broadcast::Sender<ChainEvent>,
}

impl ChainEventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: ChainEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to chain events
    pub fn subscribe(&self) -> broadcast::Receiver<ChainEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChainEventBus {
    fn default() -> Self {
        Self::new()
    }
}
