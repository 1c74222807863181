//! Block History Ledger: bounded, most-recent-first record of enforced blocks.

use crate::engine::types::BlockEvent;
use crate::store::PersistenceWriter;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

#[derive(Clone)]
pub struct BlockLedger {
    // Front is the most recent event.
    buffer: Arc<RwLock<VecDeque<BlockEvent>>>,
    capacity: usize,
    writer: Option<PersistenceWriter>,
}

impl BlockLedger {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
            writer: None,
        }
    }

    /// Queues the full ledger for persistence after every append.
    pub fn with_writer(mut self, writer: PersistenceWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Records a block, dropping the oldest events past capacity.
    pub fn append(&self, event: BlockEvent) {
        let mut buffer = self.buffer.write().unwrap_or_else(|e| e.into_inner());
        buffer.push_front(event);
        buffer.truncate(self.capacity);
        // Queued under the write lock so the writer sees appends in order.
        if let Some(writer) = &self.writer {
            writer.save_ledger(buffer.iter().cloned().collect());
        }
    }

    /// Up to `n` events, newest first.
    pub fn recent(&self, n: usize) -> Vec<BlockEvent> {
        let buffer = self.buffer.read().unwrap_or_else(|e| e.into_inner());
        buffer.iter().take(n).cloned().collect()
    }

    /// Every held event, newest first.
    pub fn all(&self) -> Vec<BlockEvent> {
        self.recent(self.capacity)
    }

    /// Trims the ledger back to capacity. Returns how many events were dropped.
    pub fn evict_overflow(&self) -> usize {
        let mut buffer = self.buffer.write().unwrap_or_else(|e| e.into_inner());
        let overflow = buffer.len().saturating_sub(self.capacity);
        buffer.truncate(self.capacity);
        overflow
    }

    /// Replaces contents with persisted events (expected newest first).
    pub fn restore(&self, events: Vec<BlockEvent>) {
        let mut buffer = self.buffer.write().unwrap_or_else(|e| e.into_inner());
        *buffer = events.into_iter().take(self.capacity).collect();
    }

    pub fn len(&self) -> usize {
        self.buffer.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
