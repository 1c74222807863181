use super::clock::Clock;
use super::types::{CacheEntry, Decision};
use crate::store::PersistenceWriter;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    seq: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: FxHashMap<Box<str>, Slot>,
    // (created_at, seq) -> url, oldest first
    order: BTreeMap<(u64, u64), Box<str>>,
    next_seq: u64,
}

impl CacheInner {
    fn insert(&mut self, url: &str, entry: CacheEntry) {
        self.remove(url);
        let seq = self.next_seq;
        self.next_seq += 1;
        let key: Box<str> = url.into();
        self.order.insert((entry.created_at, seq), key.clone());
        self.entries.insert(key, Slot { entry, seq });
    }

    fn remove(&mut self, url: &str) -> Option<CacheEntry> {
        let slot = self.entries.remove(url)?;
        self.order.remove(&(slot.entry.created_at, slot.seq));
        Some(slot.entry)
    }

    fn sweep(&mut self, now: u64) -> usize {
        let expired: Vec<Box<str>> = self
            .entries
            .iter()
            .filter(|(_, slot)| !slot.entry.is_valid_at(now))
            .map(|(url, _)| url.clone())
            .collect();
        for url in &expired {
            self.remove(url);
        }
        expired.len()
    }

    /// Live entries, oldest first.
    fn live_entries(&self, now: u64) -> Vec<(String, CacheEntry)> {
        self.order
            .values()
            .filter_map(|url| {
                let slot = self.entries.get(url)?;
                slot.entry
                    .is_valid_at(now)
                    .then(|| (url.to_string(), slot.entry))
            })
            .collect()
    }

    fn enforce_bound(&mut self, capacity: usize, now: u64) {
        if self.entries.len() <= capacity {
            return;
        }
        self.sweep(now);
        while self.entries.len() > capacity {
            match self.order.pop_first() {
                Some((_, url)) => {
                    self.entries.remove(&url);
                }
                None => break,
            }
        }
    }
}

/// TTL-bounded, size-bounded map from URL to its last remote verdict.
///
/// Over capacity, expired entries go first, then the oldest-created ones.
///
/// With a writer attached, every mutation queues a snapshot while the lock is
/// still held, so snapshots reach the writer in mutation order.
pub struct DecisionCache {
    ttl_ms: u64,
    capacity: usize,
    clock: Arc<dyn Clock>,
    inner: Mutex<CacheInner>,
    writer: Option<PersistenceWriter>,
}

impl DecisionCache {
    pub fn new(ttl: Duration, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl_ms: ttl.as_millis() as u64,
            capacity,
            clock,
            inner: Mutex::new(CacheInner::default()),
            writer: None,
        }
    }

    pub fn with_writer(mut self, writer: PersistenceWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Returns the entry if present and not yet expired. Expired entries are dropped on the way.
    pub fn get(&self, url: &str) -> Option<CacheEntry> {
        let now = self.clock.now_ms();
        let mut inner = self.lock();
        let entry = inner.entries.get(url).map(|slot| slot.entry)?;
        if entry.is_valid_at(now) {
            Some(entry)
        } else {
            inner.remove(url);
            None
        }
    }

    pub fn put(&self, url: &str, decision: Decision) -> CacheEntry {
        let now = self.clock.now_ms();
        let entry = CacheEntry {
            decision,
            created_at: now,
            expires_at: now.saturating_add(self.ttl_ms),
        };
        let mut inner = self.lock();
        inner.insert(url, entry);
        inner.enforce_bound(self.capacity, now);
        self.persist(&inner, now);
        entry
    }

    /// Drops every expired entry. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut inner = self.lock();
        let removed = inner.sweep(now);
        if removed > 0 {
            self.persist(&inner, now);
        }
        removed
    }

    pub fn clear(&self) {
        let now = self.clock.now_ms();
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
        self.persist(&inner, now);
    }

    /// Stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Live entries, oldest first.
    pub fn snapshot(&self) -> Vec<(String, CacheEntry)> {
        let now = self.clock.now_ms();
        self.lock().live_entries(now)
    }

    /// Loads persisted entries, skipping any that have already expired.
    pub fn restore(&self, entries: Vec<(String, CacheEntry)>) -> usize {
        let now = self.clock.now_ms();
        let mut inner = self.lock();
        let mut restored = 0;
        for (url, entry) in entries {
            if entry.is_valid_at(now) {
                inner.insert(&url, entry);
                restored += 1;
            }
        }
        inner.enforce_bound(self.capacity, now);
        restored
    }

    // Called with the lock held.
    fn persist(&self, inner: &CacheInner, now: u64) {
        if let Some(writer) = &self.writer {
            writer.save_cache(inner.live_entries(now));
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
