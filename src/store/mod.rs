//! Persistence Adapter: durable home for rule lists, the cache snapshot and the ledger.
//!
//! Four named collections are kept as JSON values in a key-value store.
//! Nothing on the decision path waits on this module; writes go through
//! [`PersistenceWriter`] and loads happen once at start-up.

mod memory;
mod sqlite;
mod writer;

pub use self::memory::MemoryStore;
pub use self::sqlite::SqliteStore;
pub use self::writer::PersistenceWriter;

use crate::engine::cache::DecisionCache;
use crate::engine::rules::RuleStore;
use crate::engine::types::{BlockEvent, CacheEntry, ListKind};
use crate::error::PersistenceResult;
use crate::ledger::BlockLedger;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{error, info};

pub const CACHE_COLLECTION: &str = "cache";
pub const LEDGER_COLLECTION: &str = "ledger";

/// Key-value store of named JSON collections.
pub trait PersistenceAdapter: Send + Sync {
    /// Prepares the store and seeds empty rule lists if they are absent.
    fn initialize(&self) -> PersistenceResult<()>;

    fn get(&self, collection: &str) -> PersistenceResult<Option<Value>>;

    fn set(&self, collection: &str, value: Value) -> PersistenceResult<()>;

    fn load_rules(&self, kind: ListKind) -> PersistenceResult<Vec<String>> {
        match self.get(kind.collection())? {
            Some(v) => Ok(serde_json::from_value(v)?),
            None => Ok(Vec::new()),
        }
    }

    fn save_rules(&self, kind: ListKind, patterns: &[String]) -> PersistenceResult<()> {
        self.set(kind.collection(), serde_json::to_value(patterns)?)
    }

    fn load_cache(&self) -> PersistenceResult<Vec<(String, CacheEntry)>> {
        match self.get(CACHE_COLLECTION)? {
            Some(v) => {
                let map: HashMap<String, CacheEntry> = serde_json::from_value(v)?;
                Ok(map.into_iter().collect())
            }
            None => Ok(Vec::new()),
        }
    }

    fn save_cache(&self, entries: &[(String, CacheEntry)]) -> PersistenceResult<()> {
        let map: HashMap<&str, &CacheEntry> = entries.iter().map(|(u, e)| (u.as_str(), e)).collect();
        self.set(CACHE_COLLECTION, serde_json::to_value(map)?)
    }

    fn load_ledger(&self) -> PersistenceResult<Vec<BlockEvent>> {
        match self.get(LEDGER_COLLECTION)? {
            Some(v) => Ok(serde_json::from_value(v)?),
            None => Ok(Vec::new()),
        }
    }

    fn save_ledger(&self, events: &[BlockEvent]) -> PersistenceResult<()> {
        self.set(LEDGER_COLLECTION, serde_json::to_value(events)?)
    }
}

/// Loads each collection into its in-memory owner.
///
/// Collections load independently; one that fails to read is logged and left empty.
pub fn restore_state(
    adapter: &dyn PersistenceAdapter,
    rules: &RuleStore,
    cache: &DecisionCache,
    ledger: &BlockLedger,
) {
    for kind in [ListKind::Allow, ListKind::Deny] {
        match adapter.load_rules(kind) {
            Ok(patterns) => {
                info!("Loaded {} patterns from {}", patterns.len(), kind.collection());
                rules.replace(kind, patterns);
            }
            Err(e) => error!("Failed to load {}: {}", kind.collection(), e),
        }
    }

    match adapter.load_cache() {
        Ok(entries) => {
            let total = entries.len();
            let restored = cache.restore(entries);
            info!(
                "Restored {} of {} cached verdicts (capacity {})",
                restored,
                total,
                cache.capacity()
            );
        }
        Err(e) => error!("Failed to load cache snapshot: {}", e),
    }

    match adapter.load_ledger() {
        Ok(events) => {
            ledger.restore(events);
            info!("Restored {} block events (cap {})", ledger.len(), ledger.capacity());
        }
        Err(e) => error!("Failed to load block ledger: {}", e),
    }
}
