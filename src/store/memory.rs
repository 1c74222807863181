use super::PersistenceAdapter;
use crate::engine::types::ListKind;
use crate::error::{PersistenceError, PersistenceResult};
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::RwLock;

/// Volatile store used when SQLite is disabled or unavailable.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<FxHashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceAdapter for MemoryStore {
    fn initialize(&self) -> PersistenceResult<()> {
        let mut map = self
            .collections
            .write()
            .map_err(|_| PersistenceError::Poisoned)?;
        for kind in [ListKind::Allow, ListKind::Deny] {
            map.entry(kind.collection().to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
        }
        Ok(())
    }

    fn get(&self, collection: &str) -> PersistenceResult<Option<Value>> {
        let map = self
            .collections
            .read()
            .map_err(|_| PersistenceError::Poisoned)?;
        Ok(map.get(collection).cloned())
    }

    fn set(&self, collection: &str, value: Value) -> PersistenceResult<()> {
        let mut map = self
            .collections
            .write()
            .map_err(|_| PersistenceError::Poisoned)?;
        map.insert(collection.to_string(), value);
        Ok(())
    }
}
