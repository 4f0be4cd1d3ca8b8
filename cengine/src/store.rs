//! Client-side persistence contract and a basic in-memory implementation.
//!
//! The engine only persists small JSON strings for guest session
//! continuity, so the contract mirrors web-style key/value storage:
//! synchronous and infallible. Implementations that can fail (quota,
//! corrupted files) are expected to degrade to no-ops.

use std::collections::HashMap;
use std::sync::Mutex;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str);

    fn remove(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemoryKeyValueStore, KeyValueStore};

    #[test]
    fn in_memory_store_round_trips_values() {
        let store = InMemoryKeyValueStore::new();
        assert_eq!(store.get("missing"), None);

        store.set("session_id", "abc");
        assert_eq!(store.get("session_id").as_deref(), Some("abc"));

        store.remove("session_id");
        assert_eq!(store.get("session_id"), None);
    }
}
