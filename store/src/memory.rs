//! In-process store
//!
//! Backs dry runs (`bench run --memory`) and tests. Besides plain storage it
//! can simulate network cost with a fixed per-lookup latency and simulate
//! transport failures for selected keys.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicU64, Ordering},
        RwLock,
    },
    thread,
    time::Duration,
};

use crate::client::{versioned_key, GetOutcome, StoreClient};

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    failing: RwLock<HashSet<String>>,
    latency: Option<Duration>,
    gets: AtomicU64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated for a dry run over `ids`
    ///
    /// Half of the identifiers get a `primary` record, a quarter only a
    /// `fallback` record and the rest none, so every resolution path is hit.
    #[must_use]
    pub fn seeded(ids: &[String], primary: &str, fallback: &str) -> Self {
        let store = Self::new();
        for (i, id) in ids.iter().enumerate() {
            let version = match i % 4 {
                0 | 1 => primary,
                2 => fallback,
                _ => continue,
            };
            store.insert(
                versioned_key(version, id),
                format!("{{\"ip\":\"{id}\",\"version\":\"{version}\"}}"),
            );
        }
        store
    }

    /// Every lookup sleeps for `latency` before answering
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.into(), value.into());
        }
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.entries.write().ok()?.remove(key)
    }

    /// Lookups of `key` report a transient error until `heal` is called
    pub fn fail_key(&self, key: impl Into<String>) {
        if let Ok(mut failing) = self.failing.write() {
            failing.insert(key.into());
        }
    }

    pub fn heal(&self, key: &str) {
        if let Ok(mut failing) = self.failing.write() {
            failing.remove(key);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of keys looked up so far
    #[must_use]
    pub fn get_count(&self) -> u64 {
        self.gets.load(Ordering::Relaxed)
    }
}

impl StoreClient for MemoryStore {
    fn get(&self, key: &str) -> GetOutcome {
        self.gets.fetch_add(1, Ordering::Relaxed);
        if let Some(latency) = self.latency {
            thread::sleep(latency);
        }

        let injected = self.failing.read().map(|f| f.contains(key)).unwrap_or(false);
        if injected {
            return GetOutcome::TransientError(format!("injected failure for {key}"));
        }

        match self.entries.read() {
            Ok(entries) => entries
                .get(key)
                .map_or(GetOutcome::Absent, |v| GetOutcome::Found(v.clone())),
            Err(_) => GetOutcome::TransientError("store lock poisoned".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_remove() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.insert("ip:v23:1.1.1.1", "payload");
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("ip:v23:1.1.1.1"),
            GetOutcome::Found("payload".to_string())
        );
        assert_eq!(store.get("ip:v22:1.1.1.1"), GetOutcome::Absent);

        assert_eq!(store.remove("ip:v23:1.1.1.1").as_deref(), Some("payload"));
        assert_eq!(store.get("ip:v23:1.1.1.1"), GetOutcome::Absent);
        assert_eq!(store.get_count(), 3);
    }

    #[test]
    fn test_seeded_layout() {
        let ids: Vec<String> = (1..=8).map(|i| format!("10.0.0.{i}")).collect();
        let store = MemoryStore::seeded(&ids, "v23", "v22");
        assert_eq!(store.len(), 6);
        assert!(store.get("ip:v23:10.0.0.1").value().is_some());
        assert!(store.get("ip:v22:10.0.0.3").value().is_some());
        assert_eq!(store.get("ip:v23:10.0.0.3"), GetOutcome::Absent);
        assert_eq!(store.get("ip:v23:10.0.0.4"), GetOutcome::Absent);
        assert_eq!(store.get("ip:v22:10.0.0.4"), GetOutcome::Absent);
    }

    #[test]
    fn test_injected_failure() {
        let store = MemoryStore::new();
        store.insert("k", "v");
        store.fail_key("k");
        assert!(store.get("k").is_transient_error());

        store.heal("k");
        assert_eq!(store.get("k"), GetOutcome::Found("v".to_string()));
    }

    #[test]
    fn test_get_many_keeps_order() {
        let store = MemoryStore::new();
        store.insert("a", "1");
        store.insert("c", "3");

        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let outcomes = store.get_many(&keys);
        assert_eq!(
            outcomes,
            vec![
                GetOutcome::Found("1".to_string()),
                GetOutcome::Absent,
                GetOutcome::Found("3".to_string()),
            ]
        );
    }
}
