use std::collections::HashMap;
use std::hash::Hash;

use tracing::debug;

/// Per-run memo of built records. Passed explicitly to every enrichment pass.
///
/// Only successful builds are stored, so a key whose page failed is tried
/// again the next time it comes up.
pub struct RecordCache<K, V> {
    entries: HashMap<K, V>,
    hits: usize,
    misses: usize,
}

impl<K, V> RecordCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    pub fn new() -> Self {
        RecordCache {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Start warm from records saved by an earlier run.
    pub fn seeded(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        RecordCache {
            entries: entries.into_iter().collect(),
            hits: 0,
            misses: 0,
        }
    }

    /// Return the cached record for `key`, or build, store and return it.
    pub fn get_or_build<F>(&mut self, key: &K, build: F) -> Option<&V>
    where
        F: FnOnce(&K) -> Option<V>,
    {
        if self.entries.contains_key(key) {
            self.hits += 1;
            debug!("Cache hit for {:?}", key);
            return self.entries.get(key);
        }
        self.misses += 1;
        let value = build(key)?;
        Some(self.entries.entry(key.clone()).or_insert(value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

impl<K, V> Default for RecordCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ──
