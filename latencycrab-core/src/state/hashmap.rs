//! HashMap-based keyed store.
//!
//! Keys and counts are kept as bincode bytes, so the store behaves like the
//! byte-oriented engines it stands in for: a key's identity is its encoding.

use super::KeyedStore;
use crate::error::StoreError;
use crate::types::{Count, StreamKey};
use std::collections::HashMap;

/// In-memory keyed store using HashMap.
///
/// Holds no locks; the owning operator thread is the only writer.
#[derive(Debug, Default, Clone)]
pub struct HashMapStore {
    /// key_bytes -> count_bytes
    entries: HashMap<Vec<u8>, Vec<u8>>,
}

impl HashMapStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys ever written.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode every entry.
    ///
    /// Fails if any stored key does not decode as `K`.
    pub fn to_map<K: StreamKey>(&self) -> Result<HashMap<K, Count>, StoreError> {
        let mut out = HashMap::with_capacity(self.entries.len());
        for (kbytes, vbytes) in &self.entries {
            let key: K = bincode::deserialize(kbytes)?;
            let count: Count = bincode::deserialize(vbytes)?;
            out.insert(key, count);
        }
        Ok(out)
    }
}

impl<K: StreamKey> KeyedStore<K> for HashMapStore {
    fn get(&self, key: &K) -> Result<Option<Count>, StoreError> {
        let kbytes = bincode::serialize(key)?;
        match self.entries.get(&kbytes) {
            Some(vbytes) => Ok(Some(bincode::deserialize(vbytes)?)),
            None => Ok(None),
        }
    }

    fn put(&mut self, key: &K, count: Count) -> Result<(), StoreError> {
        let kbytes = bincode::serialize(key)?;
        let vbytes = bincode::serialize(&count)?;
        self.entries.insert(kbytes, vbytes);
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/hashmap_tests.rs"]
mod tests;
