//! # Keyed Stores
//!
//! Durable key -> count mappings the aggregator reads and writes.
//!
//! The aggregator only needs point reads and point writes; there is no
//! multi-key transaction and no delete. Every `put` is expected to be
//! crash-consistent on its own.
//!
//! ## Backends
//!
//! - [`HashMapStore`]: In-memory byte-oriented engine (tests, harness default)
//! - [`RocksDbStore`]: Embedded RocksDB (feature `rocksdb`)

use crate::error::StoreError;
use crate::types::{Count, StreamKey};

pub mod hashmap;
#[cfg(feature = "rocksdb")]
pub mod rocksdb;

pub use hashmap::HashMapStore;
#[cfg(feature = "rocksdb")]
pub use self::rocksdb::RocksDbStore;

/// Persistent keyed store holding one cumulative count per key.
///
/// Each call is one store visit. Implementations may block on I/O.
pub trait KeyedStore<K>: Send
where
    K: StreamKey,
{
    /// Read the cumulative count for `key`, `None` if never written.
    fn get(&self, key: &K) -> Result<Option<Count>, StoreError>;

    /// Overwrite the cumulative count for `key`.
    fn put(&mut self, key: &K, count: Count) -> Result<(), StoreError>;
}

impl<K, S> KeyedStore<K> for Box<S>
where
    K: StreamKey,
    S: KeyedStore<K> + ?Sized,
{
    fn get(&self, key: &K) -> Result<Option<Count>, StoreError> {
        (**self).get(key)
    }

    fn put(&mut self, key: &K, count: Count) -> Result<(), StoreError> {
        (**self).put(key, count)
    }
}
