//! Embedded RocksDB keyed store.
//!
//! Keys and counts are bincode-encoded, matching [`HashMapStore`](super::HashMapStore).
//! Each `put` is a single RocksDB write with the WAL enabled, so a count
//! survives a crash once `put` returns.

use std::path::{Path, PathBuf};

use rocksdb::{DBCompressionType, Options, DB};
use tracing::info;

use super::KeyedStore;
use crate::error::StoreError;
use crate::types::{Count, StreamKey};

/// RocksDB-backed keyed store.
pub struct RocksDbStore {
    db: DB,
    path: PathBuf,
}

impl RocksDbStore {
    /// Open (or create) a database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(DBCompressionType::Lz4);

        let db = DB::open(&opts, &path)?;
        info!(path = %path.display(), "opened rocksdb keyed store");
        Ok(Self { db, path })
    }

    /// Filesystem location of the database.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<K: StreamKey> KeyedStore<K> for RocksDbStore {
    fn get(&self, key: &K) -> Result<Option<Count>, StoreError> {
        let kbytes = bincode::serialize(key)?;
        match self.db.get(&kbytes)? {
            Some(vbytes) => Ok(Some(bincode::deserialize(&vbytes)?)),
            None => Ok(None),
        }
    }

    fn put(&mut self, key: &K, count: Count) -> Result<(), StoreError> {
        let kbytes = bincode::serialize(key)?;
        let vbytes = bincode::serialize(&count)?;
        self.db.put(kbytes, vbytes)?;
        Ok(())
    }
}
