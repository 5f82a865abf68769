//! Error types for the aggregation core.
//!
//! ```text
//! AggregationError
//! ├── KeySelection     - selector failed for one record (record-fatal)
//! ├── StoreAccess      - keyed store get/put failed (operator-fatal)
//! ├── DrainIntegrity   - bad delta or count overflow (operator-fatal)
//! └── InvalidState     - lifecycle call out of order (operator-fatal)
//! ```
//!
//! Runtime plumbing (channels, gates, the task loop) keeps using
//! `anyhow::Result`; these convert into it through `?`.

use std::fmt;

use thiserror::Error;

use crate::aggregate::OperatorState;
use crate::types::Count;

/// Failure inside a [`KeyedStore`](crate::state::KeyedStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Key or value could not be encoded/decoded.
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// The underlying engine refused the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Error reported by the embedded RocksDB engine.
    #[cfg(feature = "rocksdb")]
    #[error("rocksdb error: {0}")]
    RocksDb(#[from] rocksdb::Error),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// The key selector could not derive a key from an input record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct KeySelectionError {
    pub reason: String,
}

impl KeySelectionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Which half of a visit failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Get,
    Put,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOp::Get => f.write_str("get"),
            StoreOp::Put => f.write_str("put"),
        }
    }
}

/// Errors surfaced by [`KeyedCountAggregator`](crate::aggregate::KeyedCountAggregator).
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("key selection failed: {0}")]
    KeySelection(#[from] KeySelectionError),

    #[error("store {op} failed for key {key}")]
    StoreAccess {
        op: StoreOp,
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("drain integrity violated for key {key}: pending delta {delta}")]
    DrainIntegrity { key: String, delta: Count },

    #[error("cannot {action} while operator is {state}")]
    InvalidState {
        state: OperatorState,
        action: &'static str,
    },
}

impl AggregationError {
    pub(crate) fn store(op: StoreOp, key: &impl fmt::Debug, source: StoreError) -> Self {
        Self::StoreAccess {
            op,
            key: format!("{key:?}"),
            source,
        }
    }

    pub(crate) fn integrity(key: &impl fmt::Debug, delta: Count) -> Self {
        Self::DrainIntegrity {
            key: format!("{key:?}"),
            delta,
        }
    }

    /// Whether the operator must stop.
    ///
    /// Only key selection failures are scoped to a single record; the task
    /// loop may skip those when per-record isolation is enabled.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AggregationError::KeySelection(_))
    }
}

/// Result alias for aggregation operations.
pub type AggregationResult<T> = std::result::Result<T, AggregationError>;
