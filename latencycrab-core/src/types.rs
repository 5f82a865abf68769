use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Processing time in milliseconds since epoch.
pub type ProcessingTime = i64;

/// Running total persisted per key.
pub type Count = i64;

/// A record in the stream, carrying user data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamRecord<T> {
    pub value: T,
}

impl<T> StreamRecord<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

/// The unit flowing through a task's channels.
///
/// Control elements travel in-band with data so that a flush request can
/// never interleave with the processing of a single record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StreamElement<T> {
    /// User data record.
    Record(StreamRecord<T>),
    /// Explicit request to drain any buffered aggregation state.
    Flush,
    /// End of bounded stream.
    End,
}

impl<T> StreamElement<T> {
    /// Create a record element.
    pub fn record(value: T) -> Self {
        Self::Record(StreamRecord::new(value))
    }
}

/// Trait bound for types that can flow through the stream.
/// All user data types must satisfy this.
pub trait StreamData: Send + Clone + Serialize + for<'de> Deserialize<'de> + 'static {}

// Blanket implementation: any type satisfying the bounds is StreamData.
impl<T> StreamData for T where T: Send + Clone + Serialize + for<'de> Deserialize<'de> + 'static {}

/// Trait bound for aggregation keys.
///
/// Keys are hashed into the in-memory bundle and serialized into the store,
/// and show up in error messages via `Debug`.
pub trait StreamKey: StreamData + Hash + Eq + Debug {}

impl<T> StreamKey for T where T: StreamData + Hash + Eq + Debug {}

#[cfg(test)]
#[path = "tests/types_tests.rs"]
mod tests;
