use ahash::AHashMap;

use crate::error::{AggregationError, AggregationResult};
use crate::types::{Count, StreamKey};

/// In-memory per-key pending deltas for buffered mode.
///
/// # Invariant
/// Every key present has a strictly positive pending delta. `add` rejects
/// non-positive deltas instead of storing them.
#[derive(Debug, Clone)]
pub struct Bundle<K> {
    pending: AHashMap<K, Count>,
}

impl<K: StreamKey> Bundle<K> {
    pub fn new() -> Self {
        Self {
            pending: AHashMap::new(),
        }
    }

    /// Add `delta` to the pending sum for `key`, returning the new sum.
    ///
    /// A sum that would overflow is rejected and the pending entry is left
    /// as it was.
    pub fn add(&mut self, key: K, delta: Count) -> AggregationResult<Count> {
        if delta <= 0 {
            return Err(AggregationError::integrity(&key, delta));
        }
        let current = self.pending.get(&key).copied().unwrap_or(0);
        let updated = current
            .checked_add(delta)
            .ok_or_else(|| AggregationError::integrity(&key, delta))?;
        self.pending.insert(key, updated);
        Ok(updated)
    }

    /// Pending delta for `key`, if any.
    pub fn get(&self, key: &K) -> Option<Count> {
        self.pending.get(key).copied()
    }

    /// Number of distinct buffered keys.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Move every pending entry out, leaving the bundle empty.
    ///
    /// The drain loop works on this snapshot, so nothing added afterwards can
    /// be mixed into an in-flight drain.
    pub fn take_snapshot(&mut self) -> Vec<(K, Count)> {
        std::mem::take(&mut self.pending).into_iter().collect()
    }

    /// Put back entries that were not applied, summing with anything
    /// buffered since the snapshot.
    pub(crate) fn restore(&mut self, entries: impl IntoIterator<Item = (K, Count)>) {
        for (key, delta) in entries {
            let slot = self.pending.entry(key).or_insert(0);
            *slot = slot.saturating_add(delta);
        }
    }
}

impl<K: StreamKey> Default for Bundle<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_accumulates_per_key() {
        let mut bundle = Bundle::new();
        assert_eq!(bundle.add(1i32, 1).unwrap(), 1);
        assert_eq!(bundle.add(2i32, 1).unwrap(), 1);
        assert_eq!(bundle.add(1i32, 1).unwrap(), 2);
        assert_eq!(bundle.add(1i32, 4).unwrap(), 6);

        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.get(&1), Some(6));
        assert_eq!(bundle.get(&2), Some(1));
        assert_eq!(bundle.get(&3), None);
    }

    #[test]
    fn test_non_positive_delta_rejected() {
        let mut bundle = Bundle::new();
        bundle.add(1i32, 2).unwrap();

        let err = bundle.add(1i32, 0).unwrap_err();
        assert!(matches!(err, AggregationError::DrainIntegrity { delta: 0, .. }));
        let err = bundle.add(3i32, -1).unwrap_err();
        assert!(matches!(err, AggregationError::DrainIntegrity { delta: -1, .. }));

        // Rejected deltas leave the bundle untouched.
        assert_eq!(bundle.get(&1), Some(2));
        assert_eq!(bundle.get(&3), None);
        assert_eq!(bundle.len(), 1);
    }

    #[test]
    fn test_overflowing_add_rejected() {
        let mut bundle = Bundle::new();
        bundle.add(1i32, Count::MAX - 1).unwrap();

        let err = bundle.add(1i32, 2).unwrap_err();
        assert!(matches!(err, AggregationError::DrainIntegrity { delta: 2, .. }));
        assert_eq!(bundle.get(&1), Some(Count::MAX - 1));

        assert_eq!(bundle.add(1i32, 1).unwrap(), Count::MAX);
    }

    #[test]
    fn test_take_snapshot_empties_bundle() {
        let mut bundle = Bundle::new();
        bundle.add(5i32, 1).unwrap();
        bundle.add(5i32, 1).unwrap();
        bundle.add(6i32, 1).unwrap();

        let mut snapshot = bundle.take_snapshot();
        snapshot.sort();
        assert_eq!(snapshot, vec![(5, 2), (6, 1)]);
        assert!(bundle.is_empty());
        assert!(bundle.take_snapshot().is_empty());
    }

    #[test]
    fn test_restore_merges_with_new_entries() {
        let mut bundle = Bundle::new();
        bundle.add(1i32, 3).unwrap();
        let snapshot = bundle.take_snapshot();

        bundle.add(1i32, 1).unwrap();
        bundle.restore(snapshot);

        assert_eq!(bundle.get(&1), Some(4));
    }
}
