use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::bundle::Bundle;
use super::metrics::VisitCounter;
use crate::error::{AggregationError, AggregationResult, StoreOp};
use crate::state::KeyedStore;
use crate::types::{Count, StreamKey};

/// Execution mode, fixed when the operator is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregationMode {
    /// Every event reads and writes the store and emits immediately.
    Immediate,
    /// Events accumulate in the bundle until the next flush.
    Buffered { allowed_latency: Duration },
}

impl AggregationMode {
    /// A zero allowed latency disables buffering.
    pub fn from_allowed_latency(allowed_latency: Duration) -> Self {
        if allowed_latency.is_zero() {
            AggregationMode::Immediate
        } else {
            AggregationMode::Buffered { allowed_latency }
        }
    }

    pub fn allowed_latency(&self) -> Duration {
        match self {
            AggregationMode::Immediate => Duration::ZERO,
            AggregationMode::Buffered { allowed_latency } => *allowed_latency,
        }
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self, AggregationMode::Buffered { .. })
    }
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationMode::Immediate => f.write_str("immediate"),
            AggregationMode::Buffered { allowed_latency } => {
                write!(f, "buffered({}ms)", allowed_latency.as_millis())
            }
        }
    }
}

/// Per-event behavior for the chosen mode.
///
/// Only the buffered variant owns a bundle, so immediate mode cannot
/// accidentally buffer.
#[derive(Debug)]
pub enum Strategy<K> {
    Immediate,
    Buffered {
        bundle: Bundle<K>,
        allowed_latency: Duration,
    },
}

impl<K: StreamKey> Strategy<K> {
    pub fn new(mode: AggregationMode) -> Self {
        match mode {
            AggregationMode::Immediate => Strategy::Immediate,
            AggregationMode::Buffered { allowed_latency } => Strategy::Buffered {
                bundle: Bundle::new(),
                allowed_latency,
            },
        }
    }

    pub fn mode(&self) -> AggregationMode {
        match self {
            Strategy::Immediate => AggregationMode::Immediate,
            Strategy::Buffered {
                allowed_latency, ..
            } => AggregationMode::Buffered {
                allowed_latency: *allowed_latency,
            },
        }
    }

    pub fn bundle(&self) -> Option<&Bundle<K>> {
        match self {
            Strategy::Immediate => None,
            Strategy::Buffered { bundle, .. } => Some(bundle),
        }
    }

    /// Distinct keys waiting for a flush; always 0 in immediate mode.
    pub fn bundle_size(&self) -> usize {
        self.bundle().map_or(0, Bundle::len)
    }

    /// Apply one event worth `delta` for `key`.
    pub(crate) fn on_element<S: KeyedStore<K>>(
        &mut self,
        key: K,
        delta: Count,
        store: &mut S,
        visits: &mut VisitCounter,
        output: &mut Vec<(K, Count)>,
    ) -> AggregationResult<()> {
        match self {
            Strategy::Immediate => {
                let count = apply_delta(store, visits, &key, delta)?;
                output.push((key, count));
            }
            Strategy::Buffered { bundle, .. } => {
                bundle.add(key, delta)?;
            }
        }
        Ok(())
    }

    /// Drain every buffered delta into the store, returning how many keys
    /// were applied.
    ///
    /// On a store failure the entries that were not applied go back into the
    /// bundle, so the bundle and the store together still account for every
    /// delta.
    pub(crate) fn drain<S: KeyedStore<K>>(
        &mut self,
        store: &mut S,
        visits: &mut VisitCounter,
        output: &mut Vec<(K, Count)>,
    ) -> AggregationResult<usize> {
        let bundle = match self {
            Strategy::Immediate => return Ok(0),
            Strategy::Buffered { bundle, .. } => bundle,
        };
        if bundle.is_empty() {
            return Ok(0);
        }

        let mut entries = bundle.take_snapshot().into_iter();
        let mut applied = 0;
        while let Some((key, delta)) = entries.next() {
            if delta <= 0 {
                bundle.restore(entries);
                return Err(AggregationError::integrity(&key, delta));
            }
            match apply_delta(store, visits, &key, delta) {
                Ok(count) => {
                    output.push((key, count));
                    applied += 1;
                }
                Err(err) => {
                    bundle.restore(std::iter::once((key, delta)).chain(entries));
                    return Err(err);
                }
            }
        }
        Ok(applied)
    }
}

/// Read-modify-write of one key: one get plus one put.
///
/// A count that would overflow fails after the get and before the put, so
/// the stored value is never wrapped.
fn apply_delta<K, S>(
    store: &mut S,
    visits: &mut VisitCounter,
    key: &K,
    delta: Count,
) -> AggregationResult<Count>
where
    K: StreamKey,
    S: KeyedStore<K>,
{
    visits.record(StoreOp::Get);
    let current = store
        .get(key)
        .map_err(|e| AggregationError::store(StoreOp::Get, key, e))?
        .unwrap_or(0);

    let updated = current
        .checked_add(delta)
        .ok_or_else(|| AggregationError::integrity(key, delta))?;
    visits.record(StoreOp::Put);
    store
        .put(key, updated)
        .map_err(|e| AggregationError::store(StoreOp::Put, key, e))?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::HashMapStore;

    #[test]
    fn test_mode_from_allowed_latency() {
        assert_eq!(
            AggregationMode::from_allowed_latency(Duration::ZERO),
            AggregationMode::Immediate
        );
        let mode = AggregationMode::from_allowed_latency(Duration::from_millis(10_000));
        assert!(mode.is_buffered());
        assert_eq!(mode.allowed_latency(), Duration::from_secs(10));
        assert_eq!(mode.to_string(), "buffered(10000ms)");
    }

    #[test]
    fn test_immediate_strategy_has_no_bundle() {
        let strategy = Strategy::<i32>::new(AggregationMode::Immediate);
        assert!(strategy.bundle().is_none());
        assert_eq!(strategy.bundle_size(), 0);
    }

    #[test]
    fn test_drain_restores_unapplied_entries_on_integrity_error() {
        let mut strategy = Strategy::<i32>::new(AggregationMode::from_allowed_latency(
            Duration::from_millis(5),
        ));
        if let Strategy::Buffered { bundle, .. } = &mut strategy {
            bundle.restore(vec![(1, -2)]);
        }

        let mut store = HashMapStore::new();
        let mut visits = VisitCounter::default();
        let mut output = Vec::new();
        let err = strategy
            .drain(&mut store, &mut visits, &mut output)
            .unwrap_err();

        assert!(matches!(err, AggregationError::DrainIntegrity { delta: -2, .. }));
        assert_eq!(visits.total(), 0);
        assert!(output.is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_drain_overflow_keeps_delta_pending() {
        let mut strategy = Strategy::<i32>::new(AggregationMode::from_allowed_latency(
            Duration::from_millis(5),
        ));
        let mut store = HashMapStore::new();
        store.put(&1, Count::MAX).unwrap();
        let mut visits = VisitCounter::default();
        let mut output = Vec::new();

        strategy
            .on_element(1, 1, &mut store, &mut visits, &mut output)
            .unwrap();
        let err = strategy
            .drain(&mut store, &mut visits, &mut output)
            .unwrap_err();

        assert!(matches!(err, AggregationError::DrainIntegrity { delta: 1, .. }));
        assert_eq!(visits.reads(), 1);
        assert_eq!(visits.writes(), 0);
        assert!(output.is_empty());
        assert_eq!(store.get(&1).unwrap(), Some(Count::MAX));
        assert_eq!(strategy.bundle().unwrap().get(&1), Some(1));
    }
}
