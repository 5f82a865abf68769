use std::collections::{HashMap, HashSet};

use latencycrab_core::aggregate::{IdentityKey, KeyedCountAggregator};
use latencycrab_core::config::AggregatorConfig;
use latencycrab_core::state::HashMapStore;
use latencycrab_core::types::Count;
use proptest::prelude::*;

type Aggregator = KeyedCountAggregator<u8, IdentityKey, HashMapStore>;

fn open(config: &AggregatorConfig) -> Aggregator {
    let mut op = KeyedCountAggregator::new(IdentityKey, HashMapStore::new(), config);
    op.open(0).unwrap();
    op
}

fn expected_counts(keys: &[u8]) -> HashMap<u8, Count> {
    let mut counts = HashMap::new();
    for key in keys {
        *counts.entry(*key).or_insert(0) += 1;
    }
    counts
}

/// Feed `events`, flushing after every event marked `true`, then finish.
/// Returns final store contents, every emission and the visit count.
fn run(
    config: &AggregatorConfig,
    events: &[(u8, bool)],
) -> (HashMap<u8, Count>, Vec<(u8, Count)>, u64) {
    let mut op = open(config);
    let mut output = Vec::new();
    for (now, (key, flush_after)) in events.iter().enumerate() {
        op.process_element(key, &mut output).unwrap();
        if *flush_after {
            op.flush(now as i64, &mut output).unwrap();
        }
    }
    let snapshot = op.finish(&mut output).unwrap();
    let stored = op.into_store().to_map::<u8>().unwrap();
    (stored, output, snapshot.visits)
}

fn no_flushes(keys: &[u8]) -> Vec<(u8, bool)> {
    keys.iter().map(|key| (*key, false)).collect()
}

proptest! {
    #[test]
    fn count_is_conserved_under_any_flush_schedule(
        events in prop::collection::vec((0u8..16, any::<bool>()), 0..200)
    ) {
        let keys: Vec<u8> = events.iter().map(|(key, _)| *key).collect();
        let (stored, output, _) = run(&AggregatorConfig::buffered(1_000), &events);

        prop_assert_eq!(&stored, &expected_counts(&keys));

        // The last emission per key carries its final count.
        let mut last = HashMap::new();
        for (key, count) in output {
            last.insert(key, count);
        }
        prop_assert_eq!(last, stored);
    }

    #[test]
    fn immediate_and_buffered_store_the_same_counts(
        events in prop::collection::vec((0u8..16, any::<bool>()), 0..200)
    ) {
        let keys: Vec<u8> = events.iter().map(|(key, _)| *key).collect();
        let (immediate, _, _) = run(&AggregatorConfig::immediate(), &no_flushes(&keys));
        let (buffered, _, _) = run(&AggregatorConfig::buffered(1_000), &events);

        prop_assert_eq!(immediate, buffered);
    }

    #[test]
    fn buffering_never_costs_more_visits(
        events in prop::collection::vec((0u8..16, any::<bool>()), 0..200)
    ) {
        let keys: Vec<u8> = events.iter().map(|(key, _)| *key).collect();
        let (_, emitted, immediate_visits) = run(&AggregatorConfig::immediate(), &no_flushes(&keys));
        let (_, _, buffered_visits) = run(&AggregatorConfig::buffered(1_000), &events);

        prop_assert_eq!(immediate_visits, 2 * keys.len() as u64);
        prop_assert_eq!(emitted.len(), keys.len());
        prop_assert!(buffered_visits <= immediate_visits);
    }

    #[test]
    fn single_flush_matches_immediate_only_for_distinct_keys(
        keys in prop::collection::vec(0u8..32, 1..64)
    ) {
        let (_, _, immediate_visits) = run(&AggregatorConfig::immediate(), &no_flushes(&keys));
        let (_, _, buffered_visits) = run(&AggregatorConfig::buffered(1_000), &no_flushes(&keys));

        let distinct = keys.iter().collect::<HashSet<_>>().len();
        prop_assert_eq!(buffered_visits, 2 * distinct as u64);
        prop_assert_eq!(buffered_visits == immediate_visits, distinct == keys.len());
    }
}

#[test]
fn test_drain_of_empty_bundle_touches_nothing() {
    let mut op = open(&AggregatorConfig::buffered(1_000));
    let mut output = Vec::new();

    for now in 0..3 {
        assert_eq!(op.flush(now, &mut output).unwrap(), 0);
    }
    assert!(output.is_empty());
    assert_eq!(op.visits(), 0);
    assert!(op.store().is_empty());
}
