// Copyright © 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Latest shared nonant values received from the hub.
//!
//! The cache is written by the hub-facing receiver and read by the control
//! loop. Every write swaps in a whole new snapshot, so a drain always sees
//! one complete push. Draining does not clear the cache: if nothing new has
//! arrived the next iteration re-applies the same values.

use arc_swap::ArcSwap;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::types::{NonantIndex, Scenario};

// ---------------------------------------------------------------------------
// NonantPush
// ---------------------------------------------------------------------------

/// One complete push of shared values.
///
/// `shared` applies to every scenario; `by_scenario` entries take precedence
/// for the named scenario.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NonantPush {
    pub shared: BTreeMap<NonantIndex, f64>,
    pub by_scenario: BTreeMap<String, BTreeMap<NonantIndex, f64>>,
}

impl NonantPush {
    pub fn broadcast(values: BTreeMap<NonantIndex, f64>) -> Self {
        Self { shared: values, by_scenario: BTreeMap::new() }
    }

    pub fn per_scenario(values: BTreeMap<String, BTreeMap<NonantIndex, f64>>) -> Self {
        Self { shared: BTreeMap::new(), by_scenario: values }
    }

    /// Current values of every scenario, keyed by scenario name.
    pub fn from_scenarios(scenarios: &[Scenario]) -> Self {
        Self::per_scenario(
            scenarios
                .iter()
                .map(|s| (s.name.clone(), s.values()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.shared.is_empty() && self.by_scenario.values().all(BTreeMap::is_empty)
    }

    fn value_for(&self, scenario: &str, index: &NonantIndex) -> Option<f64> {
        self.by_scenario
            .get(scenario)
            .and_then(|m| m.get(index))
            .or_else(|| self.shared.get(index))
            .copied()
    }
}

// ---------------------------------------------------------------------------
// NonantSnapshot
// ---------------------------------------------------------------------------

/// A push plus its freshness marker. Generation 0 is the snapshot taken at
/// preparation; every hub push increments it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NonantSnapshot {
    pub push: NonantPush,
    pub generation: u64,
}

/// Outcome of one drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainSummary {
    pub generation: u64,
    /// Number of (scenario, index) values written.
    pub applied: usize,
}

// ---------------------------------------------------------------------------
// NonantCache
// ---------------------------------------------------------------------------

/// Shared handle; clones refer to the same cache.
#[derive(Debug, Clone, Default)]
pub struct NonantCache {
    inner: Arc<ArcSwap<NonantSnapshot>>,
}

impl NonantCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached values with a new push.
    pub fn store(&self, push: NonantPush) -> u64 {
        let prev = self.inner.rcu(|prev| NonantSnapshot {
            push: push.clone(),
            generation: prev.generation + 1,
        });
        prev.generation + 1
    }

    /// Record the scenarios' initial values as generation 0. A push that
    /// already arrived is newer and is kept.
    pub fn seed_from(&self, scenarios: &[Scenario]) {
        let seeded = NonantPush::from_scenarios(scenarios);
        self.inner.rcu(|prev| {
            if prev.generation == 0 {
                Arc::new(NonantSnapshot { push: seeded.clone(), generation: 0 })
            } else {
                Arc::clone(prev)
            }
        });
    }

    pub fn snapshot(&self) -> Arc<NonantSnapshot> {
        self.inner.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.inner.load().generation
    }

    /// Apply the cached values to each scenario's nonant storage. Values for
    /// indices a scenario does not carry are skipped. The cache is unchanged.
    pub fn drain_into(&self, scenarios: &mut [Scenario]) -> DrainSummary {
        let snap = self.inner.load_full();
        let mut applied = 0;
        for scenario in scenarios.iter_mut() {
            let name = scenario.name.clone();
            for (index, slot) in scenario.nonants.iter_mut() {
                if let Some(v) = snap.push.value_for(&name, index) {
                    slot.value = v;
                    applied += 1;
                }
            }
        }
        DrainSummary { generation: snap.generation, applied }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NonantSlot;

    fn scen(name: &str, value: f64) -> Scenario {
        Scenario::new(name, 0.5).with_nonant(
            NonantIndex::root(1),
            NonantSlot { value, ..NonantSlot::with_rho(1.0) },
        )
    }

    #[test]
    fn drain_before_any_push_is_harmless() {
        let cache = NonantCache::new();
        let mut s = vec![scen("a", 3.0)];
        let summary = cache.drain_into(&mut s);
        assert_eq!(summary, DrainSummary { generation: 0, applied: 0 });
        assert_eq!(s[0].value(&NonantIndex::root(1)), Some(3.0));
    }

    #[test]
    fn drain_applies_push_and_keeps_it() {
        let cache = NonantCache::new();
        let mut s = vec![scen("a", 0.0), scen("b", 0.0)];
        let mut values = BTreeMap::new();
        values.insert(NonantIndex::root(1), 1.0);
        assert_eq!(cache.store(NonantPush::broadcast(values)), 1);

        cache.drain_into(&mut s);
        assert_eq!(s[0].value(&NonantIndex::root(1)), Some(1.0));
        assert_eq!(s[1].value(&NonantIndex::root(1)), Some(1.0));

        // Solver moves the value; the next drain without a push restores it.
        s[0].nonants.get_mut(&NonantIndex::root(1)).expect("test: slot").value = 7.0;
        let summary = cache.drain_into(&mut s);
        assert_eq!(summary.generation, 1);
        assert_eq!(s[0].value(&NonantIndex::root(1)), Some(1.0));
    }

    #[test]
    fn per_scenario_values_override_broadcast() {
        let cache = NonantCache::new();
        let mut shared = BTreeMap::new();
        shared.insert(NonantIndex::root(1), 1.0);
        let mut only_b = BTreeMap::new();
        only_b.insert(NonantIndex::root(1), 9.0);
        let mut by = BTreeMap::new();
        by.insert("b".to_string(), only_b);
        cache.store(NonantPush { shared, by_scenario: by });

        let mut s = vec![scen("a", 0.0), scen("b", 0.0)];
        cache.drain_into(&mut s);
        assert_eq!(s[0].value(&NonantIndex::root(1)), Some(1.0));
        assert_eq!(s[1].value(&NonantIndex::root(1)), Some(9.0));
    }

    #[test]
    fn unknown_indices_are_skipped() {
        let cache = NonantCache::new();
        let mut values = BTreeMap::new();
        values.insert(NonantIndex::root(42), 5.0);
        cache.store(NonantPush::broadcast(values));
        let mut s = vec![scen("a", 2.0)];
        let summary = cache.drain_into(&mut s);
        assert_eq!(summary.applied, 0);
        assert_eq!(s[0].value(&NonantIndex::root(1)), Some(2.0));
    }

    #[test]
    fn seed_does_not_clobber_newer_push() {
        let cache = NonantCache::new();
        cache.seed_from(&[scen("a", 4.0)]);
        assert_eq!(cache.generation(), 0);
        assert!(!cache.snapshot().push.is_empty());

        let mut values = BTreeMap::new();
        values.insert(NonantIndex::root(1), 1.0);
        cache.store(NonantPush::broadcast(values));
        cache.seed_from(&[scen("a", 4.0)]);
        assert_eq!(cache.generation(), 1);
        assert_eq!(cache.snapshot().push.shared.get(&NonantIndex::root(1)), Some(&1.0));
    }

    #[test]
    fn concurrent_writer_never_tears() {
        let cache = NonantCache::new();
        let writer = cache.clone();
        let handle = std::thread::spawn(move || {
            for k in 1..=500u32 {
                let values = (0..8)
                    .map(|i| (NonantIndex::root(i), k as f64))
                    .collect();
                writer.store(NonantPush::broadcast(values));
            }
        });
        let mut local = vec![(0..8).fold(Scenario::new("scen0", 1.0), |s, i| {
            s.with_nonant(NonantIndex::root(i), NonantSlot::with_rho(1.0))
        })];
        for _ in 0..500 {
            let drained = cache.drain_into(&mut local);
            if drained.generation == 0 {
                continue;
            }
            assert_eq!(drained.applied, 8);
            let mut seen = local[0].nonants.values().map(|slot| slot.value);
            let first = seen.next().expect("test: drained value");
            assert!(seen.all(|v| v == first), "torn drain at gen {}", drained.generation);
            assert_eq!(first, drained.generation as f64);
        }
        handle.join().expect("test: writer thread");
        assert_eq!(cache.generation(), 500);
    }
}
