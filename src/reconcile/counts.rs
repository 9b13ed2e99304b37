//! Per-domain counters.

#[cfg(test)]
#[path = "counts_test.rs"]
mod counts_test;

use std::collections::BTreeMap;

use super::{PushOutcome, Reconciler};
use crate::realtime::PushEvent;

/// Domain key to latest count. A key is absent until its first value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CountReconciler {
    counts: BTreeMap<String, u64>,
}

impl CountReconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<u64> {
        self.counts.get(key).copied()
    }

    /// Whether `key` has received any value yet.
    #[must_use]
    pub fn is_loaded(&self, key: &str) -> bool {
        self.counts.contains_key(key)
    }

    /// Replace one key from a single-resource REST read.
    pub fn apply_snapshot_key(&mut self, key: &str, count: u64) {
        tracing::debug!(key, count, "count snapshot");
        self.counts.insert(key.to_owned(), count);
    }
}

impl Reconciler for CountReconciler {
    type Snapshot = BTreeMap<String, u64>;

    fn accepts(&self, event: &PushEvent) -> bool {
        matches!(event, PushEvent::CountUpdate { .. })
    }

    fn apply_push(&mut self, event: &PushEvent) -> PushOutcome {
        let PushEvent::CountUpdate { model, count } = event else {
            return PushOutcome::Unchanged;
        };
        tracing::debug!(model = model.as_str(), count = *count, "count push");
        match self.counts.insert(model.clone(), *count) {
            Some(previous) if previous == *count => PushOutcome::Unchanged,
            _ => PushOutcome::Applied,
        }
    }

    /// Keys present in `snapshot` are replaced; other keys keep their value.
    fn apply_snapshot(&mut self, snapshot: Self::Snapshot) {
        for (key, count) in snapshot {
            self.apply_snapshot_key(&key, count);
        }
    }
}
