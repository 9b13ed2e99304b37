//! Recent-activity feed: newest first, unique by id, bounded.

#[cfg(test)]
#[path = "activity_test.rs"]
mod activity_test;

use std::collections::VecDeque;

use super::{PushOutcome, Reconciler};
use crate::api::types::ActivityRecord;
use crate::config::DEFAULT_ACTIVITY_LIMIT;
use crate::realtime::PushEvent;

/// Order is arrival order, not `createdAt`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityReconciler {
    entries: VecDeque<ActivityRecord>,
    limit: usize,
}

impl Default for ActivityReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVITY_LIMIT)
    }
}

impl ActivityReconciler {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self { entries: VecDeque::with_capacity(limit), limit }
    }

    #[must_use]
    pub fn entries(&self) -> &VecDeque<ActivityRecord> {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }
}

impl Reconciler for ActivityReconciler {
    type Snapshot = Vec<ActivityRecord>;

    fn accepts(&self, event: &PushEvent) -> bool {
        matches!(event, PushEvent::NewActivity(_))
    }

    fn apply_push(&mut self, event: &PushEvent) -> PushOutcome {
        let PushEvent::NewActivity(record) = event else {
            return PushOutcome::Unchanged;
        };
        if record.id.is_empty() {
            tracing::warn!(action = %record.action, "activity without id dropped");
            return PushOutcome::Unchanged;
        }
        if self.contains(&record.id) {
            tracing::debug!(id = %record.id, "duplicate activity ignored");
            return PushOutcome::Unchanged;
        }
        self.entries.push_front(record.clone());
        self.entries.truncate(self.limit);
        PushOutcome::Applied
    }

    /// Replace the feed, keeping the first occurrence of each id. Records
    /// without an id are dropped.
    fn apply_snapshot(&mut self, snapshot: Self::Snapshot) {
        self.entries.clear();
        for record in snapshot {
            if self.entries.len() == self.limit {
                break;
            }
            if record.id.is_empty() {
                tracing::warn!(action = %record.action, "activity without id dropped");
                continue;
            }
            if !self.contains(&record.id) {
                self.entries.push_back(record);
            }
        }
    }
}
