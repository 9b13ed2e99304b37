//! Domain reconcilers: canonical in-memory state per domain, merged from
//! push events and REST snapshots.
//!
//! DESIGN
//! ======
//! Precedence is last-write-wins in application order. Nothing compares
//! timestamps or sequence numbers, so a slow snapshot that lands after a
//! newer push overwrites it. Reconcilers are plain values owned by one task
//! (see [`crate::dashboard`]); none of them lock.

pub mod activity;
pub mod counts;
pub mod notifications;

use crate::realtime::PushEvent;

pub use activity::ActivityReconciler;
pub use counts::CountReconciler;
pub use notifications::NotificationReconciler;

/// What the owner should do after a push was offered to a reconciler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    /// State changed; re-project.
    Applied,
    /// Nothing changed (duplicate, or an event this reconciler ignores).
    Unchanged,
    /// The push only signals that the domain moved; fetch a snapshot.
    NeedsSnapshot,
}

pub trait Reconciler {
    type Snapshot;

    fn accepts(&self, event: &PushEvent) -> bool;

    fn apply_push(&mut self, event: &PushEvent) -> PushOutcome;

    fn apply_snapshot(&mut self, snapshot: Self::Snapshot);
}
