//! Contact-form notifications.
//!
//! The backend pushes only a contact *count*, never the records, so a
//! contact `count-update` asks the owner for a fresh snapshot. Read state
//! changes only through [`NotificationReconciler::confirm_read`], called
//! after the server accepted the mark-read request.

#[cfg(test)]
#[path = "notifications_test.rs"]
mod notifications_test;

use super::{PushOutcome, Reconciler};
use crate::api::types::NotificationRecord;
use crate::realtime::PushEvent;

/// Domain key of contact submissions in `count-update` events.
pub const CONTACT_KEY: &str = "contact";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotificationReconciler {
    items: Vec<NotificationRecord>,
    loaded: bool,
}

impl NotificationReconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications, most recent first.
    #[must_use]
    pub fn items(&self) -> &[NotificationRecord] {
        &self.items
    }

    pub fn unread(&self) -> impl Iterator<Item = &NotificationRecord> {
        self.items.iter().filter(|n| !n.is_read)
    }

    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.unread().count()
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Mark `id` read after the server confirmed it. Returns whether an
    /// unread item changed.
    pub fn confirm_read(&mut self, id: &str) -> bool {
        match self.items.iter_mut().find(|n| n.id == id && !n.is_read) {
            Some(item) => {
                item.is_read = true;
                true
            }
            None => false,
        }
    }
}

impl Reconciler for NotificationReconciler {
    type Snapshot = Vec<NotificationRecord>;

    fn accepts(&self, event: &PushEvent) -> bool {
        matches!(event, PushEvent::CountUpdate { model, .. } if model == CONTACT_KEY)
    }

    fn apply_push(&mut self, event: &PushEvent) -> PushOutcome {
        if self.accepts(event) {
            PushOutcome::NeedsSnapshot
        } else {
            PushOutcome::Unchanged
        }
    }

    fn apply_snapshot(&mut self, mut snapshot: Self::Snapshot) {
        snapshot.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.items = snapshot;
        self.loaded = true;
    }
}
