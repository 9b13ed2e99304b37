//! Pure projections from reconciler state to display-ready values.
//!
//! Nothing here owns state or reads the clock; callers pass `now` so the
//! periodic relative-time refresh is just a re-projection.

#[cfg(test)]
#[path = "projector_test.rs"]
mod projector_test;

use serde::Serialize;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::api::types::{ActivityKind, NotificationRecord};
use crate::reconcile::{ActivityReconciler, CountReconciler, NotificationReconciler};

/// Unread notifications shown in the badge preview.
pub const PREVIEW_LIMIT: usize = 5;

/// One dashboard tile bound to a domain key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileSpec {
    pub key: &'static str,
    pub label: &'static str,
}

pub const DEFAULT_TILES: [TileSpec; 4] = [
    TileSpec { key: "project", label: "Total Projects" },
    TileSpec { key: "blog", label: "Blog Posts" },
    TileSpec { key: "skill", label: "Skills" },
    TileSpec { key: "testimonial", label: "Testimonials" },
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatTile {
    pub key: &'static str,
    pub label: &'static str,
    pub value: u64,
    /// No value has arrived for this key yet.
    pub loading: bool,
}

/// Display color class per activity type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Green,
    Blue,
    Red,
    Purple,
    Yellow,
    Indigo,
    Gray,
}

impl From<ActivityKind> for Tone {
    fn from(kind: ActivityKind) -> Self {
        match kind {
            ActivityKind::Create => Self::Green,
            ActivityKind::Update => Self::Blue,
            ActivityKind::Delete => Self::Red,
            ActivityKind::Publish => Self::Purple,
            ActivityKind::Unpublish => Self::Yellow,
            ActivityKind::Upload => Self::Indigo,
            ActivityKind::Other => Self::Gray,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActivityRow {
    pub id: String,
    pub kind: ActivityKind,
    pub action: String,
    /// Relative-time label such as "5 minutes ago".
    pub when: String,
    pub tone: Tone,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NotificationBadge {
    pub unread: usize,
    /// First unread items, most recent first, at most [`PREVIEW_LIMIT`].
    pub preview: Vec<NotificationRecord>,
}

#[must_use]
pub fn stat_tiles(counts: &CountReconciler, tiles: &[TileSpec]) -> Vec<StatTile> {
    tiles
        .iter()
        .map(|tile| StatTile {
            key: tile.key,
            label: tile.label,
            value: counts.get(tile.key).unwrap_or(0),
            loading: !counts.is_loaded(tile.key),
        })
        .collect()
}

#[must_use]
pub fn activity_rows(feed: &ActivityReconciler, now: OffsetDateTime) -> Vec<ActivityRow> {
    feed.entries()
        .iter()
        .map(|record| ActivityRow {
            id: record.id.clone(),
            kind: record.kind,
            action: record.action.clone(),
            when: record.created_at.map_or_else(|| "unknown time".to_owned(), |at| relative_time(at, now)),
            tone: record.kind.into(),
        })
        .collect()
}

#[must_use]
pub fn notification_badge(inbox: &NotificationReconciler) -> NotificationBadge {
    NotificationBadge {
        unread: inbox.unread_count(),
        preview: inbox.unread().take(PREVIEW_LIMIT).cloned().collect(),
    }
}

/// "just now", "N minutes ago", "N hours ago", "N days ago", then a
/// calendar date once a week has passed. Future times read as "just now".
#[must_use]
pub fn relative_time(at: OffsetDateTime, now: OffsetDateTime) -> String {
    let elapsed = now - at;
    let minutes = elapsed.whole_minutes();
    let hours = elapsed.whole_hours();
    let days = elapsed.whole_days();

    if minutes < 1 {
        "just now".to_owned()
    } else if hours < 1 {
        plural(minutes, "minute")
    } else if days < 1 {
        plural(hours, "hour")
    } else if days < 7 {
        plural(days, "day")
    } else {
        let format = format_description!("[month repr:short] [day padding:none], [year]");
        at.format(&format).unwrap_or_else(|_| at.date().to_string())
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 { format!("1 {unit} ago") } else { format!("{n} {unit}s ago") }
}
