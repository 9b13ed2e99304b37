#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// Backend documents carry Mongo `_id`; some endpoints add a virtual `id`.
/// Both are accepted, `_id` wins. Neither yields an empty id, which the
/// activity feed drops.
fn pick_id(mongo_id: Option<String>, id: Option<String>) -> String {
    mongo_id.or(id).unwrap_or_default()
}

// =============================================================================
// USER
// =============================================================================

/// Authenticated admin account as returned by `/auth/login` and `/admin/me`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawUser")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Deserialize)]
struct RawUser {
    #[serde(rename = "_id")]
    mongo_id: Option<String>,
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    role: String,
}

impl From<RawUser> for User {
    fn from(raw: RawUser) -> Self {
        Self { id: pick_id(raw.mongo_id, raw.id), name: raw.name, email: raw.email, role: raw.role }
    }
}

// =============================================================================
// ACTIVITY
// =============================================================================

/// Kind of content change recorded in the activity feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Create,
    Update,
    Delete,
    Publish,
    Unpublish,
    Upload,
    /// Any type this client does not know yet.
    #[serde(other)]
    Other,
}

impl ActivityKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Publish => "publish",
            Self::Unpublish => "unpublish",
            Self::Upload => "upload",
            Self::Other => "other",
        }
    }
}

/// One entry of the recent-activity feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawActivity")]
pub struct ActivityRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub action: String,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Deserialize)]
struct RawActivity {
    #[serde(rename = "_id")]
    mongo_id: Option<String>,
    id: Option<String>,
    #[serde(rename = "type", default = "other_kind")]
    kind: ActivityKind,
    #[serde(default)]
    action: String,
    #[serde(rename = "createdAt", default, with = "time::serde::rfc3339::option")]
    created_at: Option<OffsetDateTime>,
}

fn other_kind() -> ActivityKind {
    ActivityKind::Other
}

impl From<RawActivity> for ActivityRecord {
    fn from(raw: RawActivity) -> Self {
        Self {
            id: pick_id(raw.mongo_id, raw.id),
            kind: raw.kind,
            action: raw.action,
            created_at: raw.created_at,
        }
    }
}

// =============================================================================
// NOTIFICATION
// =============================================================================

/// A contact-form submission surfaced as an admin notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawNotification")]
pub struct NotificationRecord {
    pub id: String,
    pub subject: String,
    pub name: String,
    pub email: String,
    pub message: String,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(rename = "isRead")]
    pub is_read: bool,
}

#[derive(Deserialize)]
struct RawNotification {
    #[serde(rename = "_id")]
    mongo_id: Option<String>,
    id: Option<String>,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    message: String,
    #[serde(rename = "createdAt", default, with = "time::serde::rfc3339::option")]
    created_at: Option<OffsetDateTime>,
    #[serde(rename = "isRead", default)]
    is_read: bool,
}

impl From<RawNotification> for NotificationRecord {
    fn from(raw: RawNotification) -> Self {
        Self {
            id: pick_id(raw.mongo_id, raw.id),
            subject: raw.subject,
            name: raw.name,
            email: raw.email,
            message: raw.message,
            created_at: raw.created_at,
            is_read: raw.is_read,
        }
    }
}

// =============================================================================
// LISTING
// =============================================================================

/// A list response: either a bare array or a paginated envelope.
#[derive(Clone, Debug, PartialEq)]
pub enum Listing {
    Bare(Vec<Value>),
    Page { items: Vec<Value>, total: Option<u64>, page: Option<u64>, limit: Option<u64> },
    /// Neither shape; counts as empty.
    Unknown,
}

impl Listing {
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::Bare(items),
            Value::Object(mut map) if map.contains_key("items") || map.contains_key("total") => {
                let number = |v: Option<&Value>| v.and_then(Value::as_u64);
                let total = number(map.get("total"));
                let page = number(map.get("page"));
                let limit = number(map.get("limit"));
                let items = match map.remove("items") {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                Self::Page { items, total, page, limit }
            }
            _ => Self::Unknown,
        }
    }

    /// Array length for bare lists, else `total`, else the page's item count.
    #[must_use]
    pub fn count(&self) -> u64 {
        match self {
            Self::Bare(items) => items.len() as u64,
            Self::Page { items, total, .. } => total.unwrap_or(items.len() as u64),
            Self::Unknown => 0,
        }
    }

    #[must_use]
    pub fn items(&self) -> &[Value] {
        match self {
            Self::Bare(items) | Self::Page { items, .. } => items,
            Self::Unknown => &[],
        }
    }
}
