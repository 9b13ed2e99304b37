//! Typed server push events.

#[cfg(test)]
#[path = "event_test.rs"]
mod event_test;

use serde::Deserialize;
use serde_json::Value;

use crate::api::types::ActivityRecord;

pub const COUNT_UPDATE: &str = "count-update";
pub const NEW_ACTIVITY: &str = "new-activity";

#[derive(Debug, thiserror::Error)]
#[error("malformed '{event}' payload: {source}")]
pub struct EventError {
    pub event: String,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushEvent {
    /// Authoritative total for one domain key.
    CountUpdate { model: String, count: u64 },
    NewActivity(ActivityRecord),
}

#[derive(Deserialize)]
struct CountPayload {
    model: String,
    count: u64,
}

impl PushEvent {
    /// Decode a named event. Unknown names yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError`] when a known event carries a payload of the
    /// wrong shape.
    pub fn decode(name: &str, args: &[Value]) -> Result<Option<Self>, EventError> {
        let payload = args.first().cloned().unwrap_or(Value::Null);
        let wrap = |source| EventError { event: name.to_owned(), source };
        match name {
            COUNT_UPDATE => {
                let CountPayload { model, count } = serde_json::from_value(payload).map_err(wrap)?;
                Ok(Some(Self::CountUpdate { model, count }))
            }
            NEW_ACTIVITY => {
                let record = serde_json::from_value(payload).map_err(wrap)?;
                Ok(Some(Self::NewActivity(record)))
            }
            _ => Ok(None),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CountUpdate { .. } => COUNT_UPDATE,
            Self::NewActivity(_) => NEW_ACTIVITY,
        }
    }
}
