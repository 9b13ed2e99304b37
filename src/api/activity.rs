//! Recent-activity feed.

use super::client::{ApiClient, ApiError};
use super::types::ActivityRecord;

/// `GET /api/activities?limit=N`, newest first as the backend orders them.
///
/// # Errors
///
/// Propagates [`ApiError`].
pub async fn recent(api: &ApiClient, limit: usize) -> Result<Vec<ActivityRecord>, ApiError> {
    let body = api.get(&format!("/api/activities?limit={limit}")).await?;
    if body.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(body)?)
}
