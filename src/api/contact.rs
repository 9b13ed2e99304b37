//! Contact-form notifications.

use reqwest::Method;

use super::client::{ApiClient, ApiError, RequestKind, path_id};
use super::types::NotificationRecord;

/// `GET /api/contact`. A `null` body reads as an empty list.
///
/// # Errors
///
/// Propagates [`ApiError`].
pub async fn list(api: &ApiClient) -> Result<Vec<NotificationRecord>, ApiError> {
    let body = api.get("/api/contact").await?;
    if body.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(body)?)
}

/// `PATCH /api/contact/:id/read`.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] for a blank or malformed id, otherwise
/// propagates the request error.
pub async fn mark_read(api: &ApiClient, id: &str) -> Result<(), ApiError> {
    let id = path_id(id, "notification id")?;
    api.request(Method::PATCH, &format!("/api/contact/{id}/read"), None, RequestKind::Standard)
        .await?;
    Ok(())
}
