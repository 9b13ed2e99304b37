//! Image upload.

#[cfg(test)]
#[path = "media_test.rs"]
mod media_test;

use std::path::Path;

use serde::Deserialize;

use super::client::{ApiClient, ApiError};

/// Largest accepted upload, exclusive.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct UploadedImage {
    pub url: String,
}

/// Mime type for a supported image extension.
#[must_use]
pub fn image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        "avif" => Some("image/avif"),
        _ => None,
    }
}

/// Check type and size before any bytes leave the machine.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] for a non-image or an oversized file.
pub fn validate_upload(path: &Path, size: u64) -> Result<&'static str, ApiError> {
    let mime = image_mime(path).ok_or_else(|| ApiError::Validation("Please select an image file".to_owned()))?;
    if size >= MAX_UPLOAD_BYTES {
        return Err(ApiError::Validation("File size must be less than 10MB".to_owned()));
    }
    Ok(mime)
}

/// `POST /api/upload/image` as multipart field `image`.
///
/// # Errors
///
/// Returns [`ApiError::Io`] if the file cannot be read,
/// [`ApiError::Validation`] if it is not an acceptable image, and otherwise
/// propagates the request error.
pub async fn upload_image(api: &ApiClient, path: &Path) -> Result<UploadedImage, ApiError> {
    let size = tokio::fs::metadata(path).await?.len();
    let mime = validate_upload(path, size)?;
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_owned();

    let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name).mime_str(mime)?;
    let form = reqwest::multipart::Form::new().part("image", part);

    let body = api.post_multipart("/api/upload/image", form).await?;
    let uploaded: UploadedImage = serde_json::from_value(body)?;
    tracing::info!(url = %uploaded.url, size, "image uploaded");
    Ok(uploaded)
}
