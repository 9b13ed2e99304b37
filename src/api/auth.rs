//! Auth and own-account endpoints.
//!
//! These are thin request helpers; session transitions live in
//! [`crate::session::guard`].

use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};

use super::client::{ApiClient, ApiError, RequestKind};
use super::types::User;

/// Well-formed `/auth/login` payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginGrant {
    pub token: String,
    pub user: User,
}

impl LoginGrant {
    /// Accept only a non-blank token together with a user object.
    #[must_use]
    pub fn from_body(body: &Value) -> Option<Self> {
        let token = body.get("token")?.as_str()?.trim();
        if token.is_empty() {
            return None;
        }
        let user = serde_json::from_value::<User>(body.get("user")?.clone())
            .ok()
            .filter(|user| !user.id.is_empty())?;
        Some(Self { token: token.to_owned(), user })
    }
}

/// Response of `/auth/forgot-password`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ResetInstructions {
    #[serde(default)]
    pub message: Option<String>,
    /// Only present when the backend runs in development mode.
    #[serde(rename = "resetToken", default)]
    pub reset_token: Option<String>,
}

/// `POST /auth/login`; returns the raw body for the guard to validate.
///
/// # Errors
///
/// Propagates [`ApiError`]; a 401 here never expires the session.
pub async fn login(api: &ApiClient, email: &str, password: &str) -> Result<Value, ApiError> {
    let body = json!({ "email": email, "password": password });
    api.request(Method::POST, "/auth/login", Some(&body), RequestKind::Login).await
}

/// `GET /admin/me`. Accepts `{user}` or a bare user object.
///
/// # Errors
///
/// Propagates [`ApiError`]; [`ApiError::Decode`] if no user can be read.
pub async fn current_user(api: &ApiClient) -> Result<User, ApiError> {
    let body = api.get("/admin/me").await?;
    user_from_body(body)
}

/// `PUT /admin/me` with arbitrary profile fields.
///
/// # Errors
///
/// Propagates [`ApiError`]; a 401 here stays local.
pub async fn update_me(api: &ApiClient, fields: &Value) -> Result<Value, ApiError> {
    api.request(Method::PUT, "/admin/me", Some(fields), RequestKind::OwnProfileUpdate)
        .await
}

/// # Errors
///
/// Propagates [`ApiError`].
pub async fn forgot_password(api: &ApiClient, email: &str) -> Result<ResetInstructions, ApiError> {
    let body = json!({ "email": email });
    api.request_as(Method::POST, "/auth/forgot-password", Some(&body), RequestKind::Public)
        .await
}

/// # Errors
///
/// Propagates [`ApiError`].
pub async fn reset_password(api: &ApiClient, token: &str, password: &str) -> Result<Value, ApiError> {
    let body = json!({ "token": token, "password": password });
    api.request(Method::POST, "/auth/reset-password", Some(&body), RequestKind::Public)
        .await
}

pub(crate) fn user_from_body(mut body: Value) -> Result<User, ApiError> {
    if body.get("user").is_some_and(Value::is_object) {
        body = body["user"].take();
    }
    let user: User = serde_json::from_value(body)?;
    if user.id.is_empty() {
        return Err(ApiError::Decode(serde::de::Error::custom("user payload has no id")));
    }
    Ok(user)
}
