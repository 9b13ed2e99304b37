//! Bearer-authenticated HTTP client for the content backend.
//!
//! ERROR HANDLING
//! ==============
//! Non-2xx responses become [`ApiError::Status`] with the backend's
//! `{error}` or `{message}` text. A 401 becomes [`ApiError::Unauthorized`]
//! and, unless the request kind is exempt, expires the session so every
//! consumer sees `needs_login`. Login and own-profile updates are exempt:
//! their 401s mean "wrong password" and belong inline in the form.

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::SyncConfig;
use crate::session::SessionView;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unauthorized: {message}")]
    Unauthorized { message: String, expired: bool },
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid response payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Validation(String),
}

impl ApiError {
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Text suitable for an inline form error or banner.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized { message, .. } | Self::Status { message, .. } => message.clone(),
            Self::Validation(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

/// How a request participates in auth handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    /// Bearer token attached; 401 expires the session.
    Standard,
    /// No bearer token; 401 stays local.
    Login,
    /// Bearer token attached; 401 stays local.
    OwnProfileUpdate,
    /// No bearer token (password reset flow).
    Public,
}

impl RequestKind {
    fn sends_token(self) -> bool {
        matches!(self, Self::Standard | Self::OwnProfileUpdate)
    }

    fn expires_session_on_401(self) -> bool {
        matches!(self, Self::Standard)
    }
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionView,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SyncConfig, session: SessionView) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http.request_secs))
            .connect_timeout(Duration::from_secs(config.http.connect_secs))
            .build()?;
        Ok(Self { http, base_url: config.api_base_url.clone(), session })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn session(&self) -> &SessionView {
        &self.session
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET` a standard authenticated path.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.request(Method::GET, path, None, RequestKind::Standard).await
    }

    /// Send a JSON request and return the decoded body (`Null` when empty).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] on transport failure,
    /// [`ApiError::Unauthorized`] on 401 and [`ApiError::Status`] on any
    /// other non-success status.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        kind: RequestKind,
    ) -> Result<Value, ApiError> {
        let mut builder = self.http.request(method.clone(), self.url(path));
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.execute(builder, &method, path, kind).await
    }

    /// Typed variant of [`ApiClient::request`].
    ///
    /// # Errors
    ///
    /// As [`ApiClient::request`], plus [`ApiError::Decode`] when the body
    /// does not match `T`.
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        kind: RequestKind,
    ) -> Result<T, ApiError> {
        let value = self.request(method, path, body, kind).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `POST` a multipart form to a standard authenticated path.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn post_multipart(&self, path: &str, form: reqwest::multipart::Form) -> Result<Value, ApiError> {
        let builder = self.http.post(self.url(path)).multipart(form);
        self.execute(builder, &Method::POST, path, RequestKind::Standard).await
    }

    async fn execute(
        &self,
        mut builder: reqwest::RequestBuilder,
        method: &Method,
        path: &str,
        kind: RequestKind,
    ) -> Result<Value, ApiError> {
        if kind.sends_token() {
            if let Some(token) = self.session.token() {
                builder = builder.bearer_auth(token);
            }
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let body = parse_body(text);

        if status.is_success() {
            return Ok(body);
        }

        let message = error_message(&body, status);
        if status == StatusCode::UNAUTHORIZED {
            let expired = body.get("expired").and_then(Value::as_bool).unwrap_or(false)
                || message.to_ascii_lowercase().contains("expired");
            tracing::debug!(%method, path, expired, "request unauthorized");
            if kind.expires_session_on_401() {
                self.session.expire();
            }
            return Err(ApiError::Unauthorized { message, expired });
        }

        tracing::debug!(%method, path, status = status.as_u16(), %message, "request failed");
        Err(ApiError::Status { status: status.as_u16(), message })
    }
}

/// Empty bodies read as `Null`; non-JSON text is kept as a string.
/// Check a record id before it becomes one path segment. Characters that
/// would start a new segment, query or fragment are rejected.
pub(crate) fn path_id<'a>(id: &'a str, what: &str) -> Result<&'a str, ApiError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::Validation(format!("{what} is required")));
    }
    if id.contains(['/', '?', '#', '%', '\\']) || id.chars().any(char::is_whitespace) {
        return Err(ApiError::Validation(format!("invalid {what} '{id}'")));
    }
    Ok(id)
}

fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text))
}

/// Backend error text: `{error}`, then `{message}`, then the status reason.
fn error_message(body: &Value, status: StatusCode) -> String {
    body.get("error")
        .and_then(Value::as_str)
        .or_else(|| body.get("message").and_then(Value::as_str))
        .or_else(|| body.as_str().filter(|s| !s.trim().is_empty()))
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_owned())
}
