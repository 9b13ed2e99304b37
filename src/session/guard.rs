//! Auth state machine: `Anonymous -> Checking -> Authenticated | Anonymous`.
//!
//! ARCHITECTURE
//! ============
//! `AuthGuard` owns the [`SessionContext`] and is the only writer of the
//! token. Login clears any stale token before calling the backend, so the
//! login request itself can never carry one. Expected auth failures are
//! values, not panics: `login` answers `bool`, the account operations answer
//! `Result<_, AuthError>` whose message is meant for an inline form error.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use serde_json::{Value, json};

use super::route::{RouteDecision, route};
use super::store::TokenStore;
use super::{AuthStatus, SessionContext, SessionState, SessionView};
use crate::api::auth::{self, LoginGrant, ResetInstructions};
use crate::api::types::User;
use crate::api::{ApiClient, ApiError};
use crate::config::SyncConfig;

/// Minimum length for any new password.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("malformed login response")]
    MalformedResponse,
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AuthError {
    /// Text for an inline form error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(email: &str, password: &str) -> Self {
        Self { email: email.trim().to_owned(), password: password.to_owned() }
    }

    fn validate(&self) -> Result<(), AuthError> {
        if self.email.is_empty() || self.password.is_empty() {
            return Err(AuthError::Validation("Email and password are required"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordChange {
    pub current: String,
    pub new: String,
    pub confirm: String,
}

impl PasswordChange {
    /// Client-side password policy; nothing is sent when this fails.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] describing the first violated rule.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.current.is_empty() || self.new.is_empty() {
            return Err(AuthError::Validation("Current password and new password are required"));
        }
        if self.new.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation("New password must be at least 6 characters long"));
        }
        if self.new != self.confirm {
            return Err(AuthError::Validation("New passwords do not match"));
        }
        Ok(())
    }
}

pub struct AuthGuard {
    session: SessionContext,
    api: ApiClient,
}

impl AuthGuard {
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SyncConfig, store: Box<dyn TokenStore>) -> Result<Self, ApiError> {
        let session = SessionContext::new(store);
        let api = ApiClient::new(config, session.view())?;
        Ok(Self { session, api })
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        self.session.view()
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session.view().state()
    }

    /// Gate a navigation on the current session.
    #[must_use]
    pub fn route(&self, path: &str) -> RouteDecision {
        route(&self.state(), path)
    }

    /// Validate a persisted token at startup.
    pub async fn restore(&self) -> AuthStatus {
        if self.session.view().token().is_none() {
            self.session.clear();
            return AuthStatus::Anonymous;
        }

        self.session.begin_check();
        match auth::current_user(&self.api).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "session restored");
                self.session.confirm(user);
                AuthStatus::Authenticated
            }
            Err(e) => {
                tracing::info!(error = %e, "stored token rejected; clearing");
                // A 401 already expired the session; any other failure
                // must clear it here.
                if !e.is_unauthorized() {
                    self.session.clear();
                }
                AuthStatus::Anonymous
            }
        }
    }

    /// Sign in. `true` only when the backend returned a token and a user.
    pub async fn login(&self, credentials: &Credentials) -> bool {
        match self.try_login(credentials).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "logged in");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "login failed");
                false
            }
        }
    }

    /// Sign in, keeping the failure reason for display.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for missing credentials,
    /// [`AuthError::MalformedResponse`] when the payload lacks a token or a
    /// user, and [`AuthError::Api`] for rejected credentials or transport
    /// failures. The session is anonymous with no token after any error.
    pub async fn try_login(&self, credentials: &Credentials) -> Result<User, AuthError> {
        credentials.validate()?;
        self.session.clear();

        let body = auth::login(&self.api, &credentials.email, &credentials.password).await?;
        let Some(grant) = LoginGrant::from_body(&body) else {
            self.session.clear();
            return Err(AuthError::MalformedResponse);
        };

        self.session.authenticate(&grant.token, grant.user.clone());
        Ok(grant.user)
    }

    /// Sign out. Connection owners watching the session close on this change.
    pub fn logout(&self) {
        tracing::info!("logged out");
        self.session.clear();
    }

    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for a blank email, otherwise
    /// [`AuthError::Api`].
    pub async fn forgot_password(&self, email: &str) -> Result<ResetInstructions, AuthError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AuthError::Validation("Email is required"));
        }
        Ok(auth::forgot_password(&self.api, email).await?)
    }

    /// Complete a reset with the emailed token. Returns the backend message.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for a blank token or a short
    /// password, otherwise [`AuthError::Api`].
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<String, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::Validation("Reset token is required"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation("Password must be at least 6 characters long"));
        }
        let body = auth::reset_password(&self.api, token.trim(), password).await?;
        Ok(message_or(&body, "Password has been reset"))
    }

    /// Update own name/email; the session user is refreshed on success.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] when nothing would change, otherwise
    /// [`AuthError::Api`]. A 401 here does not end the session.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, AuthError> {
        let mut fields = serde_json::Map::new();
        for (key, value) in [("name", &update.name), ("email", &update.email)] {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                fields.insert(key.to_owned(), Value::String(value.to_owned()));
            }
        }
        if fields.is_empty() {
            return Err(AuthError::Validation("Name or email is required"));
        }

        let body = auth::update_me(&self.api, &Value::Object(fields)).await?;
        let user = auth::user_from_body(body)?;
        self.session.set_user(user.clone());
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for policy violations (checked
    /// before any request), otherwise [`AuthError::Api`]; a wrong current
    /// password surfaces as `Api(Unauthorized)` and keeps the session.
    pub async fn change_password(&self, change: &PasswordChange) -> Result<String, AuthError> {
        change.validate()?;
        let body = json!({ "currentPassword": change.current, "newPassword": change.new });
        let response = auth::update_me(&self.api, &body).await?;
        Ok(message_or(&response, "Password changed successfully"))
    }
}

fn message_or(body: &Value, fallback: &str) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_owned()
}
