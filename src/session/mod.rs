//! Session state and its single-writer discipline.
//!
//! DESIGN
//! ======
//! The token and the authenticated user live in one [`SessionContext`],
//! owned by the [`AuthGuard`](guard::AuthGuard). Every other collaborator
//! (REST client, connection manager, dashboard) receives a [`SessionView`]:
//! read-only accessors plus a `watch` subscription. The only mutation a view
//! can trigger is the 401 expiry path, and that logic lives here too.
//!
//! Memory and the token store are updated together; the in-memory copy is
//! authoritative for the running process.

pub mod guard;
pub mod route;
pub mod store;


use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::api::types::User;
use store::TokenStore;

/// Where the auth state machine currently sits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthStatus {
    #[default]
    Anonymous,
    /// Validating a persisted token against the backend.
    Checking,
    Authenticated,
}

/// Observable session snapshot. The token itself is not part of it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub status: AuthStatus,
    pub user: Option<User>,
    /// Set when the backend expired the session; consumers should navigate
    /// to the login entry point.
    pub needs_login: bool,
}

impl SessionState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status == AuthStatus::Authenticated
    }
}

struct SessionInner {
    store: Box<dyn TokenStore>,
    token: Mutex<Option<String>>,
    state: watch::Sender<SessionState>,
}

impl SessionInner {
    fn token(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = token;
    }

    fn clear(&self, needs_login: bool) {
        self.set_token(None);
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "failed to clear persisted token");
        }
        self.state.send_replace(SessionState { status: AuthStatus::Anonymous, user: None, needs_login });
    }
}

/// Owning handle; the only type with write access to the session.
pub struct SessionContext {
    inner: Arc<SessionInner>,
}

impl SessionContext {
    /// Load any persisted token; the session starts anonymous until validated.
    #[must_use]
    pub fn new(store: Box<dyn TokenStore>) -> Self {
        let token = store.load();
        let (state, _) = watch::channel(SessionState::default());
        Self { inner: Arc::new(SessionInner { store, token: Mutex::new(token), state }) }
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView { inner: Arc::clone(&self.inner) }
    }

    pub(crate) fn begin_check(&self) {
        self.inner.state.send_modify(|s| {
            s.status = AuthStatus::Checking;
            s.needs_login = false;
        });
    }

    /// Enter the authenticated state and persist the token.
    pub(crate) fn authenticate(&self, token: &str, user: User) {
        self.inner.set_token(Some(token.to_owned()));
        if let Err(e) = self.inner.store.save(token) {
            tracing::warn!(error = %e, "failed to persist session token");
        }
        self.inner.state.send_replace(SessionState {
            status: AuthStatus::Authenticated,
            user: Some(user),
            needs_login: false,
        });
    }

    /// Confirm a restored session for the token already held.
    pub(crate) fn confirm(&self, user: User) {
        self.inner.state.send_replace(SessionState {
            status: AuthStatus::Authenticated,
            user: Some(user),
            needs_login: false,
        });
    }

    pub(crate) fn set_user(&self, user: User) {
        self.inner.state.send_modify(|s| s.user = Some(user));
    }

    /// Drop the token from memory and storage and become anonymous.
    pub(crate) fn clear(&self) {
        self.inner.clear(false);
    }
}

/// Read-only session access handed to every collaborator.
#[derive(Clone)]
pub struct SessionView {
    inner: Arc<SessionInner>,
}

impl SessionView {
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.inner.token()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Force-expire the session after the backend answered 401.
    pub(crate) fn expire(&self) {
        tracing::warn!("session rejected by backend; login required");
        self.inner.clear(true);
    }
}

impl std::fmt::Debug for SessionView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionView")
            .field("has_token", &self.token().is_some())
            .field("state", &self.state())
            .finish()
    }
}
