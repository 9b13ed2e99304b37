//! Route gating for the admin surface.

#[cfg(test)]
#[path = "route_test.rs"]
mod route_test;

use super::{AuthStatus, SessionState};

/// Anonymous entry point.
pub const LOGIN_PATH: &str = "/login";

const PUBLIC_PATHS: [&str; 3] = [LOGIN_PATH, "/forgot-password", "/reset-password"];
const PROTECTED_ROOT: &str = "/dashboard";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    Render,
    /// Session validation still in flight.
    Loading,
    Redirect(&'static str),
}

/// Decide what a navigation to `path` should do under `state`.
#[must_use]
pub fn route(state: &SessionState, path: &str) -> RouteDecision {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = if path.len() > 1 { path.trim_end_matches('/') } else { path };

    if PUBLIC_PATHS.contains(&path) {
        return RouteDecision::Render;
    }

    let protected = path == PROTECTED_ROOT
        || path.strip_prefix(PROTECTED_ROOT).is_some_and(|rest| rest.starts_with('/'));
    if !protected {
        return RouteDecision::Redirect(LOGIN_PATH);
    }

    match state.status {
        AuthStatus::Authenticated => RouteDecision::Render,
        AuthStatus::Checking => RouteDecision::Loading,
        AuthStatus::Anonymous => RouteDecision::Redirect(LOGIN_PATH),
    }
}
