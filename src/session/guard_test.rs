use super::*;
use crate::session::store::{FileTokenStore, MemoryTokenStore};
use crate::test_helpers::{spawn_backend, test_config};
use axum::Json;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn temp_token_path(tag: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("folio-admin-guard-{tag}-{}", std::process::id()))
        .join(crate::session::store::TOKEN_KEY)
}

fn me_body() -> Value {
    json!({"user": {"_id": "u-9", "name": "Root", "email": "root@example.test", "role": "admin"}})
}

#[tokio::test]
async fn restore_without_token_is_anonymous_and_skips_backend() {
    let guard = AuthGuard::new(&test_config("http://127.0.0.1:9"), Box::new(MemoryTokenStore::default())).unwrap();
    assert_eq!(guard.restore().await, AuthStatus::Anonymous);
    assert_eq!(guard.route("/dashboard"), RouteDecision::Redirect("/login"));
}

#[tokio::test]
async fn restore_with_valid_token_authenticates() {
    let router = axum::Router::new().route(
        "/admin/me",
        get(|headers: HeaderMap| async move {
            let auth = headers.get("authorization").and_then(|v| v.to_str().ok()).unwrap_or_default();
            if auth == "Bearer T" {
                (StatusCode::OK, Json(me_body()))
            } else {
                (StatusCode::UNAUTHORIZED, Json(json!({"error": "no"})))
            }
        }),
    );
    let base = spawn_backend(router).await;
    let guard = AuthGuard::new(&test_config(&base), Box::new(MemoryTokenStore::with_token("T"))).unwrap();

    assert_eq!(guard.restore().await, AuthStatus::Authenticated);
    let state = guard.state();
    assert_eq!(state.user.map(|u| u.id), Some("u-9".to_owned()));
    assert_eq!(guard.route("/dashboard/projects"), RouteDecision::Render);
}

#[tokio::test]
async fn restore_with_expired_token_clears_and_redirects() {
    let router = axum::Router::new().route(
        "/admin/me",
        get(|| async { (StatusCode::UNAUTHORIZED, Json(json!({"error": "Token expired", "expired": true}))) }),
    );
    let base = spawn_backend(router).await;
    let path = temp_token_path("expired");
    let store = FileTokenStore::new(&path);
    store.save("T").unwrap();

    let guard = AuthGuard::new(&test_config(&base), Box::new(store)).unwrap();
    assert_eq!(guard.view().token().as_deref(), Some("T"));

    assert_eq!(guard.restore().await, AuthStatus::Anonymous);
    assert_eq!(guard.view().token(), None);
    assert!(!path.exists());
    assert!(guard.state().needs_login);
    assert_eq!(guard.route("/dashboard"), RouteDecision::Redirect("/login"));
}

#[tokio::test]
async fn restore_with_unreachable_backend_clears_token() {
    let guard = AuthGuard::new(&test_config("http://127.0.0.1:9"), Box::new(MemoryTokenStore::with_token("T"))).unwrap();
    assert_eq!(guard.restore().await, AuthStatus::Anonymous);
    assert_eq!(guard.view().token(), None);
}

#[tokio::test]
async fn login_with_wrong_password_returns_false_and_persists_nothing() {
    let router = axum::Router::new().route(
        "/auth/login",
        post(|| async { (StatusCode::UNAUTHORIZED, Json(json!({"error": "Invalid credentials"}))) }),
    );
    let base = spawn_backend(router).await;
    let path = temp_token_path("wrong-password");
    let _ = std::fs::remove_file(&path);

    let guard = AuthGuard::new(&test_config(&base), Box::new(FileTokenStore::new(&path))).unwrap();
    assert!(!guard.login(&Credentials::new("a@b.com", "wrong")).await);

    assert!(!path.exists());
    assert_eq!(guard.view().token(), None);
    assert_eq!(guard.state().status, AuthStatus::Anonymous);
    assert!(!guard.state().needs_login);
}

#[tokio::test]
async fn login_surfaces_backend_message() {
    let router = axum::Router::new().route(
        "/auth/login",
        post(|| async { (StatusCode::UNAUTHORIZED, Json(json!({"error": "Invalid credentials"}))) }),
    );
    let base = spawn_backend(router).await;
    let guard = AuthGuard::new(&test_config(&base), Box::new(MemoryTokenStore::default())).unwrap();

    let err = guard.try_login(&Credentials::new("a@b.com", "wrong")).await.unwrap_err();
    assert_eq!(err.user_message(), "Invalid credentials");
}

#[tokio::test]
async fn login_clears_stale_token_before_request() {
    let router = axum::Router::new().route(
        "/auth/login",
        post(|headers: HeaderMap| async move {
            if headers.contains_key("authorization") {
                (StatusCode::BAD_REQUEST, Json(json!({"error": "unexpected bearer"})))
            } else {
                (StatusCode::OK, Json(json!({"token": "fresh", "user": {"id": "u-1", "email": "a@b.com"}})))
            }
        }),
    );
    let base = spawn_backend(router).await;
    let path = temp_token_path("stale");
    let store = FileTokenStore::new(&path);
    store.save("stale").unwrap();

    let guard = AuthGuard::new(&test_config(&base), Box::new(store)).unwrap();
    assert!(guard.login(&Credentials::new("a@b.com", "right")).await);

    assert_eq!(guard.view().token().as_deref(), Some("fresh"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh");
    assert!(guard.state().is_authenticated());
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn login_without_token_in_response_fails() {
    let router = axum::Router::new().route(
        "/auth/login",
        post(|| async { Json(json!({"user": {"id": "u-1"}})) }),
    );
    let base = spawn_backend(router).await;
    let guard = AuthGuard::new(&test_config(&base), Box::new(MemoryTokenStore::with_token("old"))).unwrap();

    let err = guard.try_login(&Credentials::new("a@b.com", "pw")).await.unwrap_err();
    assert!(matches!(err, AuthError::MalformedResponse));
    assert_eq!(guard.view().token(), None);
}

#[tokio::test]
async fn login_requires_both_fields() {
    let guard = AuthGuard::new(&test_config("http://127.0.0.1:9"), Box::new(MemoryTokenStore::default())).unwrap();
    let err = guard.try_login(&Credentials::new("  ", "pw")).await.unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));
}

#[tokio::test]
async fn logout_clears_session_and_notifies_subscribers() {
    let router = axum::Router::new().route(
        "/auth/login",
        post(|| async { Json(json!({"token": "T", "user": {"id": "u-1"}})) }),
    );
    let base = spawn_backend(router).await;
    let guard = AuthGuard::new(&test_config(&base), Box::new(MemoryTokenStore::default())).unwrap();
    assert!(guard.login(&Credentials::new("a@b.com", "pw")).await);

    let mut rx = guard.view().subscribe();
    rx.mark_unchanged();
    guard.logout();

    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().status, AuthStatus::Anonymous);
    assert_eq!(guard.view().token(), None);
}

#[test]
fn password_policy_rejects_short_and_mismatched() {
    let short = PasswordChange { current: "old".into(), new: "abc".into(), confirm: "abc".into() };
    assert_eq!(short.validate().unwrap_err().user_message(), "New password must be at least 6 characters long");

    let mismatch = PasswordChange { current: "old".into(), new: "abcdef".into(), confirm: "abcdeg".into() };
    assert_eq!(mismatch.validate().unwrap_err().user_message(), "New passwords do not match");

    let missing = PasswordChange { current: String::new(), new: "abcdef".into(), confirm: "abcdef".into() };
    assert!(missing.validate().is_err());

    let ok = PasswordChange { current: "old".into(), new: "abcdef".into(), confirm: "abcdef".into() };
    assert!(ok.validate().is_ok());
}

#[tokio::test]
async fn change_password_validation_never_hits_network() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let router = axum::Router::new().route(
        "/admin/me",
        axum::routing::put(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(json!({"message": "ok"}))
            }
        }),
    );
    let base = spawn_backend(router).await;
    let guard = AuthGuard::new(&test_config(&base), Box::new(MemoryTokenStore::with_token("T"))).unwrap();

    let change = PasswordChange { current: "old".into(), new: "short".into(), confirm: "short".into() };
    assert!(guard.change_password(&change).await.is_err());
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    let change = PasswordChange { current: "old".into(), new: "longer1".into(), confirm: "longer1".into() };
    assert_eq!(guard.change_password(&change).await.unwrap(), "ok");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn profile_update_401_keeps_session() {
    let router = axum::Router::new()
        .route("/auth/login", post(|| async { Json(json!({"token": "T", "user": {"id": "u-1"}})) }))
        .route(
            "/admin/me",
            axum::routing::put(|| async {
                (StatusCode::UNAUTHORIZED, Json(json!({"error": "Current password is incorrect"})))
            }),
        );
    let base = spawn_backend(router).await;
    let guard = AuthGuard::new(&test_config(&base), Box::new(MemoryTokenStore::default())).unwrap();
    assert!(guard.login(&Credentials::new("a@b.com", "pw")).await);

    let change = PasswordChange { current: "bad".into(), new: "longer1".into(), confirm: "longer1".into() };
    let err = guard.change_password(&change).await.unwrap_err();
    assert_eq!(err.user_message(), "Current password is incorrect");
    assert!(guard.state().is_authenticated());
    assert_eq!(guard.view().token().as_deref(), Some("T"));
    assert!(!guard.state().needs_login);
}

#[tokio::test]
async fn update_profile_refreshes_session_user() {
    let router = axum::Router::new()
        .route("/auth/login", post(|| async { Json(json!({"token": "T", "user": {"id": "u-1", "name": "Old"}})) }))
        .route(
            "/admin/me",
            axum::routing::put(|Json(body): Json<Value>| async move {
                let name = body["name"].clone();
                Json(json!({"user": {"id": "u-1", "name": name, "email": "a@b.com"}}))
            }),
        );
    let base = spawn_backend(router).await;
    let guard = AuthGuard::new(&test_config(&base), Box::new(MemoryTokenStore::default())).unwrap();
    assert!(guard.login(&Credentials::new("a@b.com", "pw")).await);

    let update = ProfileUpdate { name: Some("New".into()), email: None };
    let user = guard.update_profile(&update).await.unwrap();
    assert_eq!(user.name, "New");
    assert_eq!(guard.state().user.map(|u| u.name), Some("New".to_owned()));

    let err = guard.update_profile(&ProfileUpdate::default()).await.unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));
}

#[tokio::test]
async fn forgot_and_reset_password_flow() {
    let router = axum::Router::new()
        .route(
            "/auth/forgot-password",
            post(|| async { Json(json!({"message": "Reset link sent", "resetToken": "rt-1"})) }),
        )
        .route(
            "/auth/reset-password",
            post(|Json(body): Json<Value>| async move {
                if body["token"] == "rt-1" {
                    (StatusCode::OK, Json(json!({"message": "Password reset"})))
                } else {
                    (StatusCode::BAD_REQUEST, Json(json!({"error": "Invalid or expired token"})))
                }
            }),
        );
    let base = spawn_backend(router).await;
    let guard = AuthGuard::new(&test_config(&base), Box::new(MemoryTokenStore::default())).unwrap();

    let instructions = guard.forgot_password("a@b.com").await.unwrap();
    assert_eq!(instructions.reset_token.as_deref(), Some("rt-1"));

    assert_eq!(guard.reset_password("rt-1", "newpass").await.unwrap(), "Password reset");
    let err = guard.reset_password("bogus", "newpass").await.unwrap_err();
    assert_eq!(err.user_message(), "Invalid or expired token");
    assert!(matches!(guard.reset_password("rt-1", "abc").await, Err(AuthError::Validation(_))));
}
