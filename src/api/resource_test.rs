use super::*;
use crate::test_helpers::{session_with_token, spawn_backend, test_config};
use axum::Json;
use axum::extract::Path;
use axum::routing::get;
use serde_json::json;

#[test]
fn kinds_map_to_paths_and_domain_keys() {
    assert_eq!(ResourceKind::Blogs.path(), "/api/blogs");
    assert_eq!(ResourceKind::Users.path(), "/admin/users");
    assert_eq!(ResourceKind::Testimonials.domain_key(), Some("testimonial"));
    assert_eq!(ResourceKind::Home.domain_key(), None);
    assert_eq!(ResourceKind::for_domain_key("project"), Some(ResourceKind::Projects));
    assert_eq!(ResourceKind::for_domain_key("contact"), None);
}

#[test]
fn from_str_accepts_name_or_domain_key() {
    assert_eq!("projects".parse::<ResourceKind>().unwrap(), ResourceKind::Projects);
    assert_eq!("Blog".parse::<ResourceKind>().unwrap(), ResourceKind::Blogs);
    assert_eq!("experience".parse::<ResourceKind>().unwrap(), ResourceKind::Experience);
    let err = "widgets".parse::<ResourceKind>().unwrap_err();
    assert_eq!(err.to_string(), "unknown resource 'widgets'");
}

#[tokio::test]
async fn list_counts_paginated_and_bare_responses() {
    let router = axum::Router::new()
        .route("/api/blogs", get(|| async { Json(json!({"items": [{}, {}], "total": 7, "page": 1, "limit": 2})) }))
        .route("/api/skills", get(|| async { Json(json!([{}, {}, {}])) }));
    let base = spawn_backend(router).await;
    let session = session_with_token(Some("t"));
    let api = ApiClient::new(&test_config(&base), session.view()).unwrap();

    assert_eq!(Resource::new(api.clone(), ResourceKind::Blogs).count().await.unwrap(), 7);
    assert_eq!(Resource::new(api, ResourceKind::Skills).count().await.unwrap(), 3);
}

#[tokio::test]
async fn get_and_update_hit_item_path() {
    let router = axum::Router::new().route(
        "/api/projects/{id}",
        get(|Path(id): Path<String>| async move { Json(json!({"_id": id})) })
            .put(|Path(id): Path<String>, Json(body): Json<Value>| async move {
                Json(json!({"_id": id, "title": body["title"]}))
            }),
    );
    let base = spawn_backend(router).await;
    let session = session_with_token(Some("t"));
    let api = ApiClient::new(&test_config(&base), session.view()).unwrap();
    let projects = Resource::new(api, ResourceKind::Projects);

    assert_eq!(projects.get("p-9").await.unwrap()["_id"], "p-9");
    let updated = projects.update("p-9", &json!({"title": "New"})).await.unwrap();
    assert_eq!(updated["title"], "New");
}

#[tokio::test]
async fn validation_failures_never_reach_the_network() {
    let session = session_with_token(Some("t"));
    // Nothing listens here; a network call would surface as ApiError::Http.
    let api = ApiClient::new(&test_config("http://127.0.0.1:9"), session.view()).unwrap();

    let projects = Resource::new(api.clone(), ResourceKind::Projects);
    assert!(matches!(projects.get("  ").await, Err(ApiError::Validation(_))));
    assert!(matches!(projects.create(&json!({})).await, Err(ApiError::Validation(_))));
    assert!(matches!(projects.create(&json!([1])).await, Err(ApiError::Validation(_))));

    let about = Resource::new(api, ResourceKind::About);
    assert!(matches!(about.delete("x").await, Err(ApiError::Validation(_))));
    assert!(matches!(about.create(&json!({"a": 1})).await, Err(ApiError::Validation(_))));
}

#[tokio::test]
async fn ids_that_would_change_the_route_are_rejected() {
    let session = session_with_token(Some("t"));
    let api = ApiClient::new(&test_config("http://127.0.0.1:9"), session.view()).unwrap();
    let projects = Resource::new(api.clone(), ResourceKind::Projects);

    for id in ["p1/../users", "p1?admin=1", "p1#frag", "p%2F1", "p 1"] {
        let err = projects.delete(id).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m.starts_with("invalid id")), "{id}: {err:?}");
    }
    let err = crate::api::contact::mark_read(&api, "n1/read").await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}
