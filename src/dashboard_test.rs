use super::*;
use crate::session::SessionContext;
use crate::test_helpers::{sample_user, session_with_token, spawn_backend, test_config};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

type ReadSet = Arc<Mutex<HashSet<String>>>;

async fn contacts(State(read): State<ReadSet>) -> Json<Value> {
    let read = read.lock().unwrap();
    let item = |id: &str, at: &str| json!({"_id": id, "subject": id, "createdAt": at, "isRead": read.contains(id)});
    Json(json!([
        item("n1", "2026-10-18T10:00:00Z"),
        item("n2", "2026-10-18T11:00:00Z"),
        item("n3", "2026-10-18T09:00:00Z"),
    ]))
}

async fn mark(State(read): State<ReadSet>, Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if id == "n2" {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "database unavailable"})));
    }
    read.lock().unwrap().insert(id);
    (StatusCode::OK, Json(json!({"message": "ok"})))
}

async fn backend() -> String {
    let read: ReadSet = Arc::default();
    let router = axum::Router::new()
        .route("/api/projects", get(|| async { Json(json!([{"_id": "p1"}, {"_id": "p2"}])) }))
        .route("/api/blogs", get(|| async { Json(json!({"items": [], "total": 7})) }))
        .route("/api/skills", get(|| async { Json(json!({"items": [{"_id": "s1"}]})) }))
        .route("/api/testimonials", get(|| async { Json(json!([])) }))
        .route(
            "/api/activities",
            get(|| async { Json(json!([{"_id": "a1", "type": "create", "action": "Created project"}])) }),
        )
        .route("/api/contact", get(contacts))
        .route("/api/contact/{id}/read", patch(mark))
        .with_state(read);
    spawn_backend(router).await
}

fn signed_in() -> SessionContext {
    let session = session_with_token(None);
    session.authenticate("T", sample_user());
    session
}

async fn wait_view<F>(rx: &mut watch::Receiver<DashboardView>, pred: F) -> DashboardView
where
    F: FnMut(&DashboardView) -> bool,
{
    timeout(WAIT, rx.wait_for(pred))
        .await
        .expect("view timeout")
        .expect("dashboard stopped")
        .clone()
}

fn tile(view: &DashboardView, key: &str) -> (u64, bool) {
    let tile = view.tiles.iter().find(|t| t.key == key).expect("tile");
    (tile.value, tile.loading)
}

fn test_owner(api: ApiClient) -> (Owner, watch::Receiver<DashboardView>, mpsc::UnboundedReceiver<Update>) {
    let (view_tx, view_rx) = watch::channel(DashboardView::default());
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let owner = Owner {
        session: api.session().subscribe(),
        api,
        tiles: DEFAULT_TILES.to_vec(),
        activity_limit: 10,
        counts: CountReconciler::new(),
        activity: ActivityReconciler::default(),
        inbox: NotificationReconciler::new(),
        connection: ConnectionStatus::Disconnected,
        errors: BTreeMap::new(),
        view_tx,
        updates_tx,
    };
    (owner, view_rx, updates_rx)
}

#[tokio::test]
async fn initial_snapshots_fill_the_view() {
    let base = backend().await;
    let session = signed_in();
    let api = ApiClient::new(&test_config(&base), session.view()).unwrap();
    let dashboard = Dashboard::spawn(api, &test_config(&base), None);
    let mut rx = dashboard.view();

    let view = wait_view(&mut rx, |v| {
        v.tiles.iter().all(|t| !t.loading) && !v.activity.is_empty() && v.notifications.unread > 0
    })
    .await;

    assert_eq!(tile(&view, "project"), (2, false));
    assert_eq!(tile(&view, "blog"), (7, false));
    assert_eq!(tile(&view, "skill"), (1, false));
    assert_eq!(tile(&view, "testimonial"), (0, false));
    assert_eq!(view.activity[0].id, "a1");
    assert_eq!(view.notifications.unread, 3);
    assert_eq!(view.notifications.preview[0].id, "n2");
    assert_eq!(view.connection, ConnectionStatus::Disconnected);

    dashboard.shutdown().await;
}

#[tokio::test]
async fn snapshot_overrides_stale_push() {
    let session = signed_in();
    let api = ApiClient::new(&test_config("http://127.0.0.1:9"), session.view()).unwrap();
    let (mut owner, view, _updates) = test_owner(api);

    owner.apply_push(&PushEvent::CountUpdate { model: "blog".into(), count: 5 });
    assert_eq!(tile(&view.borrow(), "blog"), (5, false));

    owner.apply_update(Update::Count { key: "blog", result: Ok(7) });
    assert_eq!(tile(&view.borrow(), "blog"), (7, false));

    owner.apply_push(&PushEvent::CountUpdate { model: "blog".into(), count: 8 });
    assert_eq!(tile(&view.borrow(), "blog"), (8, false));
}

#[tokio::test]
async fn failed_snapshot_keeps_previous_state() {
    let session = signed_in();
    let api = ApiClient::new(&test_config("http://127.0.0.1:9"), session.view()).unwrap();
    let (mut owner, view, _updates) = test_owner(api);

    owner.apply_update(Update::Count { key: "project", result: Ok(4) });
    let failure = ApiError::Status { status: 500, message: "boom".into() };
    owner.apply_update(Update::Count { key: "project", result: Err(failure) });

    let view = view.borrow();
    assert_eq!(tile(&view, "project"), (4, false));
    assert_eq!(view.errors.get("project").map(String::as_str), Some("boom"));
}

#[tokio::test]
async fn failure_stays_visible_until_its_own_domain_recovers() {
    let session = signed_in();
    let api = ApiClient::new(&test_config("http://127.0.0.1:9"), session.view()).unwrap();
    let (mut owner, view, _updates) = test_owner(api);

    let failure = ApiError::Status { status: 500, message: "activity down".into() };
    owner.apply_update(Update::Activity(Err(failure)));
    owner.apply_update(Update::Count { key: "project", result: Ok(3) });
    owner.apply_update(Update::Notifications(Ok(Vec::new())));
    assert_eq!(view.borrow().errors.get("activity").map(String::as_str), Some("activity down"));

    owner.apply_update(Update::Activity(Ok(Vec::new())));
    assert!(view.borrow().errors.is_empty());
}

#[tokio::test]
async fn contact_count_push_refetches_notifications() {
    let base = backend().await;
    let session = signed_in();
    let api = ApiClient::new(&test_config(&base), session.view()).unwrap();
    let (mut owner, _view, mut updates) = test_owner(api);

    owner.apply_push(&PushEvent::CountUpdate { model: "contact".into(), count: 3 });

    let update = timeout(WAIT, updates.recv()).await.unwrap().unwrap();
    assert!(matches!(update, Update::Notifications(Ok(ref list)) if list.len() == 3));
}

#[tokio::test]
async fn mark_read_waits_for_server_confirmation() {
    let base = backend().await;
    let session = signed_in();
    let api = ApiClient::new(&test_config(&base), session.view()).unwrap();
    let dashboard = Dashboard::spawn(api, &test_config(&base), None);
    let mut rx = dashboard.view();
    wait_view(&mut rx, |v| v.notifications.unread == 3).await;

    dashboard.mark_read("n1").await.unwrap();
    let view = wait_view(&mut rx, |v| v.notifications.unread == 2).await;
    assert!(view.notifications.preview.iter().all(|n| n.id != "n1"));

    let err = dashboard.mark_read("n2").await.unwrap_err();
    assert_eq!(err.user_message(), "database unavailable");
    let view = rx.borrow().clone();
    assert!(view.notifications.preview.iter().any(|n| n.id == "n2"));

    dashboard.shutdown().await;
}

#[tokio::test]
async fn sign_out_stops_the_dashboard() {
    let base = backend().await;
    let session = signed_in();
    let api = ApiClient::new(&test_config(&base), session.view()).unwrap();
    let dashboard = Dashboard::spawn(api, &test_config(&base), None);
    let mut rx = dashboard.view();

    session.clear();

    let stopped = timeout(WAIT, async {
        while rx.changed().await.is_ok() {}
    })
    .await;
    assert!(stopped.is_ok());
}
