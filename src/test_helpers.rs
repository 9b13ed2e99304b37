//! Shared fixtures for unit tests: an in-process mock backend and
//! pre-wired sessions.

use std::time::Duration;

use crate::api::types::User;
use crate::config::{Mode, ReconnectPolicy, SyncConfig};
use crate::session::SessionContext;
use crate::session::store::MemoryTokenStore;

/// Serve `router` on an ephemeral loopback port and return its origin.
pub(crate) async fn spawn_backend(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("mock backend addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

/// Development-mode config with fast reconnects.
pub(crate) fn test_config(base_url: &str) -> SyncConfig {
    let mut config = SyncConfig::new(base_url, Mode::Development).expect("test config");
    config.reconnect = ReconnectPolicy { attempts: 2, delay: Duration::from_millis(20) };
    config.http.request_secs = 5;
    config.http.connect_secs = 2;
    config
}

pub(crate) fn session_with_token(token: Option<&str>) -> SessionContext {
    let store = token.map_or_else(MemoryTokenStore::default, MemoryTokenStore::with_token);
    SessionContext::new(Box::new(store))
}

pub(crate) fn sample_user() -> User {
    User {
        id: "u-1".to_owned(),
        name: "Ada Admin".to_owned(),
        email: "a@b.com".to_owned(),
        role: "admin".to_owned(),
    }
}
