//! Dashboard owner task.
//!
//! DESIGN
//! ======
//! One task owns every reconciler and multiplexes with `select!`:
//! - push events from the live channel
//! - snapshot results from spawned REST fetches
//! - the relative-time tick
//! - commands from the [`Dashboard`] handle
//! - session changes
//!
//! Nothing is shared or locked. Fetches run as their own tasks and report
//! back over an mpsc channel; once the owner is gone the send fails and the
//! result is dropped. Each state change re-projects and publishes a
//! [`DashboardView`] on a `watch` channel.
//!
//! ERROR HANDLING
//! ==============
//! A failed fetch leaves the previous state in place, logs at `warn` and
//! records the message in [`DashboardView::errors`] under its domain. Only a
//! later success in that same domain clears it.

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod dashboard_test;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::resource::{Resource, ResourceKind};
use crate::api::types::{ActivityRecord, NotificationRecord};
use crate::api::{ApiClient, ApiError, activity, contact};
use crate::config::SyncConfig;
use crate::projector::{self, ActivityRow, DEFAULT_TILES, NotificationBadge, StatTile, TileSpec};
use crate::realtime::{ConnectionHandle, ConnectionStatus, PushEvent};
use crate::reconcile::{ActivityReconciler, CountReconciler, NotificationReconciler, PushOutcome, Reconciler};
use crate::session::SessionState;

const ACTIVITY: &str = "activity";
const NOTIFICATIONS: &str = "notifications";

/// Everything a renderer needs, already projected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    pub tiles: Vec<StatTile>,
    pub activity: Vec<ActivityRow>,
    pub notifications: NotificationBadge,
    pub connection: ConnectionStatus,
    /// Unresolved fetch failures keyed by domain (`project`, `activity`,
    /// `notifications`, ...).
    pub errors: BTreeMap<&'static str, String>,
}

enum Command {
    Refresh,
    MarkRead { id: String, reply: oneshot::Sender<Result<(), ApiError>> },
}

enum Update {
    Count { key: &'static str, result: Result<u64, ApiError> },
    Activity(Result<Vec<ActivityRecord>, ApiError>),
    Notifications(Result<Vec<NotificationRecord>, ApiError>),
    ReadConfirmed(String),
}

/// Handle to a running dashboard. Dropping it stops the owner task.
pub struct Dashboard {
    view: watch::Receiver<DashboardView>,
    commands: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

impl Dashboard {
    /// Start the owner task and kick off the initial snapshots.
    ///
    /// `channel` is the live connection, if one was opened; the owner takes
    /// it over and closes it on shutdown or sign-out.
    #[must_use]
    pub fn spawn(api: ApiClient, config: &SyncConfig, channel: Option<ConnectionHandle>) -> Self {
        let (view_tx, view) = watch::channel(DashboardView::default());
        let (commands, command_rx) = mpsc::channel(16);
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();

        let owner = Owner {
            session: api.session().subscribe(),
            api,
            tiles: DEFAULT_TILES.to_vec(),
            activity_limit: config.activity_limit,
            counts: CountReconciler::new(),
            activity: ActivityReconciler::new(config.activity_limit),
            inbox: NotificationReconciler::new(),
            connection: ConnectionStatus::Disconnected,
            errors: BTreeMap::new(),
            view_tx,
            updates_tx,
        };
        let task = tokio::spawn(owner.run(channel, config.tick, command_rx, updates_rx));
        Self { view, commands, task }
    }

    #[must_use]
    pub fn view(&self) -> watch::Receiver<DashboardView> {
        self.view.clone()
    }

    /// Re-fetch every snapshot.
    pub async fn refresh(&self) {
        let _ = self.commands.send(Command::Refresh).await;
    }

    /// Mark a notification read. It leaves the unread projection only after
    /// the server confirmed.
    ///
    /// # Errors
    ///
    /// Returns the server's [`ApiError`]; the notification stays unread.
    pub async fn mark_read(&self, id: &str) -> Result<(), ApiError> {
        let (reply, rx) = oneshot::channel();
        let command = Command::MarkRead { id: id.to_owned(), reply };
        if self.commands.send(command).await.is_err() {
            return Err(ApiError::Validation("dashboard is not running".to_owned()));
        }
        rx.await
            .unwrap_or_else(|_| Err(ApiError::Validation("dashboard is not running".to_owned())))
    }

    /// Stop the owner task and close the live channel it holds.
    pub async fn shutdown(self) {
        let Self { commands, task, .. } = self;
        drop(commands);
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "dashboard task ended abnormally");
        }
    }
}

struct Owner {
    api: ApiClient,
    session: watch::Receiver<SessionState>,
    tiles: Vec<TileSpec>,
    activity_limit: usize,
    counts: CountReconciler,
    activity: ActivityReconciler,
    inbox: NotificationReconciler,
    connection: ConnectionStatus,
    errors: BTreeMap<&'static str, String>,
    view_tx: watch::Sender<DashboardView>,
    updates_tx: mpsc::UnboundedSender<Update>,
}

impl Owner {
    async fn run(
        mut self,
        mut channel: Option<ConnectionHandle>,
        tick: Duration,
        mut commands: mpsc::Receiver<Command>,
        mut updates: mpsc::UnboundedReceiver<Update>,
    ) {
        let mut events = channel.as_ref().map(ConnectionHandle::subscribe);
        let mut status = channel.as_ref().map(ConnectionHandle::watch_status);
        if let Some(rx) = &status {
            self.connection = *rx.borrow();
        }

        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.fetch_all();
        self.publish();

        loop {
            tokio::select! {
                event = next_event(&mut events) => match event {
                    Ok(event) => self.apply_push(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "push events lagged; refetching snapshots");
                        self.fetch_all();
                    }
                    Err(RecvError::Closed) => events = None,
                },
                changed = next_status(&mut status) => match changed {
                    Some(next) => {
                        self.connection = next;
                        self.publish();
                    }
                    None => status = None,
                },
                Some(update) = updates.recv() => self.apply_update(update),
                command = commands.recv() => match command {
                    Some(Command::Refresh) => self.fetch_all(),
                    Some(Command::MarkRead { id, reply }) => self.mark_read(id, reply),
                    None => break,
                },
                changed = self.session.changed() => {
                    if changed.is_err() || !self.session.borrow_and_update().is_authenticated() {
                        tracing::info!("session ended; stopping dashboard");
                        break;
                    }
                }
                _ = ticker.tick() => self.publish(),
            }
        }

        if let Some(channel) = channel.as_mut() {
            channel.close().await;
        }
    }

    fn apply_push(&mut self, event: &PushEvent) {
        let mut changed = false;
        if self.counts.accepts(event) {
            changed |= self.counts.apply_push(event) == PushOutcome::Applied;
        }
        if self.activity.accepts(event) {
            changed |= self.activity.apply_push(event) == PushOutcome::Applied;
        }
        if self.inbox.apply_push(event) == PushOutcome::NeedsSnapshot {
            self.fetch_notifications();
        }
        if changed {
            self.publish();
        }
    }

    fn apply_update(&mut self, update: Update) {
        match update {
            Update::Count { key, result } => match result {
                Ok(count) => {
                    self.counts.apply_snapshot_key(key, count);
                    self.errors.remove(key);
                }
                Err(e) => self.record_failure(key, &e),
            },
            Update::Activity(result) => match result {
                Ok(records) => {
                    self.activity.apply_snapshot(records);
                    self.errors.remove(ACTIVITY);
                }
                Err(e) => self.record_failure(ACTIVITY, &e),
            },
            Update::Notifications(result) => match result {
                Ok(records) => {
                    self.inbox.apply_snapshot(records);
                    self.errors.remove(NOTIFICATIONS);
                }
                Err(e) => self.record_failure(NOTIFICATIONS, &e),
            },
            Update::ReadConfirmed(id) => {
                self.inbox.confirm_read(&id);
            }
        }
        self.publish();
    }

    fn record_failure(&mut self, domain: &'static str, error: &ApiError) {
        tracing::warn!(domain, error = %error, "snapshot fetch failed; keeping previous state");
        self.errors.insert(domain, error.user_message());
    }

    fn publish(&self) {
        let now = OffsetDateTime::now_utc();
        self.view_tx.send_replace(DashboardView {
            tiles: projector::stat_tiles(&self.counts, &self.tiles),
            activity: projector::activity_rows(&self.activity, now),
            notifications: projector::notification_badge(&self.inbox),
            connection: self.connection,
            errors: self.errors.clone(),
        });
    }

    fn fetch_all(&self) {
        for tile in &self.tiles {
            self.fetch_count(tile.key);
        }
        self.fetch_activity();
        self.fetch_notifications();
    }

    fn fetch_count(&self, key: &'static str) {
        let Some(kind) = ResourceKind::for_domain_key(key) else {
            tracing::warn!(key, "no resource for tile");
            return;
        };
        let resource = Resource::new(self.api.clone(), kind);
        self.spawn_fetch(async move { Update::Count { key, result: resource.count().await } });
    }

    fn fetch_activity(&self) {
        let api = self.api.clone();
        let limit = self.activity_limit;
        self.spawn_fetch(async move { Update::Activity(activity::recent(&api, limit).await) });
    }

    fn fetch_notifications(&self) {
        let api = self.api.clone();
        self.spawn_fetch(async move { Update::Notifications(contact::list(&api).await) });
    }

    fn mark_read(&self, id: String, reply: oneshot::Sender<Result<(), ApiError>>) {
        let api = self.api.clone();
        let updates = self.updates_tx.clone();
        tokio::spawn(async move {
            let result = contact::mark_read(&api, &id).await;
            if result.is_ok() {
                let _ = updates.send(Update::ReadConfirmed(id.clone()));
                let _ = updates.send(Update::Notifications(contact::list(&api).await));
            } else {
                tracing::warn!(id = %id, "mark-read rejected; notification stays unread");
            }
            let _ = reply.send(result);
        });
    }

    fn spawn_fetch<F>(&self, fetch: F)
    where
        F: std::future::Future<Output = Update> + Send + 'static,
    {
        let updates = self.updates_tx.clone();
        tokio::spawn(async move {
            if updates.send(fetch.await).is_err() {
                tracing::debug!("dashboard stopped; dropping fetch result");
            }
        });
    }
}

async fn next_event(events: &mut Option<broadcast::Receiver<PushEvent>>) -> Result<PushEvent, RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_status(status: &mut Option<watch::Receiver<ConnectionStatus>>) -> Option<ConnectionStatus> {
    let Some(rx) = status.as_mut() else {
        return std::future::pending().await;
    };
    match rx.changed().await {
        Ok(()) => Some(*rx.borrow_and_update()),
        Err(_) => None,
    }
}
