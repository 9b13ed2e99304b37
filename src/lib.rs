//! Live sync core for the portfolio admin backend.
//!
//! ARCHITECTURE
//! ============
//! - [`session`]: the token and the auth state machine, one writer.
//! - [`api`]: bearer-authenticated REST, one generic resource client plus
//!   auth, contact, activity and media endpoints.
//! - [`realtime`]: the Socket.IO event channel with bounded reconnects.
//! - [`reconcile`]: per-domain state merged from pushes and snapshots.
//! - [`projector`]: pure view projections (tiles, activity rows, badge).
//! - [`dashboard`]: the owner task wiring all of the above together.
//!
//! Data flows one way: session → channel → push events → reconcilers ←
//! REST snapshots; reconcilers → projector → `watch` subscribers.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod projector;
pub mod realtime;
pub mod reconcile;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;
