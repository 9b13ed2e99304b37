//! REST access to the content backend.
//!
//! `client` owns transport, auth headers and the 401 policy; the other
//! modules are endpoint helpers on top of it. Entity CRUD goes through the
//! single generic [`resource::Resource`].

pub mod activity;
pub mod auth;
pub mod client;
pub mod contact;
pub mod media;
pub mod resource;
pub mod types;

pub use client::{ApiClient, ApiError, RequestKind};
pub use resource::{Resource, ResourceKind};
