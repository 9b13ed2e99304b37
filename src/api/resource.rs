//! One generic CRUD capability over a resource path.
//!
//! Every content entity exposes the same five operations, so instead of a
//! wrapper per entity there is a [`ResourceKind`] naming the path and a
//! [`Resource`] that speaks to it. `about` and `home` are single documents
//! and use [`Resource::fetch`] / [`Resource::replace`] instead.

#[cfg(test)]
#[path = "resource_test.rs"]
mod resource_test;

use std::fmt;
use std::str::FromStr;

use reqwest::Method;
use serde_json::Value;

use super::client::{ApiClient, ApiError, RequestKind, path_id};
use super::types::Listing;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Projects,
    Blogs,
    Skills,
    Experience,
    Testimonials,
    Services,
    About,
    Home,
    Users,
}

impl ResourceKind {
    pub const ALL: [Self; 9] = [
        Self::Projects,
        Self::Blogs,
        Self::Skills,
        Self::Experience,
        Self::Testimonials,
        Self::Services,
        Self::About,
        Self::Home,
        Self::Users,
    ];

    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Projects => "/api/projects",
            Self::Blogs => "/api/blogs",
            Self::Skills => "/api/skills",
            Self::Experience => "/api/experience",
            Self::Testimonials => "/api/testimonials",
            Self::Services => "/api/services",
            Self::About => "/api/about",
            Self::Home => "/api/home",
            Self::Users => "/admin/users",
        }
    }

    /// Domain key used by `count-update` events for this collection.
    #[must_use]
    pub fn domain_key(self) -> Option<&'static str> {
        match self {
            Self::Projects => Some("project"),
            Self::Blogs => Some("blog"),
            Self::Skills => Some("skill"),
            Self::Experience => Some("experience"),
            Self::Testimonials => Some("testimonial"),
            Self::Services => Some("service"),
            Self::Users => Some("user"),
            Self::About | Self::Home => None,
        }
    }

    /// Resource whose collection is counted under `key`.
    #[must_use]
    pub fn for_domain_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.domain_key() == Some(key))
    }

    /// Single-document resources have no list or per-id operations.
    #[must_use]
    pub fn is_singleton(self) -> bool {
        matches!(self, Self::About | Self::Home)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::Blogs => "blogs",
            Self::Skills => "skills",
            Self::Experience => "experience",
            Self::Testimonials => "testimonials",
            Self::Services => "services",
            Self::About => "about",
            Self::Home => "home",
            Self::Users => "users",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown resource '{0}'")]
pub struct UnknownResource(String);

impl FromStr for ResourceKind {
    type Err = UnknownResource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted || kind.domain_key() == Some(wanted.as_str()))
            .ok_or_else(|| UnknownResource(s.to_owned()))
    }
}

/// CRUD handle for one resource path.
#[derive(Clone, Debug)]
pub struct Resource {
    api: ApiClient,
    kind: ResourceKind,
}

impl Resource {
    #[must_use]
    pub fn new(api: ApiClient, kind: ResourceKind) -> Self {
        Self { api, kind }
    }

    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn item_path(&self, id: &str) -> Result<String, ApiError> {
        if self.kind.is_singleton() {
            return Err(ApiError::Validation(format!("{} has no per-item operations", self.kind)));
        }
        let id = path_id(id, "id")?;
        Ok(format!("{}/{id}", self.kind.path()))
    }

    /// # Errors
    ///
    /// Propagates [`ApiError`] from the request.
    pub async fn list(&self) -> Result<Listing, ApiError> {
        let body = self.api.get(self.kind.path()).await?;
        Ok(Listing::from_value(body))
    }

    /// Number of items in the collection, as the dashboard counts them.
    ///
    /// # Errors
    ///
    /// Propagates [`ApiError`] from the request.
    pub async fn count(&self) -> Result<u64, ApiError> {
        Ok(self.list().await?.count())
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for a blank id or a singleton
    /// resource, otherwise propagates the request error.
    pub async fn get(&self, id: &str) -> Result<Value, ApiError> {
        let path = self.item_path(id)?;
        self.api.get(&path).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for a non-object body or a singleton
    /// resource, otherwise propagates the request error.
    pub async fn create(&self, body: &Value) -> Result<Value, ApiError> {
        if self.kind.is_singleton() {
            return Err(ApiError::Validation(format!("{} cannot be created", self.kind)));
        }
        require_object(body)?;
        self.api
            .request(Method::POST, self.kind.path(), Some(body), RequestKind::Standard)
            .await
    }

    /// # Errors
    ///
    /// As [`Resource::create`], plus a blank id.
    pub async fn update(&self, id: &str, body: &Value) -> Result<Value, ApiError> {
        let path = self.item_path(id)?;
        require_object(body)?;
        self.api.request(Method::PUT, &path, Some(body), RequestKind::Standard).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for a blank id or a singleton
    /// resource, otherwise propagates the request error.
    pub async fn delete(&self, id: &str) -> Result<Value, ApiError> {
        let path = self.item_path(id)?;
        self.api.request(Method::DELETE, &path, None, RequestKind::Standard).await
    }

    /// Read a single-document resource.
    ///
    /// # Errors
    ///
    /// Propagates [`ApiError`] from the request.
    pub async fn fetch(&self) -> Result<Value, ApiError> {
        self.api.get(self.kind.path()).await
    }

    /// Overwrite a single-document resource.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for a non-object body, otherwise
    /// propagates the request error.
    pub async fn replace(&self, body: &Value) -> Result<Value, ApiError> {
        require_object(body)?;
        self.api
            .request(Method::PUT, self.kind.path(), Some(body), RequestKind::Standard)
            .await
    }
}

fn require_object(body: &Value) -> Result<(), ApiError> {
    match body {
        Value::Object(map) if !map.is_empty() => Ok(()),
        _ => Err(ApiError::Validation("request body must be a non-empty JSON object".to_owned())),
    }
}
