//! Endpoint records and client handles.

use std::fmt;
use std::sync::Arc;

use axum::http::uri::{Authority, Scheme};
use axum::http::Uri;
use serde::{Deserialize, Serialize};
use url::Url;

/// Advisory registration status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointStatus {
    #[default]
    Up,
    Unknown,
}

/// Opaque location of a backend, owned by the discovery collaborator.
///
/// Only `Discovery` implementations should look inside.
#[derive(Clone, PartialEq, Eq)]
pub struct Location(Arc<str>);

impl Location {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(Arc::from(raw.into()))
    }

    /// Raw form, for `Discovery::resolve_client` implementations.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Location(..)")
    }
}

/// One registered backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRecord {
    /// Registration name.
    pub name: String,
    /// Routing prefix this backend serves.
    pub routing_path: String,
    /// Opaque location handle.
    pub location: Location,
    /// Advisory status; never filtered on.
    pub status: EndpointStatus,
}

impl EndpointRecord {
    pub fn new(name: impl Into<String>, routing_path: impl Into<String>, location: Location) -> Self {
        Self {
            name: name.into(),
            routing_path: routing_path.into(),
            location,
            status: EndpointStatus::Up,
        }
    }

    pub fn with_status(mut self, status: EndpointStatus) -> Self {
        self.status = status;
        self
    }
}

/// A callable handle to a backend: where requests for a record are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceHandle {
    name: String,
    scheme: Scheme,
    authority: Authority,
}

impl ServiceHandle {
    /// Build a handle from a backend base URL. Returns `None` when the URL
    /// has no host.
    pub fn from_url(name: impl Into<String>, url: &Url) -> Option<Self> {
        let host = url.host_str()?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let scheme = if url.scheme() == "https" { Scheme::HTTPS } else { Scheme::HTTP };
        Some(Self {
            name: name.into(),
            scheme,
            authority: authority.parse().ok()?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Absolute URI on this backend for a path (and optional query).
    pub fn uri_for(&self, path_and_query: &str) -> Result<Uri, axum::http::Error> {
        let path_and_query = if path_and_query.is_empty() { "/" } else { path_and_query };
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }
}
