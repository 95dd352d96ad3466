//! Outbound transport.
//!
//! # Responsibilities
//! - Send one request to a resolved backend and buffer its response
//! - Bound connect time and response body size
//!
//! # Design Decisions
//! - `Transport` is a trait so the pipeline can be driven by fakes in tests
//! - Production transport is hyper-util's pooled legacy client (HTTP/1.1)
//! - Timeouts on the whole call belong to the dispatcher, not the transport

use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::discovery::ServiceHandle;

/// A request ready to be sent to a backend.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    /// Path and query on the backend.
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A fully buffered backend response.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl BackendResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

/// Errors from a single transport call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Invalid backend request: {0}")]
    Request(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Failed to read backend body: {0}")]
    Body(String),
}

/// Sends requests to backends.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        handle: &ServiceHandle,
        request: OutboundRequest,
    ) -> Result<BackendResponse, TransportError>;
}

/// Transport over hyper-util's pooled client.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
    max_body_bytes: usize,
}

impl HyperTransport {
    pub fn new(connect_timeout: Duration, max_body_bytes: usize) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self {
            client,
            max_body_bytes,
        }
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(
        &self,
        handle: &ServiceHandle,
        request: OutboundRequest,
    ) -> Result<BackendResponse, TransportError> {
        let uri = handle
            .uri_for(&request.path_and_query)
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let mut outbound = Request::builder()
            .method(request.method)
            .uri(uri)
            .body(Body::from(request.body))
            .map_err(|e| TransportError::Request(e.to_string()))?;
        *outbound.headers_mut() = request.headers;

        let response = self
            .client
            .request(outbound)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), self.max_body_bytes)
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        Ok(BackendResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }
}
