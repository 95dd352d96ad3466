//! The uniform response envelope.
//!
//! # Responsibilities
//! - Build the caller-visible envelope for every outcome
//! - Turn backend bodies into envelope payloads
//! - Write the envelope as JSON with a matching HTTP status
//!
//! # Design Decisions
//! - Construction is pure; the envelope is complete before it is sent
//! - Field names are fixed (`type`, `statusCode`, `payload`, `messages`)
//! - Out-of-range status codes are written as 500, the body keeps the configured value
//! - A relayed redirect keeps its `Location` header so clients can follow it

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message for unknown routing keys and unreachable discovery.
pub const NOT_REGISTERED_MESSAGE: &str =
    "Services are not registered in the system. Please contact System Administrator.";

/// Message for failed backend calls.
pub const NOT_AVAILABLE_MESSAGE: &str =
    "Service is not available in the system. Please contact System Administrator.";

/// Message for calls short-circuited by an open breaker.
pub const TEMPORARILY_UNAVAILABLE_MESSAGE: &str =
    "Service is temporarily unavailable. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnvelopeType {
    Success,
    Error,
}

/// Response shape returned to callers for every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: EnvelopeType,
    pub status_code: u16,
    pub payload: Vec<Value>,
    pub messages: Vec<String>,
    /// Redirect target written as the `Location` header, never serialized.
    #[serde(skip)]
    pub location: Option<HeaderValue>,
}

impl Envelope {
    pub fn build(kind: EnvelopeType, status_code: u16, payload: Vec<Value>, messages: Vec<String>) -> Self {
        Self {
            kind,
            status_code,
            payload,
            messages,
            location: None,
        }
    }

    pub fn with_location(mut self, location: Option<HeaderValue>) -> Self {
        self.location = location;
        self
    }

    pub fn success(status_code: u16, payload: Vec<Value>) -> Self {
        Self::build(EnvelopeType::Success, status_code, payload, Vec::new())
    }

    pub fn error(status_code: u16, messages: Vec<String>) -> Self {
        Self::build(EnvelopeType::Error, status_code, Vec::new(), messages)
    }

    pub fn is_success(&self) -> bool {
        self.kind == EnvelopeType::Success
    }
}

/// Payload values for a backend body.
///
/// Empty bodies give no values, a JSON array gives its elements, any other
/// JSON value is wrapped, and non-JSON text becomes a single string.
pub fn payload_from_body(body: &[u8]) -> Vec<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Vec::new();
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Array(values)) => values,
        Ok(value) => vec![value],
        Err(_) => vec![Value::String(String::from_utf8_lossy(body).into_owned())],
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match self.location.clone() {
            Some(location) => (status, [(header::LOCATION, location)], Json(self)).into_response(),
            None => (status, Json(self)).into_response(),
        }
    }
}
