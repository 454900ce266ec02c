use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use slide_protocol::ApiErrorBody;
use std::fmt;
use thiserror::Error;

/// Every transport failure ends up here: no response, non-success status, or a
/// body that is not the JSON we expected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn network(cause: impl fmt::Display) -> Self {
        Self::new(format!("Network error: {cause}"))
    }

    pub fn invalid_response(cause: impl fmt::Display) -> Self {
        Self::new(format!("Invalid response: {cause}"))
    }

    /// Builds the error for a non-success status. The body's own message wins
    /// over the status line.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let parsed = serde_json::from_str::<ApiErrorBody>(body).unwrap_or_default();
        match parsed.user_message() {
            Some(message) => Self::new(message),
            None => Self::new(format!("API request failed: {status}")),
        }
    }
}

/// JSON request/response channel to the deck service.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, endpoint: &str, payload: Value) -> Result<Value, TransportError>;

    async fn get_json(&self, endpoint: &str) -> Result<Value, TransportError>;
}

/// Joins a base URL and a server path without doubling the separator.
/// Absolute URLs are returned untouched.
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
