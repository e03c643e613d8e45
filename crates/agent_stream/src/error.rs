use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Error as JsonError, Value};

#[derive(Debug)]
pub enum ChatApiError {
    InvalidRequest(String),
    InvalidHeader(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    Serde(JsonError),
    /// The turn's cancellation signal fired. Never shown to the user.
    Cancelled,
}

impl ChatApiError {
    /// Returns true for user-initiated cancellation as opposed to a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// FastAPI-style error body: `{"detail": ...}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    pub detail: Option<Value>,
}

impl ErrorPayload {
    fn detail_message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(text) => non_empty_string(text).map(ToOwned::to_owned),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for ChatApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest(message) => write!(f, "invalid request: {message}"),
            Self::InvalidHeader(message) => write!(f, "invalid header: {message}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => {
                write!(f, "Server error: {}", status.as_u16())?;
                if !message.is_empty() {
                    write!(f, " ({message})")?;
                }
                Ok(())
            }
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::Cancelled => write!(f, "request was cancelled"),
        }
    }
}

impl std::error::Error for ChatApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(error) => Some(error),
            Self::Serde(error) => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ChatApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for ChatApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

/// Extract a human-readable message from a non-success response body.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        if let Some(message) = payload.detail_message() {
            return message;
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

fn non_empty_string(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
