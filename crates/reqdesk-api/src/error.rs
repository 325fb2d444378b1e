//! Error types for reqdesk-api

use thiserror::Error;

use crate::types::ToolStatus;

/// Result type alias using reqdesk-api Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the backend or mutating the data model
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend returned a non-success response
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// A tool call was asked to move backwards or out of a terminal state
    #[error("Invalid tool call transition: {from} -> {to}")]
    InvalidTransition { from: ToolStatus, to: ToolStatus },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create an API error from a status code and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Map an HTTP status and body into the most specific error variant
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = extract_error_message(body);
        match status {
            401 | 403 => Error::Auth(message),
            404 => Error::NotFound(message),
            _ => Error::api(status, message),
        }
    }

    /// Short message suitable for an inline error string in a panel
    pub fn user_message(&self) -> String {
        match self {
            Error::Http(e) if e.is_timeout() => "The request timed out".to_string(),
            Error::Http(_) => "Could not reach the server".to_string(),
            Error::Api { message, .. } => message.clone(),
            Error::NotFound(what) => format!("Not found: {}", what),
            Error::Auth(_) => "You are not authorized to do that".to_string(),
            other => other.to_string(),
        }
    }
}

/// Pull `detail` or `message` out of a JSON error body, falling back to the raw text
fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        trimmed.to_string()
    }
}
