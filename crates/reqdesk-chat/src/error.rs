//! Error types for reqdesk-chat

use thiserror::Error;

/// Result type alias using reqdesk-chat Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while dispatching chat actions
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the backend layer
    #[error(transparent)]
    Api(#[from] reqdesk_api::Error),

    /// The local command engine rejected or failed a command
    #[error("Command failed: {0}")]
    Command(String),

    /// The operation is already running for this id
    #[error("Already in progress: {0}")]
    InFlight(String),

    /// A generic chat error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Short text for an inline status line or a synthesized message
    pub fn user_message(&self) -> String {
        match self {
            Error::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}
