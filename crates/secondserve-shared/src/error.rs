use thiserror::Error;

/// Failure reported by any backend collaborator (data store, auth, storage,
/// push relay, places).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The collaborator answered with an error payload.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response could not be decoded into the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The addressed row or object does not exist.
    #[error("Record not found")]
    NotFound,

    /// Local persistence failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl BackendError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// The collaborator's own message, when it sent one worth showing.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } if !message.trim().is_empty() => Some(message),
            _ => None,
        }
    }
}
