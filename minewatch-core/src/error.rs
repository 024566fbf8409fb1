use thiserror::Error;

/// Errors surfaced to callers of the chat API.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChatError {
    #[error("Validation error: {0}")]
    Validation(String),
}

/// A failed write to the durable mirror. Logged by the store, never returned
/// from `append`.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A durable mirror that could not be read back on startup. The store treats
/// any of these as "no prior history".
#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed chat log: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Chat log is not a JSON array")]
    NotAnArray,

    #[error("Record {index} rejected: {reason}")]
    InvalidRecord { index: usize, reason: String },
}
