use thiserror::Error;

pub type Result<T> = std::result::Result<T, RevpubError>;

#[derive(Debug, Error)]
pub enum RevpubError {
    #[error("transaction not initialized: {0}")]
    NotInitialized(String),

    #[error("commit protocol violation: {0}")]
    Protocol(String),

    #[error("cannot derive alias path: revision '{revision}' must occur exactly once in '{folder}'")]
    AmbiguousRevisionPath { folder: String, revision: String },

    #[error("not a file: '{0}'")]
    NotAFile(String),

    #[error("not found: '{0}'")]
    NotFound(String),

    #[error("checksum mismatch for '{path}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("commit is out of date: opened against r{base}, head is now r{head}")]
    OutOfDate { base: u64, head: u64 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid path: '{0}'")]
    InvalidPath(String),

    #[error("unsupported store scheme: '{0}'")]
    UnsupportedScheme(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),

    #[error("deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl RevpubError {
    /// Shorthand for the most common nesting violation message.
    pub fn protocol(msg: impl Into<String>) -> Self {
        RevpubError::Protocol(msg.into())
    }
}
