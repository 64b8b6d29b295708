//! Crate-wide error taxonomy.
//!
//! Mirrors the failure classes the rest of the crate reasons about explicitly:
//! unsupported input, transient I/O, invariant violations, and cancellation.
//! Parse failures are deliberately absent — a parse failure is a silent
//! fallback path, not an error (see `chunking::ast`).

use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RetrievalErr>;

/// Everything that can go wrong indexing or searching a codebase.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalErr {
    /// A file extension or embedder backend the crate does not recognise.
    #[error("unsupported input: {0}")]
    Unsupported(String),

    /// A filesystem read/write failure.
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A failure talking to the embedding service.
    #[error("embedding request failed: {0}")]
    Embedding(String),

    /// The store returned or was asked for data that violates a documented
    /// invariant (dimension mismatch, missing owning file, count mismatch).
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// The underlying SQLite engine reported an error.
    #[error("storage error: {0}")]
    Storage(#[source] Box<rusqlite::Error>),

    /// An HTTP transport failure talking to the embedding service.
    #[error("transport error: {0}")]
    Transport(#[source] Box<reqwest::Error>),

    /// The operation was cancelled by its caller. Kept distinct from other
    /// failures so callers can tell a user abort from a genuine failure.
    #[error("operation cancelled")]
    Cancelled,
}

impl RetrievalErr {
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    /// True when a retry of the same operation might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Io { .. })
    }
}

impl From<rusqlite::Error> for RetrievalErr {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(Box::new(err))
    }
}

impl From<reqwest::Error> for RetrievalErr {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}
