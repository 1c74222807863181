//! Error taxonomy for the decision pipeline.
//!
//! None of these ever reach the browsing user: each kind is contained at the
//! component that produces it.
//! - `PatternError`: a rule pattern that cannot be compiled or stored
//! - `ClassifierError`: the remote classifier could not give an answer
//! - `PersistenceError`: the durable store failed to read or write

use thiserror::Error;

/// A rule pattern rejected by the matcher.
#[derive(Debug, Error)]
pub enum PatternError {
    /// Pattern is empty or whitespace only.
    #[error("pattern is empty")]
    Empty,

    /// Compiled expression was rejected by the regex engine.
    #[error("invalid pattern '{pattern}': {source}")]
    Invalid {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// The remote classifier was unavailable or gave an unusable answer.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Request did not complete within the configured timeout.
    #[error("classifier request timed out")]
    Timeout,

    /// Connection or transport failure.
    #[error("classifier request failed: {0}")]
    Transport(String),

    /// Service answered with a non-success status.
    #[error("classifier returned HTTP {0}")]
    Status(u16),

    /// Response body was not the expected JSON document.
    #[error("malformed classifier response: {0}")]
    MalformedBody(String),
}

impl From<reqwest::Error> for ClassifierError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClassifierError::Timeout
        } else if err.is_decode() {
            ClassifierError::MalformedBody(err.to_string())
        } else if let Some(status) = err.status() {
            ClassifierError::Status(status.as_u16())
        } else {
            ClassifierError::Transport(err.to_string())
        }
    }
}

/// Durable store failure.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Store lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
