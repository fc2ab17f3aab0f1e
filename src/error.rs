//! Error types for every failure domain of the ingestion engine.
//!
//! None of these are fatal. The engine logs them and carries on with the next
//! record, document, or poll cycle.

use std::io;
use std::path::PathBuf;

/// A read of a tailed file failed for this poll cycle.
#[derive(Debug, thiserror::Error)]
pub enum TailError {
    /// Another process kept the file locked through every retry attempt.
    #[error("{} is locked by another process (gave up after {attempts} attempts)", path.display())]
    Locked { path: PathBuf, attempts: u32 },

    /// Any other I/O failure while opening, seeking, or reading.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A raw record could not be turned into an [`Event`](crate::Event).
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("record is empty")]
    Empty,

    #[error("record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("record has no \"event\" discriminator")]
    MissingDiscriminator,
}

/// A snapshot document exists but cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot {} stayed locked by another process", path.display())]
    Locked { path: PathBuf },

    #[error("failed to read snapshot {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("snapshot {} is unusable: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
}

/// A reducer rejected an otherwise well-formed event.
///
/// The slice keeps its previous state when this is returned.
#[derive(Debug, thiserror::Error)]
pub enum ReduceError {
    #[error("{event}: unexpected payload: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{event}: {reason}")]
    Invalid { event: String, reason: String },
}

impl ReduceError {
    pub(crate) fn invalid(event: &str, reason: impl Into<String>) -> Self {
        ReduceError::Invalid {
            event: event.to_string(),
            reason: reason.into(),
        }
    }
}
