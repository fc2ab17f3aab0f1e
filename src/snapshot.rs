//! Whole-file snapshot documents.
//!
//! The game overwrites a few documents (such as `Cargo.json` and
//! `Status.json`) with the complete current value of one kind of state. They
//! are read to bootstrap a slice that the journal history did not cover, and
//! to fill in cargo events that omit their inventory.
//!
//! A document has the same shape as a journal record, so it decodes into an
//! ordinary [`Event`]:
//!
//! ```text
//! $ cat Cargo.json | jq .
//! {
//!   "timestamp": "2024-05-01T12:00:00Z",
//!   "event": "Cargo",
//!   "Vessel": "Ship",
//!   "Count": 4,
//!   "Inventory": [ { "Name": "painite", "Count": 4, "Stolen": 0 } ]
//! }
//! ```

use crate::config::{RetryPolicy, SnapshotSource};
use crate::error::{SnapshotError, TailError};
use crate::event::Event;
use crate::reducers::SliceId;
use crate::tail::{open_shared, with_lock_retry};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Load one snapshot document.
///
/// Returns `Ok(None)` if the file doesn't exist. An empty or malformed file
/// is a [`SnapshotError::Decode`]; callers treat that as "no usable
/// snapshot".
pub fn load(path: &Path, retry: &RetryPolicy) -> Result<Option<Event>, SnapshotError> {
    let read = with_lock_retry(path, retry, || {
        let mut contents = String::new();
        open_shared(path)?.read_to_string(&mut contents)?;
        Ok(contents)
    });

    let contents = match read {
        Ok(contents) => contents,
        Err(TailError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            return Ok(None);
        }
        Err(TailError::Io { path, source }) => return Err(SnapshotError::Io { path, source }),
        Err(TailError::Locked { path, .. }) => return Err(SnapshotError::Locked { path }),
    };

    Event::decode(&contents)
        .map(Some)
        .map_err(|source| SnapshotError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

/// Knows which document belongs to which slice.
#[derive(Debug, Clone)]
pub struct SnapshotLoader {
    dir: PathBuf,
    sources: Vec<SnapshotSource>,
    retry: RetryPolicy,
}

impl SnapshotLoader {
    pub fn new(dir: impl Into<PathBuf>, sources: Vec<SnapshotSource>, retry: RetryPolicy) -> Self {
        SnapshotLoader {
            dir: dir.into(),
            sources,
            retry,
        }
    }

    /// Path of the document configured for `slice`, if any.
    pub fn path_for(&self, slice: SliceId) -> Option<PathBuf> {
        self.sources
            .iter()
            .find(|s| s.slice == slice)
            .map(|s| self.dir.join(&s.file_name))
    }

    /// Load the document for `slice`.
    ///
    /// `Ok(None)` when no document is configured or the file is absent.
    pub fn load(&self, slice: SliceId) -> Result<Option<Event>, SnapshotError> {
        match self.path_for(slice) {
            Some(path) => load(&path, &self.retry),
            None => Ok(None),
        }
    }
}
