//! Locating the game's journal files and following them across sessions.

use crate::config::RetryPolicy;
use crate::error::TailError;
use crate::event::RawRecord;
use crate::tail::FileTailer;
use log::{debug, info, warn};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, SystemTime};

/// Whether a file name looks like `Journal.<stamp>.<part>.log`.
pub fn is_journal_file(name: &str) -> bool {
    name.starts_with("Journal.") && name.ends_with(".log")
}

/// Find the newest journal in `dir`.
///
/// Newest means most recently modified; ties break on file name, which the
/// game stamps with the session start time. A missing directory has no
/// journals.
pub fn latest_journal(dir: &Path) -> io::Result<Option<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut newest: Option<(SystemTime, String, PathBuf)> = None;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_journal_file(&name) {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let candidate = (modified, name, entry.path());
        if newest
            .as_ref()
            .is_none_or(|best| (&candidate.0, &candidate.1) > (&best.0, &best.1))
        {
            newest = Some(candidate);
        }
    }

    Ok(newest.map(|(_, _, path)| path))
}

/// Follows whichever journal is newest in a directory.
///
/// When the game starts a new journal, the remaining lines of the current one
/// are drained first and tailing continues in the new file from its start.
#[derive(Debug)]
pub struct JournalSource {
    dir: PathBuf,
    retry: RetryPolicy,
    tailer: Option<FileTailer>,
}

impl JournalSource {
    pub fn new(dir: impl Into<PathBuf>, retry: RetryPolicy) -> Self {
        JournalSource {
            dir: dir.into(),
            retry,
            tailer: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The journal currently being tailed, if any has been found yet.
    pub fn current(&self) -> Option<&Path> {
        self.tailer.as_ref().map(FileTailer::path)
    }

    /// Read everything appended since the last poll.
    ///
    /// The first poll after construction reads the newest journal from its
    /// beginning, which is how the initial scan replays history.
    pub fn poll(&mut self) -> Result<Vec<RawRecord>, TailError> {
        let newest = latest_journal(&self.dir).map_err(|source| TailError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut records = Vec::new();
        if let Some(newest) = newest {
            if self.current() != Some(newest.as_path()) {
                if let Some(old) = self.tailer.as_mut() {
                    records.extend(old.poll()?);
                    info!(
                        "switching from {} to {}",
                        old.path().display(),
                        newest.display()
                    );
                } else {
                    debug!("tailing {}", newest.display());
                }
                self.tailer = Some(FileTailer::new(newest, self.retry));
            }
        }

        if let Some(tailer) = self.tailer.as_mut() {
            match tailer.poll() {
                Ok(new) => records.extend(new),
                // lines drained from the previous journal must not be lost;
                // the new one keeps its offset and is retried next poll
                Err(e) if !records.is_empty() => {
                    warn!("{e}; delivering {} earlier lines first", records.len());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }
}

/// Blocks the poll loop until the journal directory changes or the poll
/// interval elapses, whichever comes first.
///
/// Falls back to plain sleeping when watching is disabled or the platform
/// watcher cannot be created.
pub struct ChangeWaiter {
    events: Option<Receiver<()>>,
    _watcher: Option<RecommendedWatcher>,
}

impl ChangeWaiter {
    pub fn new(dir: &Path, enabled: bool) -> Self {
        if !enabled {
            return Self::sleeping();
        }

        let (tx, rx) = mpsc::channel();
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if res.is_ok() {
                let _ = tx.send(());
            }
        })
        .and_then(|mut watcher| {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
            Ok(watcher)
        });

        match watcher {
            Ok(watcher) => ChangeWaiter {
                events: Some(rx),
                _watcher: Some(watcher),
            },
            Err(e) => {
                debug!("not watching {}: {e}", dir.display());
                Self::sleeping()
            }
        }
    }

    fn sleeping() -> Self {
        ChangeWaiter {
            events: None,
            _watcher: None,
        }
    }

    pub fn wait(&self, timeout: Duration) {
        let Some(events) = &self.events else {
            thread::sleep(timeout);
            return;
        };
        match events.recv_timeout(timeout) {
            Ok(()) => while events.try_recv().is_ok() {},
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => thread::sleep(timeout),
        }
    }
}
