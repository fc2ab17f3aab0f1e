//! Incremental reading of a file that another process keeps appending to.

use crate::config::RetryPolicy;
use crate::error::TailError;
use crate::event::RawRecord;
use fs2::FileExt;
use log::debug;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::thread;

/// Compute xxh64 hash of raw line bytes (without trailing newline), hex-encoded.
pub fn line_hash(line: &[u8]) -> String {
    let hash = xxhash_rust::xxh64::xxh64(line, 0);
    format!("{:016x}", hash)
}

/// Whether an I/O error means "someone else holds the file right now".
pub fn is_transient(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    let contended = fs2::lock_contended_error().raw_os_error();
    err.raw_os_error().is_some_and(|code| {
        Some(code) == contended
            // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
            || (cfg!(windows) && matches!(code, 32 | 33))
    })
}

/// Run `op`, retrying transient lock errors under `policy`.
///
/// Sleeps `policy.delay()` between attempts and never more than
/// `policy.attempts` times in total, so a stuck lock cannot block the caller
/// indefinitely. Non-transient errors are returned immediately.
pub fn with_lock_retry<T>(
    path: &Path,
    policy: &RetryPolicy,
    mut op: impl FnMut() -> io::Result<T>,
) -> Result<T, TailError> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if is_transient(&e) => {
                if attempt >= attempts {
                    return Err(TailError::Locked {
                        path: path.to_path_buf(),
                        attempts,
                    });
                }
                debug!(
                    "{} is locked (attempt {attempt}/{attempts}), retrying",
                    path.display()
                );
                attempt += 1;
                thread::sleep(policy.delay());
            }
            Err(source) => {
                return Err(TailError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }
    }
}

/// Open a file for reading without taking anything away from its writer.
///
/// The shared advisory lock is only a probe: it fails while another process
/// holds an exclusive lock, and it is released before any byte is read.
pub fn open_shared(path: &Path) -> io::Result<File> {
    let file = File::open(path)?;
    FileExt::try_lock_shared(&file)?;
    FileExt::unlock(&file)?;
    Ok(file)
}

/// Where the tailer stopped, plus enough to recognise the same file later.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Checkpoint {
    offset: u64,
    /// Last non-empty line consumed: start, length without the newline,
    /// and hash of exactly those bytes. Blank lines after it move `offset`
    /// but not this anchor.
    last_line: Option<(u64, u64, String)>,
}

/// Tails one file, yielding complete lines appended since the last poll.
///
/// The read position lives in memory only. A missing file is not an error:
/// polling simply yields nothing until it appears. If the file shrinks below
/// the read position, or the line just before the position no longer hashes
/// to what was consumed, the file was rotated or replaced and reading
/// restarts from the beginning.
///
/// A trailing line without a newline is still being written; it is left for
/// the next poll.
#[derive(Debug)]
pub struct FileTailer {
    path: PathBuf,
    retry: RetryPolicy,
    checkpoint: Checkpoint,
}

impl FileTailer {
    pub fn new(path: impl Into<PathBuf>, retry: RetryPolicy) -> Self {
        FileTailer {
            path: path.into(),
            retry,
            checkpoint: Checkpoint::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset just past the last consumed line.
    pub fn offset(&self) -> u64 {
        self.checkpoint.offset
    }

    /// Forget the read position; the next poll starts from the beginning.
    pub fn reset(&mut self) {
        self.checkpoint = Checkpoint::default();
    }

    /// Read every complete line appended since the previous poll.
    ///
    /// On error the read position is unchanged, so a later poll delivers the
    /// same lines exactly once.
    pub fn poll(&mut self) -> Result<Vec<RawRecord>, TailError> {
        let mut file = match with_lock_retry(&self.path, &self.retry, || open_shared(&self.path)) {
            Ok(file) => file,
            Err(TailError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let len = file.metadata().map_err(|e| self.io_error(e))?.len();

        if len < self.checkpoint.offset {
            debug!(
                "{} shrank from {} to {len} bytes, reading from the start",
                self.path.display(),
                self.checkpoint.offset
            );
            self.reset();
        } else if !self.same_file(&mut file).map_err(|e| self.io_error(e))? {
            debug!(
                "{} was replaced, reading from the start",
                self.path.display()
            );
            self.reset();
        }

        if len == self.checkpoint.offset {
            return Ok(Vec::new());
        }

        let start = self.checkpoint.offset;
        let mut buf = Vec::new();
        file.seek(SeekFrom::Start(start))
            .map_err(|e| self.io_error(e))?;
        file.by_ref()
            .take(len - start)
            .read_to_end(&mut buf)
            .map_err(|e| self.io_error(e))?;

        Ok(self.split_lines(start, &buf))
    }

    fn split_lines(&mut self, start: u64, buf: &[u8]) -> Vec<RawRecord> {
        let mut records = Vec::new();
        let mut pos = 0usize;

        while let Some(newline) = buf[pos..].iter().position(|&b| b == b'\n') {
            let line_start = start + pos as u64;
            let raw = &buf[pos..pos + newline];
            pos += newline + 1;
            self.checkpoint.offset = start + pos as u64;

            let text = String::from_utf8_lossy(raw);
            let text = text.trim_end_matches('\r');
            if text.trim().is_empty() {
                continue;
            }

            self.checkpoint.last_line = Some((line_start, raw.len() as u64, line_hash(raw)));
            records.push(RawRecord {
                source: self.path.clone(),
                offset: line_start,
                line: text.to_string(),
            });
        }

        records
    }

    /// Check that the last consumed line is still where we left it.
    fn same_file(&self, file: &mut File) -> io::Result<bool> {
        let Some((line_start, line_len, hash)) = &self.checkpoint.last_line else {
            return Ok(true);
        };

        let mut line_buf = vec![0u8; *line_len as usize];
        file.seek(SeekFrom::Start(*line_start))?;
        match file.read_exact(&mut line_buf) {
            Ok(()) => Ok(line_hash(&line_buf) == *hash),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn io_error(&self, source: io::Error) -> TailError {
        TailError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
