//! Engine configuration.
//!
//! Everything that influences reducer or tailer behavior lives here and is
//! handed to the engine at construction time. Host applications typically
//! deserialize it from their own settings file; every field has a default.

use crate::reducers::SliceId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How often and how long to retry a file that another process has locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub attempts: u32,
    /// Fixed delay between attempts, in milliseconds.
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 5,
            delay_ms: 50,
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        RetryPolicy {
            attempts,
            delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// A whole-file document that holds the complete current value of one slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSource {
    pub slice: SliceId,
    /// File name relative to the journal directory.
    pub file_name: String,
}

impl SnapshotSource {
    pub fn new(slice: SliceId, file_name: impl Into<String>) -> Self {
        SnapshotSource {
            slice,
            file_name: file_name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Start a session on the first prospecting, collecting, or refining
    /// activity instead of waiting for an explicit start.
    pub auto_start: bool,
    /// How many distinct prospector results to keep, newest first.
    pub max_prospector_results: usize,
}

impl Default for MiningConfig {
    fn default() -> Self {
        MiningConfig {
            auto_start: true,
            max_prospector_results: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarrierConfig {
    /// Cooldown imposed after a jump request is cancelled, in seconds.
    pub cancel_cooldown_secs: i64,
}

impl Default for CarrierConfig {
    fn default() -> Self {
        CarrierConfig {
            cancel_cooldown_secs: 60,
        }
    }
}

/// Configuration for an [`Engine`](crate::Engine).
///
/// # Examples
///
/// ```
/// use journalfold::{EngineConfig, RetryPolicy};
/// use std::time::Duration;
///
/// let config = EngineConfig::new("/tmp/journals")
///     .poll_interval(Duration::from_millis(100))
///     .lock_retry(RetryPolicy::new(3, Duration::from_millis(20)))
///     .auto_start_mining(false);
/// assert_eq!(config.poll_interval_ms, 100);
/// assert!(!config.mining.auto_start);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub journal_dir: PathBuf,
    pub poll_interval_ms: u64,
    pub lock_retry: RetryPolicy,
    pub snapshots: Vec<SnapshotSource>,
    pub mining: MiningConfig,
    pub carrier: CarrierConfig,
    /// Wake the poll loop on filesystem notifications.
    pub watch_files: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            journal_dir: PathBuf::new(),
            poll_interval_ms: 250,
            lock_retry: RetryPolicy::default(),
            snapshots: vec![
                SnapshotSource::new(SliceId::Cargo, "Cargo.json"),
                SnapshotSource::new(SliceId::Balance, "Status.json"),
            ],
            mining: MiningConfig::default(),
            carrier: CarrierConfig::default(),
            watch_files: true,
        }
    }
}

impl EngineConfig {
    pub fn new(journal_dir: impl AsRef<Path>) -> Self {
        EngineConfig {
            journal_dir: journal_dir.as_ref().to_path_buf(),
            ..EngineConfig::default()
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn lock_retry(mut self, policy: RetryPolicy) -> Self {
        self.lock_retry = policy;
        self
    }

    /// Register a snapshot document for a slice, replacing any previous
    /// document for the same slice.
    pub fn snapshot(mut self, slice: SliceId, file_name: impl Into<String>) -> Self {
        self.snapshots.retain(|s| s.slice != slice);
        self.snapshots.push(SnapshotSource::new(slice, file_name));
        self
    }

    pub fn auto_start_mining(mut self, enabled: bool) -> Self {
        self.mining.auto_start = enabled;
        self
    }

    pub fn max_prospector_results(mut self, max: usize) -> Self {
        self.mining.max_prospector_results = max;
        self
    }

    pub fn carrier_cancel_cooldown(mut self, secs: i64) -> Self {
        self.carrier.cancel_cooldown_secs = secs;
        self
    }

    pub fn watch_files(mut self, enabled: bool) -> Self {
        self.watch_files = enabled;
        self
    }

    pub fn poll_interval_duration(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
