//! Cold-start reconciliation.
//!
//! On startup the whole current journal is replayed in its original order
//! through every reducer, and only then are snapshot documents consulted for
//! slices the history left empty. Replaying before bootstrapping matters: a
//! `Loadout` early in the file may invalidate cargo that a `Cargo` event
//! later in the same file restores, and applying only the newest records
//! would leave the hold empty.

use crate::bus::Publisher;
use crate::journal::JournalSource;
use crate::pipeline::Pipeline;
use crate::reducers::SliceId;
use log::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanPhase {
    #[default]
    NotStarted,
    ScanningHistory,
    Ready,
}

/// What an initial scan did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Records replayed from history.
    pub records: usize,
    /// Slices that were filled from a snapshot document.
    pub bootstrapped: Vec<SliceId>,
}

#[derive(Debug, Default)]
pub struct InitialScan {
    phase: ScanPhase,
}

impl InitialScan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// Replay history, bootstrap what is still missing, publish every slice,
    /// then signal readiness.
    ///
    /// Per-record notifications are not published during replay; the
    /// consumer receives the final state of each slice once, followed by
    /// [`Notification::InitialScanComplete`](crate::Notification::InitialScanComplete).
    /// A history read failure is logged and the scan completes with whatever
    /// was read; the source retries from the same position on its next poll.
    pub fn run(
        &mut self,
        pipeline: &mut Pipeline,
        source: &mut JournalSource,
        publisher: &Publisher,
    ) -> ScanSummary {
        self.phase = ScanPhase::ScanningHistory;
        let mut summary = ScanSummary::default();

        match source.poll() {
            Ok(records) => {
                summary.records = records.len();
                for record in &records {
                    pipeline.ingest(record);
                }
            }
            Err(e) => warn!("could not replay journal history: {e}"),
        }

        summary.bootstrapped = pipeline
            .bootstrap()
            .iter()
            .map(|state| state.slice())
            .collect();

        publisher.publish_all(pipeline.states());
        publisher.scan_complete();
        self.phase = ScanPhase::Ready;

        info!(
            "initial scan complete: {} records replayed from {}, bootstrapped {:?}",
            summary.records,
            source
                .current()
                .map_or_else(|| "no journal".to_string(), |p| p.display().to_string()),
            summary.bootstrapped
        );
        summary
    }
}
