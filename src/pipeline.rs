//! Decoding, dispatch and snapshot fill-in for one stream of records.

use crate::config::EngineConfig;
use crate::dispatch::Dispatcher;
use crate::event::{Event, EventKind, RawRecord};
use crate::reducers::cargo::needs_cargo_file;
use crate::reducers::{SliceId, SliceState};
use crate::snapshot::SnapshotLoader;
use chrono::{DateTime, Utc};
use log::{debug, warn};

/// Decoder, dispatcher and snapshot loader wired together.
///
/// Owns all reducer state. Exactly one thread drives a pipeline at a time:
/// the ingestion worker while running, the [`Engine`](crate::Engine) while
/// stopped.
#[derive(Debug)]
pub struct Pipeline {
    dispatcher: Dispatcher,
    snapshots: SnapshotLoader,
}

impl Pipeline {
    pub fn new(config: &EngineConfig) -> Self {
        Pipeline {
            dispatcher: Dispatcher::with_reducers(config),
            snapshots: SnapshotLoader::new(
                &config.journal_dir,
                config.snapshots.clone(),
                config.lock_retry,
            ),
        }
    }

    pub fn with_dispatcher(dispatcher: Dispatcher, snapshots: SnapshotLoader) -> Self {
        Pipeline {
            dispatcher,
            snapshots,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Decode one record and apply it.
    ///
    /// A record that fails to decode is logged and skipped. Returns the
    /// published state of every slice that changed.
    pub fn ingest(&mut self, record: &RawRecord) -> Vec<SliceState> {
        match Event::from_record(record) {
            Ok(event) => self.apply(&event),
            Err(e) => {
                warn!(
                    "skipping record at {}:{}: {e}",
                    record.source.display(),
                    record.offset
                );
                Vec::new()
            }
        }
    }

    /// Apply one decoded event.
    ///
    /// A ship cargo event without its listing is completed from the cargo
    /// snapshot document.
    pub fn apply(&mut self, event: &Event) -> Vec<SliceState> {
        let mut changed = self.dispatcher.dispatch(event);
        if needs_cargo_file(event) {
            changed.extend(self.fill_from_snapshot(SliceId::Cargo));
        }
        changed
    }

    /// Apply an engine-originated control event.
    pub fn control(&mut self, kind: EventKind, now: DateTime<Utc>) -> Vec<SliceState> {
        self.dispatcher.dispatch(&Event::control(kind, now))
    }

    /// Fill every slice that still lacks data from its snapshot document.
    pub fn bootstrap(&mut self) -> Vec<SliceState> {
        let mut changed = Vec::new();
        for slice in self.dispatcher.slice_ids() {
            if self.dispatcher.needs_bootstrap(slice) {
                changed.extend(self.fill_from_snapshot(slice));
            }
        }
        changed
    }

    fn fill_from_snapshot(&mut self, slice: SliceId) -> Option<SliceState> {
        match self.snapshots.load(slice) {
            Ok(Some(event)) => self.dispatcher.dispatch_to(slice, &event),
            Ok(None) => {
                debug!("no snapshot document for the {slice} slice");
                None
            }
            Err(e) => {
                warn!("ignoring snapshot for the {slice} slice: {e}");
                None
            }
        }
    }

    pub fn states(&self) -> Vec<SliceState> {
        self.dispatcher.states()
    }

    /// Drop all reducer state.
    pub fn reset(&mut self) {
        self.dispatcher.reset_all();
    }
}
