//! Tail game journal files and fold their events into live in-memory state.
//!
//! A background [`Engine`] follows the newest `Journal.*.log` in a directory,
//! decodes each appended line into an [`Event`], routes it through a
//! [`Dispatcher`] to the reducers that own each slice of state, and publishes
//! every changed slice to a single [`Subscriber`].

mod bus;
mod config;
mod dispatch;
mod engine;
mod error;
mod event;
pub mod journal;
mod pipeline;
pub mod projection;
pub mod reducers;
mod scan;
pub mod snapshot;
pub mod tail;

pub use bus::{Notification, Publisher, Subscriber, channel};
pub use config::{CarrierConfig, EngineConfig, MiningConfig, RetryPolicy, SnapshotSource};
pub use dispatch::{Dispatcher, Slice, SliceOps};
pub use engine::Engine;
pub use error::{DecodeError, ReduceError, SnapshotError, TailError};
pub use event::{Event, EventKind, RawRecord, normalize_name};
pub use journal::{JournalSource, latest_journal};
pub use pipeline::Pipeline;
pub use projection::{SessionOverlayData, StatusSnapshot};
pub use reducers::{
    BalanceState, CargoItem, CargoState, CargoStatus, FleetCarrierState, MaterialCategory,
    MaterialInventory, MiningPhase, MiningSession, Reducer, ShipLoadoutState, SliceId,
    SliceState,
};
pub use scan::{InitialScan, ScanPhase, ScanSummary};
pub use snapshot::SnapshotLoader;
pub use tail::{FileTailer, line_hash};
