//! State reducers, one per slice of derived state.

pub mod balance;
pub mod cargo;
pub mod carrier;
pub mod loadout;
pub mod location;
pub mod materials;
pub mod mining;

use crate::error::ReduceError;
use crate::event::{Event, EventKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub use balance::{BalanceReducer, BalanceState};
pub use cargo::{CargoItem, CargoReducer, CargoState, CargoStatus};
pub use carrier::{
    CarrierCommodity, CarrierReducer, CrewStatus, FleetCarrierState, PendingJump,
};
pub use loadout::{LoadoutReducer, Module, ShipLoadoutState};
pub use location::{LocationReducer, LocationState};
pub use materials::{MaterialCategory, MaterialEntry, MaterialInventory, MaterialsReducer};
pub use mining::{
    ContentCounts, ContentTier, MinedMaterial, MiningPhase, MiningReducer, MiningSession,
    ProspectedMaterial, ProspectorResult,
};

/// Identifies one independently owned slice of derived state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SliceId {
    Cargo,
    Materials,
    Loadout,
    Balance,
    Location,
    Mining,
    Carrier,
}

impl SliceId {
    pub const ALL: [SliceId; 7] = [
        SliceId::Cargo,
        SliceId::Materials,
        SliceId::Loadout,
        SliceId::Balance,
        SliceId::Location,
        SliceId::Mining,
        SliceId::Carrier,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SliceId::Cargo => "cargo",
            SliceId::Materials => "materials",
            SliceId::Loadout => "loadout",
            SliceId::Balance => "balance",
            SliceId::Location => "location",
            SliceId::Mining => "mining",
            SliceId::Carrier => "carrier",
        }
    }
}

impl fmt::Display for SliceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable, published copy of one slice.
///
/// Each variant shares its state through an [`Arc`]; the engine never hands
/// out a handle into state it is still mutating.
#[derive(Debug, Clone, PartialEq)]
pub enum SliceState {
    Cargo(Arc<CargoState>),
    Materials(Arc<MaterialInventory>),
    Loadout(Arc<ShipLoadoutState>),
    Balance(Arc<BalanceState>),
    Location(Arc<LocationState>),
    Mining(Arc<MiningSession>),
    Carrier(Arc<FleetCarrierState>),
}

impl SliceState {
    pub fn slice(&self) -> SliceId {
        match self {
            SliceState::Cargo(_) => SliceId::Cargo,
            SliceState::Materials(_) => SliceId::Materials,
            SliceState::Loadout(_) => SliceId::Loadout,
            SliceState::Balance(_) => SliceId::Balance,
            SliceState::Location(_) => SliceId::Location,
            SliceState::Mining(_) => SliceId::Mining,
            SliceState::Carrier(_) => SliceId::Carrier,
        }
    }
}

/// Folds events into one slice of state.
///
/// `reduce` receives owned state and returns the next state. It must be pure
/// (no I/O, no clock) so replaying the same history always produces the same
/// result, and it must treat kinds it does not care about as no-ops. An
/// `Err` leaves the slice at its previous state.
///
/// # Examples
///
/// ```
/// use journalfold::{BalanceState, Event, EventKind, ReduceError, Reducer, SliceId, SliceState};
/// use std::sync::Arc;
///
/// struct LoadCounter;
///
/// impl Reducer for LoadCounter {
///     type State = BalanceState;
///     const SLICE: SliceId = SliceId::Balance;
///
///     fn subscriptions(&self) -> &'static [EventKind] {
///         &[EventKind::LoadGame]
///     }
///
///     fn reduce(&self, mut state: BalanceState, _event: &Event) -> Result<BalanceState, ReduceError> {
///         state.credits = Some(state.credits.unwrap_or(0) + 1);
///         Ok(state)
///     }
///
///     fn publish(state: Arc<BalanceState>) -> SliceState {
///         SliceState::Balance(state)
///     }
/// }
/// ```
pub trait Reducer: Send + 'static {
    type State: Clone + PartialEq + Default + fmt::Debug + Send + Sync + 'static;

    /// The slice this reducer owns.
    const SLICE: SliceId;

    /// Event kinds routed to this reducer.
    fn subscriptions(&self) -> &'static [EventKind];

    fn reduce(&self, state: Self::State, event: &Event) -> Result<Self::State, ReduceError>;

    fn publish(state: Arc<Self::State>) -> SliceState;

    /// Whether the state still lacks the data a snapshot document would
    /// provide. Defaults to "still at its initial value".
    fn needs_bootstrap(state: &Self::State) -> bool {
        *state == Self::State::default()
    }
}

/// Clamp `count - delta` at zero.
pub(crate) fn decrement(count: u64, delta: u64) -> u64 {
    count.saturating_sub(delta)
}
