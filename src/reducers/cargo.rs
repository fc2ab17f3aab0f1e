//! Cargo hold contents.
//!
//! The game only ever reports the whole hold, so every accepted cargo event
//! replaces the inventory wholesale. A cargo event without an inventory is
//! ignored here; the pipeline resolves it through the `Cargo.json` snapshot.
//!
//! The reducer also follows `Loadout` events to notice when the commander
//! switches ships: the old hold no longer applies, so it is cleared and
//! marked as waiting for the next full cargo event. A loadout refresh for the
//! same ship leaves the hold alone.

use super::{Reducer, SliceId, SliceState};
use crate::error::ReduceError;
use crate::event::{Event, EventKind, flag, normalize_name};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CargoStatus {
    /// No full cargo event seen yet.
    #[default]
    Unknown,
    Known,
    /// The ship changed; the previous hold was discarded.
    AwaitingRefresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoItem {
    /// Normalized commodity name.
    pub name: String,
    pub count: u64,
    pub localized: Option<String>,
    pub stolen: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoState {
    pub status: CargoStatus,
    /// Items in the order the game listed them.
    pub items: Vec<CargoItem>,
    /// Authoritative total reported by the game.
    pub count: u64,
    /// Ship the hold belongs to, as last seen in a loadout.
    pub ship_id: Option<u64>,
}

impl CargoState {
    pub fn item(&self, name: &str) -> Option<&CargoItem> {
        let key = normalize_name(name);
        self.items.iter().find(|i| i.name == key)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CargoPayload {
    #[serde(default)]
    vessel: Option<String>,
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    inventory: Option<Vec<InventoryLine>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InventoryLine {
    name: String,
    #[serde(rename = "Name_Localised", default)]
    name_localised: Option<String>,
    count: u64,
    #[serde(default, deserialize_with = "flag")]
    stolen: bool,
}

#[derive(Deserialize)]
struct ShipIdentity {
    #[serde(rename = "ShipID")]
    ship_id: u64,
}

/// Whether a cargo event describes the ship's hold but leaves the listing in
/// `Cargo.json`.
pub fn needs_cargo_file(event: &Event) -> bool {
    event.kind == EventKind::Cargo
        && event.str_field("Vessel").is_none_or(|v| v == "Ship")
        && event.data.get("Inventory").is_none()
}

pub struct CargoReducer;

impl CargoReducer {
    fn on_cargo(mut state: CargoState, event: &Event) -> Result<CargoState, ReduceError> {
        let payload: CargoPayload = event.payload()?;
        if payload.vessel.as_deref().is_some_and(|v| v != "Ship") {
            return Ok(state);
        }
        let Some(inventory) = payload.inventory else {
            return Ok(state);
        };

        let items: Vec<CargoItem> = inventory
            .into_iter()
            .map(|line| CargoItem {
                name: normalize_name(&line.name),
                count: line.count,
                localized: line.name_localised,
                stolen: line.stolen,
            })
            .collect();
        let count = payload
            .count
            .unwrap_or_else(|| items.iter().map(|i| i.count).sum());

        state.items = items;
        state.count = count;
        state.status = CargoStatus::Known;
        Ok(state)
    }

    fn on_loadout(mut state: CargoState, event: &Event) -> Result<CargoState, ReduceError> {
        let ShipIdentity { ship_id } = event.payload()?;
        match state.ship_id {
            Some(previous) if previous != ship_id => {
                state.items.clear();
                state.count = 0;
                state.status = CargoStatus::AwaitingRefresh;
            }
            _ => {}
        }
        state.ship_id = Some(ship_id);
        Ok(state)
    }
}

impl Reducer for CargoReducer {
    type State = CargoState;
    const SLICE: SliceId = SliceId::Cargo;

    fn subscriptions(&self) -> &'static [EventKind] {
        &[EventKind::Loadout, EventKind::Cargo]
    }

    fn reduce(&self, state: CargoState, event: &Event) -> Result<CargoState, ReduceError> {
        match event.kind {
            EventKind::Cargo => Self::on_cargo(state, event),
            EventKind::Loadout => Self::on_loadout(state, event),
            _ => Ok(state),
        }
    }

    fn publish(state: Arc<CargoState>) -> SliceState {
        SliceState::Cargo(state)
    }

    fn needs_bootstrap(state: &CargoState) -> bool {
        state.status != CargoStatus::Known
    }
}
