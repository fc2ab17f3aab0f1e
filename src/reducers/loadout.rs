use super::{Reducer, SliceId, SliceState};
use crate::error::ReduceError;
use crate::event::{Event, EventKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Module {
    pub slot: String,
    pub item: String,
}

/// The current ship and what is fitted to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipLoadoutState {
    pub ship_type: Option<String>,
    pub ship_id: Option<u64>,
    pub ship_name: Option<String>,
    pub ship_ident: Option<String>,
    pub cargo_capacity: u64,
    pub modules: Vec<Module>,
}

#[derive(Deserialize)]
struct LoadoutPayload {
    #[serde(rename = "Ship")]
    ship: String,
    #[serde(rename = "ShipID")]
    ship_id: u64,
    #[serde(rename = "ShipName", default)]
    ship_name: Option<String>,
    #[serde(rename = "ShipIdent", default)]
    ship_ident: Option<String>,
    #[serde(rename = "CargoCapacity", default)]
    cargo_capacity: u64,
    #[serde(rename = "Modules", default)]
    modules: Vec<Module>,
}

/// Replaces the loadout on every `Loadout` event.
pub struct LoadoutReducer;

impl Reducer for LoadoutReducer {
    type State = ShipLoadoutState;
    const SLICE: SliceId = SliceId::Loadout;

    fn subscriptions(&self) -> &'static [EventKind] {
        &[EventKind::Loadout]
    }

    fn reduce(
        &self,
        state: ShipLoadoutState,
        event: &Event,
    ) -> Result<ShipLoadoutState, ReduceError> {
        if event.kind != EventKind::Loadout {
            return Ok(state);
        }
        let payload: LoadoutPayload = event.payload()?;
        Ok(ShipLoadoutState {
            ship_type: Some(payload.ship.to_lowercase()),
            ship_id: Some(payload.ship_id),
            ship_name: payload.ship_name,
            ship_ident: payload.ship_ident,
            cargo_capacity: payload.cargo_capacity,
            modules: payload.modules,
        })
    }

    fn publish(state: Arc<ShipLoadoutState>) -> SliceState {
        SliceState::Loadout(state)
    }
}
