use super::{Reducer, SliceId, SliceState};
use crate::error::ReduceError;
use crate::event::{Event, EventKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Where the commander is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationState {
    pub star_system: Option<String>,
    pub system_address: Option<u64>,
    pub body: Option<String>,
    pub station: Option<String>,
    pub docked: bool,
    pub supercruise: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Position {
    #[serde(default)]
    star_system: Option<String>,
    #[serde(default)]
    system_address: Option<u64>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    station_name: Option<String>,
    #[serde(default)]
    docked: bool,
}

pub struct LocationReducer;

impl Reducer for LocationReducer {
    type State = LocationState;
    const SLICE: SliceId = SliceId::Location;

    fn subscriptions(&self) -> &'static [EventKind] {
        &[
            EventKind::Location,
            EventKind::FsdJump,
            EventKind::CarrierJump,
            EventKind::Docked,
            EventKind::Undocked,
            EventKind::SupercruiseEntry,
            EventKind::SupercruiseExit,
            EventKind::ApproachBody,
            EventKind::LeaveBody,
        ]
    }

    fn reduce(&self, mut state: LocationState, event: &Event) -> Result<LocationState, ReduceError> {
        match event.kind {
            EventKind::Location | EventKind::FsdJump | EventKind::CarrierJump => {
                let pos: Position = event.payload()?;
                let star_system = pos.star_system.ok_or_else(|| {
                    ReduceError::invalid(&event.event_type, "missing StarSystem")
                })?;
                state.star_system = Some(star_system);
                state.system_address = pos.system_address;
                state.body = pos.body;
                state.docked = pos.docked;
                state.station = if pos.docked { pos.station_name } else { None };
                state.supercruise = event.kind == EventKind::FsdJump;
            }
            EventKind::Docked => {
                let pos: Position = event.payload()?;
                state.docked = true;
                state.supercruise = false;
                state.station = pos.station_name;
                if pos.star_system.is_some() {
                    state.star_system = pos.star_system;
                }
            }
            EventKind::Undocked => {
                state.docked = false;
                state.station = None;
            }
            EventKind::SupercruiseEntry => {
                state.supercruise = true;
                state.docked = false;
                state.station = None;
            }
            EventKind::SupercruiseExit | EventKind::ApproachBody => {
                let pos: Position = event.payload()?;
                if event.kind == EventKind::SupercruiseExit {
                    state.supercruise = false;
                }
                if pos.body.is_some() {
                    state.body = pos.body;
                }
            }
            EventKind::LeaveBody => {
                state.body = None;
            }
            _ => {}
        }
        Ok(state)
    }

    fn publish(state: Arc<LocationState>) -> SliceState {
        SliceState::Location(state)
    }
}
