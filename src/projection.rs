//! Read-only views computed from published slices.
//!
//! Nothing here is stored or mutated; each projection is rebuilt from the
//! latest slice states whenever it is asked for.

use crate::reducers::{
    CargoStatus, ContentCounts, MiningPhase, MiningSession, ProspectorResult, SliceState,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One-glance summary across every slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub ship_type: Option<String>,
    pub ship_name: Option<String>,
    pub cargo_used: u64,
    /// Zero while the hold is waiting for a refresh after a ship change.
    pub cargo_capacity: u64,
    pub credits: Option<i64>,
    pub star_system: Option<String>,
    pub station: Option<String>,
    pub docked: bool,
    pub carrier_system: Option<String>,
    pub carrier_jump_target: Option<String>,
    pub mining: MiningPhase,
}

impl StatusSnapshot {
    pub fn from_states<'a>(states: impl IntoIterator<Item = &'a SliceState>) -> Self {
        let mut status = StatusSnapshot::default();
        let mut awaiting_cargo = false;

        for state in states {
            match state {
                SliceState::Cargo(cargo) => {
                    status.cargo_used = cargo.count;
                    awaiting_cargo = cargo.status == CargoStatus::AwaitingRefresh;
                }
                SliceState::Loadout(ship) => {
                    status.ship_type = ship.ship_type.clone();
                    status.ship_name = ship.ship_name.clone();
                    status.cargo_capacity = ship.cargo_capacity;
                }
                SliceState::Balance(balance) => status.credits = balance.credits,
                SliceState::Location(location) => {
                    status.star_system = location.star_system.clone();
                    status.station = location.station.clone();
                    status.docked = location.docked;
                }
                SliceState::Carrier(carrier) => {
                    status.carrier_system = carrier.current_system.clone();
                    status.carrier_jump_target =
                        carrier.pending_jump.as_ref().map(|jump| jump.system.clone());
                }
                SliceState::Mining(session) => status.mining = session.phase,
                SliceState::Materials(_) => {}
            }
        }

        if awaiting_cargo {
            status.cargo_capacity = 0;
        }
        status
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayMaterial {
    pub name: String,
    pub localized: Option<String>,
    pub refined: u32,
    pub collected: u64,
    pub min_proportion: Option<f64>,
    pub max_proportion: Option<f64>,
    pub motherlodes: u32,
}

/// What a mining overlay shows for the current session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionOverlayData {
    pub phase: MiningPhase,
    /// Seconds since the session started; frozen once it finishes.
    pub duration_secs: i64,
    pub prospectors_launched: u32,
    pub collectors_launched: u32,
    pub asteroids_prospected: u32,
    pub asteroids_cracked: u32,
    pub content: ContentCounts,
    pub total_refined: u32,
    pub refined_per_hour: f64,
    /// Most refined first, then by name.
    pub materials: Vec<OverlayMaterial>,
    pub last_prospect: Option<ProspectorResult>,
}

impl SessionOverlayData {
    pub fn from_session(session: &MiningSession, now: DateTime<Utc>) -> Self {
        let end = match session.phase {
            MiningPhase::Finished => session.finished_at.unwrap_or(now),
            _ => now,
        };
        let duration_secs = session
            .started_at
            .map_or(0, |start| (end - start).num_seconds().max(0));

        let total_refined = session.total_refined();
        let refined_per_hour = if duration_secs > 0 {
            f64::from(total_refined) * 3600.0 / duration_secs as f64
        } else {
            0.0
        };

        let mut materials: Vec<OverlayMaterial> = session
            .materials
            .values()
            .map(|m| OverlayMaterial {
                name: m.name.clone(),
                localized: m.localized.clone(),
                refined: m.refined,
                collected: m.collected,
                min_proportion: m.min_proportion,
                max_proportion: m.max_proportion,
                motherlodes: m.motherlodes,
            })
            .collect();
        materials.sort_by(|a, b| b.refined.cmp(&a.refined).then_with(|| a.name.cmp(&b.name)));

        SessionOverlayData {
            phase: session.phase,
            duration_secs,
            prospectors_launched: session.prospectors_launched,
            collectors_launched: session.collectors_launched,
            asteroids_prospected: session.asteroids_prospected,
            asteroids_cracked: session.asteroids_cracked,
            content: session.content,
            total_refined,
            refined_per_hour,
            materials,
            last_prospect: session.recent_prospects.first().cloned(),
        }
    }
}
