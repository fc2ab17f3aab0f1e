//! Mining session statistics.
//!
//! A session moves `Idle -> Active -> Finished`. It becomes active on an
//! explicit start, or (with auto-start enabled) on the first prospector or
//! collector launch, prospected asteroid, cracked asteroid, or refined
//! fragment. Only an explicit stop finishes it. A finished session keeps its
//! statistics until an explicit start or reset; auto-start applies to `Idle`
//! only.

use super::{Reducer, SliceId, SliceState};
use crate::config::MiningConfig;
use crate::error::ReduceError;
use crate::event::{Event, EventKind, normalize_name};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MiningPhase {
    #[default]
    Idle,
    Active,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentTier {
    Low,
    Medium,
    High,
}

impl ContentTier {
    /// Parse `$AsteroidMaterialContent_High;` and friends.
    pub fn parse(raw: &str) -> Option<Self> {
        let lower = raw.to_lowercase();
        if lower.contains("high") {
            Some(ContentTier::High)
        } else if lower.contains("medium") {
            Some(ContentTier::Medium)
        } else if lower.contains("low") {
            Some(ContentTier::Low)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentCounts {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
}

/// Running tally for one material or ore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinedMaterial {
    /// Normalized name.
    pub name: String,
    pub localized: Option<String>,
    /// Smallest and largest proportion seen in prospector results.
    pub min_proportion: Option<f64>,
    pub max_proportion: Option<f64>,
    pub times_prospected: u32,
    pub motherlodes: u32,
    pub refined: u32,
    pub collected: u64,
}

impl MinedMaterial {
    fn new(name: String) -> Self {
        MinedMaterial {
            name,
            localized: None,
            min_proportion: None,
            max_proportion: None,
            times_prospected: 0,
            motherlodes: 0,
            refined: 0,
            collected: 0,
        }
    }

    fn observe(&mut self, proportion: f64) {
        self.times_prospected += 1;
        self.min_proportion = Some(self.min_proportion.map_or(proportion, |m| m.min(proportion)));
        self.max_proportion = Some(self.max_proportion.map_or(proportion, |m| m.max(proportion)));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProspectedMaterial {
    /// Normalized name.
    pub name: String,
    pub proportion: f64,
}

/// What one prospector limpet reported about one asteroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProspectorResult {
    pub materials: Vec<ProspectedMaterial>,
    pub content: Option<ContentTier>,
    pub motherlode: Option<String>,
    pub remaining: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MiningSession {
    pub phase: MiningPhase,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub asteroids_prospected: u32,
    pub asteroids_cracked: u32,
    pub prospectors_launched: u32,
    pub collectors_launched: u32,
    pub content: ContentCounts,
    /// Keyed by normalized name.
    pub materials: BTreeMap<String, MinedMaterial>,
    /// Distinct prospector results, newest first.
    pub recent_prospects: Vec<ProspectorResult>,
}

impl MiningSession {
    fn started(at: Option<DateTime<Utc>>) -> Self {
        MiningSession {
            phase: MiningPhase::Active,
            started_at: at,
            ..MiningSession::default()
        }
    }

    pub fn material(&self, name: &str) -> Option<&MinedMaterial> {
        self.materials.get(&normalize_name(name))
    }

    pub fn total_refined(&self) -> u32 {
        self.materials.values().map(|m| m.refined).sum()
    }

    fn material_mut(&mut self, name: &str) -> &mut MinedMaterial {
        let key = normalize_name(name);
        self.materials
            .entry(key.clone())
            .or_insert_with(|| MinedMaterial::new(key))
    }
}

#[derive(Deserialize)]
struct Launch {
    #[serde(rename = "Type")]
    drone: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProspectedLine {
    name: String,
    #[serde(rename = "Name_Localised", default)]
    name_localised: Option<String>,
    proportion: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Prospected {
    #[serde(default)]
    materials: Vec<ProspectedLine>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    motherlode_material: Option<String>,
    #[serde(rename = "MotherlodeMaterial_Localised", default)]
    motherlode_localised: Option<String>,
    #[serde(default)]
    remaining: f64,
}

#[derive(Deserialize)]
struct Refined {
    #[serde(rename = "Type")]
    item: String,
    #[serde(rename = "Type_Localised", default)]
    localised: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Collected {
    name: String,
    #[serde(rename = "Name_Localised", default)]
    name_localised: Option<String>,
    count: u64,
}

pub struct MiningReducer {
    config: MiningConfig,
}

impl MiningReducer {
    pub fn new(config: MiningConfig) -> Self {
        MiningReducer { config }
    }

    /// Whether `event` is evidence that mining has begun.
    fn is_mining_activity(event: &Event) -> bool {
        match event.kind {
            EventKind::ProspectedAsteroid
            | EventKind::AsteroidCracked
            | EventKind::MiningRefined => true,
            EventKind::LaunchDrone => event
                .str_field("Type")
                .is_some_and(|t| t == "Prospector" || t == "Collection"),
            _ => false,
        }
    }

    fn prospected(&self, mut session: MiningSession, event: &Event) -> Result<MiningSession, ReduceError> {
        let report: Prospected = event.payload()?;
        let result = ProspectorResult {
            materials: report
                .materials
                .iter()
                .map(|m| ProspectedMaterial {
                    name: normalize_name(&m.name),
                    proportion: m.proportion,
                })
                .collect(),
            content: report.content.as_deref().and_then(ContentTier::parse),
            motherlode: report.motherlode_material.as_deref().map(normalize_name),
            remaining: report.remaining,
        };

        // two limpets on the same rock report it twice
        if session.recent_prospects.contains(&result) {
            return Ok(session);
        }

        session.asteroids_prospected += 1;
        match result.content {
            Some(ContentTier::Low) => session.content.low += 1,
            Some(ContentTier::Medium) => session.content.medium += 1,
            Some(ContentTier::High) => session.content.high += 1,
            None => {}
        }

        for line in report.materials {
            let material = session.material_mut(&line.name);
            material.observe(line.proportion);
            if line.name_localised.is_some() {
                material.localized = line.name_localised;
            }
        }

        if let Some(name) = &report.motherlode_material {
            let material = session.material_mut(name);
            material.motherlodes += 1;
            if report.motherlode_localised.is_some() {
                material.localized = report.motherlode_localised;
            }
        }

        session.recent_prospects.insert(0, result);
        session
            .recent_prospects
            .truncate(self.config.max_prospector_results);
        Ok(session)
    }

    fn activity(&self, mut session: MiningSession, event: &Event) -> Result<MiningSession, ReduceError> {
        match event.kind {
            EventKind::LaunchDrone => {
                let Launch { drone } = event.payload()?;
                match drone.as_str() {
                    "Prospector" => session.prospectors_launched += 1,
                    "Collection" => session.collectors_launched += 1,
                    _ => {}
                }
            }
            EventKind::ProspectedAsteroid => return self.prospected(session, event),
            EventKind::AsteroidCracked => session.asteroids_cracked += 1,
            EventKind::MiningRefined => {
                let refined: Refined = event.payload()?;
                let material = session.material_mut(&refined.item);
                material.refined += 1;
                if refined.localised.is_some() {
                    material.localized = refined.localised;
                }
            }
            EventKind::MaterialCollected => {
                let collected: Collected = event.payload()?;
                let material = session.material_mut(&collected.name);
                material.collected = material.collected.saturating_add(collected.count);
                if collected.name_localised.is_some() {
                    material.localized = collected.name_localised;
                }
            }
            _ => {}
        }
        Ok(session)
    }
}

impl Reducer for MiningReducer {
    type State = MiningSession;
    const SLICE: SliceId = SliceId::Mining;

    fn subscriptions(&self) -> &'static [EventKind] {
        &[
            EventKind::StartMiningSession,
            EventKind::StopMiningSession,
            EventKind::ResetMiningSession,
            EventKind::LaunchDrone,
            EventKind::ProspectedAsteroid,
            EventKind::AsteroidCracked,
            EventKind::MiningRefined,
            EventKind::MaterialCollected,
        ]
    }

    fn reduce(&self, mut session: MiningSession, event: &Event) -> Result<MiningSession, ReduceError> {
        match event.kind {
            EventKind::StartMiningSession => return Ok(MiningSession::started(event.timestamp)),
            EventKind::ResetMiningSession => return Ok(MiningSession::default()),
            EventKind::StopMiningSession => {
                if session.phase == MiningPhase::Active {
                    session.phase = MiningPhase::Finished;
                    session.finished_at = event.timestamp;
                }
                return Ok(session);
            }
            _ => {}
        }

        match session.phase {
            MiningPhase::Active => {}
            MiningPhase::Idle if self.config.auto_start && Self::is_mining_activity(event) => {
                session = MiningSession::started(event.timestamp);
            }
            _ => return Ok(session),
        }
        self.activity(session, event)
    }

    fn publish(state: Arc<MiningSession>) -> SliceState {
        SliceState::Mining(state)
    }
}
