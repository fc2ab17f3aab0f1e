//! Engineering material inventory.
//!
//! Three independent categories keyed by normalized material name. A full
//! `Materials` event replaces everything; the other events adjust counts in
//! place and never take a count below zero.

use super::{Reducer, SliceId, SliceState, decrement};
use crate::error::ReduceError;
use crate::event::{Event, EventKind, normalize_name};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialCategory {
    Raw,
    Manufactured,
    Encoded,
}

impl MaterialCategory {
    pub const ALL: [MaterialCategory; 3] = [
        MaterialCategory::Raw,
        MaterialCategory::Manufactured,
        MaterialCategory::Encoded,
    ];

    /// Parse the journal's category spellings: `Raw`, `encoded`,
    /// `$MICRORESOURCE_CATEGORY_Manufactured;`, and so on.
    pub fn parse(raw: &str) -> Option<Self> {
        let lower = raw.to_lowercase();
        if lower.contains("encoded") {
            Some(MaterialCategory::Encoded)
        } else if lower.contains("manufactured") {
            Some(MaterialCategory::Manufactured)
        } else if lower.contains("raw") {
            Some(MaterialCategory::Raw)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialEntry {
    /// Name as first reported by the game.
    pub name: String,
    pub localized: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialInventory {
    pub raw: BTreeMap<String, MaterialEntry>,
    pub manufactured: BTreeMap<String, MaterialEntry>,
    pub encoded: BTreeMap<String, MaterialEntry>,
}

impl MaterialInventory {
    pub fn category(&self, category: MaterialCategory) -> &BTreeMap<String, MaterialEntry> {
        match category {
            MaterialCategory::Raw => &self.raw,
            MaterialCategory::Manufactured => &self.manufactured,
            MaterialCategory::Encoded => &self.encoded,
        }
    }

    fn category_mut(&mut self, category: MaterialCategory) -> &mut BTreeMap<String, MaterialEntry> {
        match category {
            MaterialCategory::Raw => &mut self.raw,
            MaterialCategory::Manufactured => &mut self.manufactured,
            MaterialCategory::Encoded => &mut self.encoded,
        }
    }

    /// Which category already holds `name`, if any.
    pub fn find(&self, name: &str) -> Option<MaterialCategory> {
        let key = normalize_name(name);
        MaterialCategory::ALL
            .into_iter()
            .find(|c| self.category(*c).contains_key(&key))
    }

    /// Count of `name` in whichever category holds it; zero if unknown.
    pub fn count(&self, name: &str) -> u64 {
        let key = normalize_name(name);
        self.find(name)
            .and_then(|c| self.category(c).get(&key))
            .map_or(0, |e| e.count)
    }

    fn add(&mut self, category: MaterialCategory, name: &str, localized: Option<String>, count: u64) {
        let entry = self
            .category_mut(category)
            .entry(normalize_name(name))
            .or_insert_with(|| MaterialEntry {
                name: name.to_string(),
                localized: None,
                count: 0,
            });
        entry.count = entry.count.saturating_add(count);
        if localized.is_some() {
            entry.localized = localized;
        }
    }

    fn remove(&mut self, category: MaterialCategory, name: &str, count: u64) {
        if let Some(entry) = self.category_mut(category).get_mut(&normalize_name(name)) {
            entry.count = decrement(entry.count, count);
        }
    }

    /// Remove `count` of `name` from whichever category holds it.
    fn remove_anywhere(&mut self, name: &str, count: u64) {
        if let Some(category) = self.find(name) {
            self.remove(category, name, count);
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MaterialLine {
    name: String,
    #[serde(rename = "Name_Localised", default)]
    name_localised: Option<String>,
    count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FullInventory {
    #[serde(default)]
    raw: Vec<MaterialLine>,
    #[serde(default)]
    manufactured: Vec<MaterialLine>,
    #[serde(default)]
    encoded: Vec<MaterialLine>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CategorizedLine {
    category: String,
    name: String,
    #[serde(rename = "Name_Localised", default)]
    name_localised: Option<String>,
    count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TradeSide {
    material: String,
    #[serde(default)]
    category: Option<String>,
    quantity: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Trade {
    #[serde(default)]
    trader_type: Option<String>,
    paid: TradeSide,
    received: TradeSide,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Consumed {
    name: String,
    count: u64,
}

#[derive(Deserialize)]
struct Ingredients {
    #[serde(rename = "Ingredients", alias = "Materials", default)]
    items: Vec<Consumed>,
}

#[derive(Deserialize)]
struct MissionRewards {
    #[serde(rename = "MaterialsReward", default)]
    rewards: Vec<CategorizedLine>,
}

fn category_of(event: &Event, raw: &str) -> Result<MaterialCategory, ReduceError> {
    MaterialCategory::parse(raw)
        .ok_or_else(|| ReduceError::invalid(&event.event_type, format!("unknown category {raw:?}")))
}

pub struct MaterialsReducer;

impl MaterialsReducer {
    fn replace_all(event: &Event) -> Result<MaterialInventory, ReduceError> {
        let full: FullInventory = event.payload()?;
        let mut inventory = MaterialInventory::default();
        for (category, lines) in [
            (MaterialCategory::Raw, full.raw),
            (MaterialCategory::Manufactured, full.manufactured),
            (MaterialCategory::Encoded, full.encoded),
        ] {
            for line in lines {
                inventory.add(category, &line.name, line.name_localised, line.count);
            }
        }
        Ok(inventory)
    }

    fn trade(mut state: MaterialInventory, event: &Event) -> Result<MaterialInventory, ReduceError> {
        let trade: Trade = event.payload()?;
        let hint = trade.trader_type.as_deref().and_then(MaterialCategory::parse);

        let paid_category = state
            .find(&trade.paid.material)
            .or_else(|| trade.paid.category.as_deref().and_then(MaterialCategory::parse));
        if let Some(category) = paid_category {
            state.remove(category, &trade.paid.material, trade.paid.quantity);
        }

        // A trader only swaps within its own category, so an unseen received
        // material lands there.
        let received_category = state
            .find(&trade.received.material)
            .or_else(|| trade.received.category.as_deref().and_then(MaterialCategory::parse))
            .or(hint)
            .or(paid_category)
            .ok_or_else(|| {
                ReduceError::invalid(
                    &event.event_type,
                    format!("cannot place {:?} in any category", trade.received.material),
                )
            })?;
        state.add(
            received_category,
            &trade.received.material,
            None,
            trade.received.quantity,
        );
        Ok(state)
    }
}

impl Reducer for MaterialsReducer {
    type State = MaterialInventory;
    const SLICE: SliceId = SliceId::Materials;

    fn subscriptions(&self) -> &'static [EventKind] {
        &[
            EventKind::Materials,
            EventKind::MaterialCollected,
            EventKind::MaterialDiscarded,
            EventKind::MaterialTrade,
            EventKind::EngineerCraft,
            EventKind::Synthesis,
            EventKind::TechnologyBroker,
            EventKind::MissionCompleted,
        ]
    }

    fn reduce(
        &self,
        mut state: MaterialInventory,
        event: &Event,
    ) -> Result<MaterialInventory, ReduceError> {
        match event.kind {
            EventKind::Materials => return Self::replace_all(event),
            EventKind::MaterialCollected => {
                let line: CategorizedLine = event.payload()?;
                let category = category_of(event, &line.category)?;
                state.add(category, &line.name, line.name_localised, line.count);
            }
            EventKind::MaterialDiscarded => {
                let line: CategorizedLine = event.payload()?;
                let category = category_of(event, &line.category)?;
                state.remove(category, &line.name, line.count);
            }
            EventKind::MaterialTrade => return Self::trade(state, event),
            EventKind::EngineerCraft | EventKind::Synthesis | EventKind::TechnologyBroker => {
                let used: Ingredients = event.payload()?;
                for item in used.items {
                    state.remove_anywhere(&item.name, item.count);
                }
            }
            EventKind::MissionCompleted => {
                let rewards: MissionRewards = event.payload()?;
                for reward in rewards.rewards {
                    let category = category_of(event, &reward.category)?;
                    state.add(category, &reward.name, reward.name_localised, reward.count);
                }
            }
            _ => {}
        }
        Ok(state)
    }

    fn publish(state: Arc<MaterialInventory>) -> SliceState {
        SliceState::Materials(state)
    }
}
