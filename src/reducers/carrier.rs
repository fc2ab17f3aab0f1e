//! The commander's fleet carrier.
//!
//! Commodities are keyed by `(name, stolen)`: the same commodity can sit in a
//! legal lot and a black-market lot at once. An entry that ends up with no
//! stock, no outstanding purchase order, and no sale price is removed.
//!
//! Any carrier location change clears the pending jump and cooldown.

use super::{Reducer, SliceId, SliceState, decrement};
use crate::config::CarrierConfig;
use crate::error::ReduceError;
use crate::event::{Event, EventKind, flag, normalize_name};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierCommodity {
    /// Normalized name.
    pub name: String,
    pub localized: Option<String>,
    pub stolen: bool,
    pub stock: u64,
    pub purchase_orders: u64,
    pub purchase_price: u64,
    pub sale_price: u64,
}

impl CarrierCommodity {
    fn new(name: String, stolen: bool) -> Self {
        CarrierCommodity {
            name,
            localized: None,
            stolen,
            stock: 0,
            purchase_orders: 0,
            purchase_price: 0,
            sale_price: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.stock == 0 && self.purchase_orders == 0 && self.sale_price == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingJump {
    pub system: String,
    pub body: Option<String>,
    pub departure: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewStatus {
    pub activated: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetCarrierState {
    pub carrier_id: Option<u64>,
    pub callsign: Option<String>,
    pub name: Option<String>,
    pub balance: Option<i64>,
    pub fuel: Option<u64>,
    pub current_system: Option<String>,
    pub pending_jump: Option<PendingJump>,
    /// No jump can be requested before this instant.
    pub cooldown_until: Option<DateTime<Utc>>,
    /// Crew role to status.
    pub crew: BTreeMap<String, CrewStatus>,
    pub commodities: Vec<CarrierCommodity>,
    /// Whether the commander is docked at this carrier.
    pub docked_here: bool,
}

impl FleetCarrierState {
    pub fn commodity(&self, name: &str, stolen: bool) -> Option<&CarrierCommodity> {
        let key = normalize_name(name);
        self.commodities
            .iter()
            .find(|c| c.name == key && c.stolen == stolen)
    }

    /// Apply `update` to the `(name, stolen)` entry, creating it if needed,
    /// and drop it if it ends up empty.
    fn update_commodity(
        &mut self,
        name: &str,
        localized: Option<String>,
        stolen: bool,
        update: impl FnOnce(&mut CarrierCommodity),
    ) {
        let key = normalize_name(name);
        let index = match self
            .commodities
            .iter()
            .position(|c| c.name == key && c.stolen == stolen)
        {
            Some(index) => index,
            None => {
                self.commodities.push(CarrierCommodity::new(key, stolen));
                self.commodities.len() - 1
            }
        };

        let entry = &mut self.commodities[index];
        update(entry);
        if localized.is_some() {
            entry.localized = localized;
        }
        if entry.is_empty() {
            self.commodities.remove(index);
        }
    }

    fn is_own_market(&self, event: &Event) -> bool {
        self.carrier_id.is_some() && event.u64_field("MarketID") == self.carrier_id
    }

    fn arrived(&mut self, system: String) {
        self.current_system = Some(system);
        self.pending_jump = None;
        self.cooldown_until = None;
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Finance {
    carrier_balance: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CrewLine {
    crew_role: String,
    #[serde(default)]
    activated: bool,
    #[serde(default)]
    enabled: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Stats {
    #[serde(rename = "CarrierID")]
    carrier_id: u64,
    #[serde(default)]
    callsign: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    fuel_level: Option<u64>,
    #[serde(default)]
    finance: Option<Finance>,
    #[serde(default)]
    crew: Vec<CrewLine>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JumpRequest {
    system_name: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    departure_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CrewService {
    crew_role: String,
    operation: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TradeOrder {
    commodity: String,
    #[serde(rename = "Commodity_Localised", default)]
    commodity_localised: Option<String>,
    #[serde(default)]
    black_market: bool,
    #[serde(default)]
    purchase_order: Option<u64>,
    #[serde(default)]
    sale_order: Option<u64>,
    #[serde(default)]
    cancel_trade: bool,
    #[serde(default)]
    price: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Transfer {
    #[serde(rename = "Type")]
    commodity: String,
    #[serde(rename = "Type_Localised", default)]
    localised: Option<String>,
    count: u64,
    direction: String,
}

#[derive(Deserialize)]
struct Transfers {
    #[serde(rename = "Transfers", default)]
    transfers: Vec<Transfer>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MarketTrade {
    #[serde(rename = "Type")]
    commodity: String,
    #[serde(rename = "Type_Localised", default)]
    localised: Option<String>,
    count: u64,
    #[serde(default, deserialize_with = "flag")]
    stolen_goods: bool,
}

pub struct CarrierReducer {
    config: CarrierConfig,
}

impl CarrierReducer {
    pub fn new(config: CarrierConfig) -> Self {
        CarrierReducer { config }
    }

    /// Whether a carrier event is about the tracked carrier. The first
    /// carrier event seen establishes which carrier that is.
    fn is_ours(state: &mut FleetCarrierState, event: &Event) -> bool {
        if event
            .str_field("CarrierType")
            .is_some_and(|t| t != "FleetCarrier")
        {
            return false;
        }
        match (event.u64_field("CarrierID"), state.carrier_id) {
            (Some(id), Some(known)) => id == known,
            (Some(id), None) => {
                state.carrier_id = Some(id);
                true
            }
            (None, _) => true,
        }
    }

    fn carrier_event(
        &self,
        mut state: FleetCarrierState,
        event: &Event,
    ) -> Result<FleetCarrierState, ReduceError> {
        if !Self::is_ours(&mut state, event) {
            return Ok(state);
        }

        match event.kind {
            EventKind::CarrierStats => {
                let stats: Stats = event.payload()?;
                state.carrier_id = Some(stats.carrier_id);
                state.callsign = stats.callsign.or(state.callsign);
                state.name = stats.name.or(state.name);
                state.fuel = stats.fuel_level.or(state.fuel);
                if let Some(finance) = stats.finance {
                    state.balance = Some(finance.carrier_balance);
                }
                if !stats.crew.is_empty() {
                    state.crew = stats
                        .crew
                        .into_iter()
                        .map(|c| {
                            (
                                c.crew_role,
                                CrewStatus {
                                    activated: c.activated,
                                    enabled: c.enabled,
                                },
                            )
                        })
                        .collect();
                }
            }
            EventKind::CarrierFinance | EventKind::CarrierBankTransfer => {
                let finance: Finance = event.payload()?;
                state.balance = Some(finance.carrier_balance);
            }
            EventKind::CarrierDepositFuel => {
                let total = event.u64_field("Total").ok_or_else(|| {
                    ReduceError::invalid(&event.event_type, "missing Total")
                })?;
                state.fuel = Some(total);
            }
            EventKind::CarrierJumpRequest => {
                let request: JumpRequest = event.payload()?;
                state.pending_jump = Some(PendingJump {
                    system: request.system_name,
                    body: request.body,
                    departure: request.departure_time,
                });
            }
            EventKind::CarrierJumpCancelled => {
                state.pending_jump = None;
                state.cooldown_until = event.timestamp.and_then(|ts| {
                    TimeDelta::try_seconds(self.config.cancel_cooldown_secs)
                        .and_then(|cooldown| ts.checked_add_signed(cooldown))
                });
            }
            EventKind::CarrierLocation => {
                let system = event.str_field("StarSystem").ok_or_else(|| {
                    ReduceError::invalid(&event.event_type, "missing StarSystem")
                })?;
                state.arrived(system.to_string());
            }
            EventKind::CarrierCrewServices => {
                let service: CrewService = event.payload()?;
                let crew = state.crew.entry(service.crew_role).or_default();
                match service.operation.as_str() {
                    "Activate" => {
                        crew.activated = true;
                        crew.enabled = true;
                    }
                    "Deactivate" => {
                        crew.activated = false;
                        crew.enabled = false;
                    }
                    "Pause" => crew.enabled = false,
                    "Resume" => crew.enabled = true,
                    _ => {}
                }
            }
            EventKind::CarrierTradeOrder => {
                let order: TradeOrder = event.payload()?;
                state.update_commodity(
                    &order.commodity,
                    order.commodity_localised,
                    order.black_market,
                    |c| {
                        if order.cancel_trade {
                            c.purchase_orders = 0;
                            c.purchase_price = 0;
                            c.sale_price = 0;
                        } else if let Some(quantity) = order.purchase_order {
                            c.purchase_orders = quantity;
                            c.purchase_price = order.price;
                            c.sale_price = 0;
                        } else if order.sale_order.is_some() {
                            c.sale_price = order.price;
                            c.purchase_orders = 0;
                            c.purchase_price = 0;
                        }
                    },
                );
            }
            _ => {}
        }
        Ok(state)
    }

    fn commander_event(
        &self,
        mut state: FleetCarrierState,
        event: &Event,
    ) -> Result<FleetCarrierState, ReduceError> {
        match event.kind {
            EventKind::Docked => state.docked_here = state.is_own_market(event),
            EventKind::Undocked => state.docked_here = false,
            EventKind::CarrierJump if state.is_own_market(event) => {
                let system = event.str_field("StarSystem").ok_or_else(|| {
                    ReduceError::invalid(&event.event_type, "missing StarSystem")
                })?;
                state.arrived(system.to_string());
            }
            EventKind::CargoTransfer if state.docked_here => {
                let Transfers { transfers } = event.payload()?;
                for t in transfers {
                    match t.direction.as_str() {
                        "tocarrier" => state.update_commodity(&t.commodity, t.localised, false, |c| {
                            c.stock = c.stock.saturating_add(t.count);
                        }),
                        "toship" => state.update_commodity(&t.commodity, t.localised, false, |c| {
                            c.stock = decrement(c.stock, t.count);
                        }),
                        _ => {}
                    }
                }
            }
            EventKind::MarketBuy if state.is_own_market(event) => {
                let trade: MarketTrade = event.payload()?;
                state.update_commodity(&trade.commodity, trade.localised, trade.stolen_goods, |c| {
                    c.stock = decrement(c.stock, trade.count);
                });
            }
            EventKind::MarketSell if state.is_own_market(event) => {
                let trade: MarketTrade = event.payload()?;
                state.update_commodity(&trade.commodity, trade.localised, trade.stolen_goods, |c| {
                    c.stock = c.stock.saturating_add(trade.count);
                    c.purchase_orders = decrement(c.purchase_orders, trade.count);
                });
            }
            _ => {}
        }
        Ok(state)
    }
}

impl Reducer for CarrierReducer {
    type State = FleetCarrierState;
    const SLICE: SliceId = SliceId::Carrier;

    fn subscriptions(&self) -> &'static [EventKind] {
        &[
            EventKind::CarrierStats,
            EventKind::CarrierFinance,
            EventKind::CarrierBankTransfer,
            EventKind::CarrierDepositFuel,
            EventKind::CarrierJumpRequest,
            EventKind::CarrierJumpCancelled,
            EventKind::CarrierLocation,
            EventKind::CarrierCrewServices,
            EventKind::CarrierTradeOrder,
            EventKind::CarrierJump,
            EventKind::Docked,
            EventKind::Undocked,
            EventKind::CargoTransfer,
            EventKind::MarketBuy,
            EventKind::MarketSell,
        ]
    }

    fn reduce(
        &self,
        state: FleetCarrierState,
        event: &Event,
    ) -> Result<FleetCarrierState, ReduceError> {
        match event.kind {
            EventKind::CarrierJump
            | EventKind::Docked
            | EventKind::Undocked
            | EventKind::CargoTransfer
            | EventKind::MarketBuy
            | EventKind::MarketSell => self.commander_event(state, event),
            _ => self.carrier_event(state, event),
        }
    }

    fn publish(state: Arc<FleetCarrierState>) -> SliceState {
        SliceState::Carrier(state)
    }
}
