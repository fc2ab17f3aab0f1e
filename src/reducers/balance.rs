use super::{Reducer, SliceId, SliceState};
use crate::error::ReduceError;
use crate::event::{Event, EventKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Commander credit balance.
///
/// `None` until an absolute value (`LoadGame`, or the `Status.json` snapshot)
/// has been seen; deltas before that are ignored since there is nothing to
/// apply them to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceState {
    pub credits: Option<i64>,
}

pub struct BalanceReducer;

fn amount(event: &Event, key: &str) -> i64 {
    event.data.get(key).and_then(Value::as_i64).unwrap_or(0)
}

impl BalanceReducer {
    /// Credit change carried by `event`: positive for income.
    fn delta(event: &Event) -> i64 {
        match event.kind {
            EventKind::MarketBuy | EventKind::BuyDrones => -amount(event, "TotalCost"),
            EventKind::ShipyardBuy => -amount(event, "ShipPrice"),
            EventKind::MarketSell | EventKind::SellDrones => amount(event, "TotalSale"),
            EventKind::RefuelAll
            | EventKind::Repair
            | EventKind::RepairAll
            | EventKind::BuyAmmo
            | EventKind::RestockVehicle => -amount(event, "Cost"),
            EventKind::ModuleBuy => amount(event, "SellPrice") - amount(event, "BuyPrice"),
            EventKind::ModuleSell => amount(event, "SellPrice"),
            EventKind::ShipyardSell => amount(event, "ShipPrice"),
            EventKind::RedeemVoucher => amount(event, "Amount"),
            EventKind::PayFines | EventKind::PayBounties => -amount(event, "Amount"),
            EventKind::MissionCompleted => amount(event, "Reward") - amount(event, "Donated"),
            EventKind::SellExplorationData | EventKind::MultiSellExplorationData => {
                amount(event, "TotalEarnings")
            }
            EventKind::CarrierBankTransfer => {
                amount(event, "Withdraw") - amount(event, "Deposit")
            }
            _ => 0,
        }
    }
}

impl Reducer for BalanceReducer {
    type State = BalanceState;
    const SLICE: SliceId = SliceId::Balance;

    fn subscriptions(&self) -> &'static [EventKind] {
        &[
            EventKind::LoadGame,
            EventKind::Status,
            EventKind::MarketBuy,
            EventKind::MarketSell,
            EventKind::BuyDrones,
            EventKind::SellDrones,
            EventKind::RefuelAll,
            EventKind::Repair,
            EventKind::RepairAll,
            EventKind::BuyAmmo,
            EventKind::RestockVehicle,
            EventKind::ModuleBuy,
            EventKind::ModuleSell,
            EventKind::ShipyardBuy,
            EventKind::ShipyardSell,
            EventKind::RedeemVoucher,
            EventKind::PayFines,
            EventKind::PayBounties,
            EventKind::MissionCompleted,
            EventKind::SellExplorationData,
            EventKind::MultiSellExplorationData,
            EventKind::CarrierBankTransfer,
        ]
    }

    fn reduce(&self, mut state: BalanceState, event: &Event) -> Result<BalanceState, ReduceError> {
        let absolute = match event.kind {
            EventKind::LoadGame => Some("Credits"),
            EventKind::Status => Some("Balance"),
            _ => None,
        };

        if let Some(key) = absolute {
            // Status.json omits the balance outside the cockpit
            if let Some(value) = event.data.get(key) {
                let credits = value.as_i64().ok_or_else(|| {
                    ReduceError::invalid(&event.event_type, format!("{key} is not an integer"))
                })?;
                state.credits = Some(credits.max(0));
            }
            return Ok(state);
        }

        if let Some(credits) = state.credits {
            state.credits = Some(credits.saturating_add(Self::delta(event)).max(0));
        }
        Ok(state)
    }

    fn publish(state: Arc<BalanceState>) -> SliceState {
        SliceState::Balance(state)
    }
}
