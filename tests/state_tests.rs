mod common;

use common::{event, loadout, reduce_all};
use journalfold::reducers::{BalanceReducer, LoadoutReducer, LocationReducer};
use journalfold::{BalanceState, Reducer};
use serde_json::json;

#[test]
fn test_loadout_replaces_ship() {
    let state = reduce_all(&LoadoutReducer, &[event("Loadout", loadout(7, 64))]);
    assert_eq!(state.ship_type.as_deref(), Some("python"));
    assert_eq!(state.ship_id, Some(7));
    assert_eq!(state.cargo_capacity, 64);
    assert_eq!(state.modules.len(), 1);
    assert_eq!(state.modules[0].item, "int_cargorack_size5_class1");

    let state = LoadoutReducer
        .reduce(state, &event("Loadout", loadout(8, 32)))
        .unwrap();
    assert_eq!(state.ship_id, Some(8));
    assert_eq!(state.cargo_capacity, 32);
}

#[test]
fn test_balance_needs_an_absolute_value_first() {
    let state = reduce_all(
        &BalanceReducer,
        &[event("MarketSell", json!({"TotalSale": 500}))],
    );
    assert_eq!(state.credits, None);
    assert!(BalanceReducer::needs_bootstrap(&state));
}

#[test]
fn test_balance_follows_deltas() {
    let state = reduce_all(
        &BalanceReducer,
        &[
            event("LoadGame", json!({"Credits": 10_000})),
            event("MarketBuy", json!({"TotalCost": 2_500})),
            event("MarketSell", json!({"TotalSale": 1_000})),
            event("RefuelAll", json!({"Cost": 100})),
            event("ModuleBuy", json!({"BuyPrice": 4_000, "SellPrice": 1_000})),
            event("MissionCompleted", json!({"Reward": 5_000, "Donated": 200})),
            event("CarrierBankTransfer", json!({"Withdraw": 300})),
        ],
    );
    assert_eq!(state.credits, Some(10_000 - 2_500 + 1_000 - 100 - 3_000 + 4_800 + 300));
}

#[test]
fn test_balance_clamps_at_zero() {
    let state = reduce_all(
        &BalanceReducer,
        &[
            event("LoadGame", json!({"Credits": 100})),
            event("PayFines", json!({"Amount": 5_000})),
        ],
    );
    assert_eq!(state.credits, Some(0));
}

#[test]
fn test_status_document_sets_balance() {
    let state = BalanceReducer
        .reduce(
            BalanceState { credits: Some(5) },
            &event("Status", json!({"Flags": 16842765, "Balance": 777})),
        )
        .unwrap();
    assert_eq!(state.credits, Some(777));

    let unchanged = BalanceReducer
        .reduce(state, &event("Status", json!({"Flags": 0})))
        .unwrap();
    assert_eq!(unchanged.credits, Some(777), "no Balance field, nothing to apply");

    assert!(
        BalanceReducer
            .reduce(unchanged, &event("Status", json!({"Balance": "rich"})))
            .is_err()
    );
}

#[test]
fn test_location_jump_dock_and_cruise() {
    let state = reduce_all(
        &LocationReducer,
        &[
            event(
                "Location",
                json!({"StarSystem": "Sol", "SystemAddress": 10477373803u64, "Body": "Earth", "Docked": true, "StationName": "Daedalus"}),
            ),
        ],
    );
    assert_eq!(state.star_system.as_deref(), Some("Sol"));
    assert_eq!(state.station.as_deref(), Some("Daedalus"));
    assert!(state.docked);

    let state = reduce_all(
        &LocationReducer,
        &[
            event("Location", json!({"StarSystem": "Sol", "Docked": true, "StationName": "Daedalus"})),
            event("Undocked", json!({"StationName": "Daedalus"})),
            event("SupercruiseEntry", json!({"StarSystem": "Sol"})),
            event("FSDJump", json!({"StarSystem": "Alpha Centauri", "SystemAddress": 1, "Body": "Alpha Centauri A"})),
        ],
    );
    assert_eq!(state.star_system.as_deref(), Some("Alpha Centauri"));
    assert!(state.supercruise);
    assert!(!state.docked);
    assert_eq!(state.station, None);

    let state = reduce_all(
        &LocationReducer,
        &[
            event("FSDJump", json!({"StarSystem": "Achenar"})),
            event("SupercruiseExit", json!({"StarSystem": "Achenar", "Body": "Achenar 3"})),
            event("Docked", json!({"StarSystem": "Achenar", "StationName": "Dawes Hub"})),
        ],
    );
    assert!(!state.supercruise);
    assert_eq!(state.body.as_deref(), Some("Achenar 3"));
    assert_eq!(state.station.as_deref(), Some("Dawes Hub"));
    assert!(state.docked);
}

#[test]
fn test_location_without_system_is_rejected() {
    let result = LocationReducer.reduce(Default::default(), &event("FSDJump", json!({"Body": "x"})));
    assert!(result.is_err());
}

#[test]
fn test_approach_and_leave_body() {
    let state = reduce_all(
        &LocationReducer,
        &[
            event("FSDJump", json!({"StarSystem": "Achenar"})),
            event("ApproachBody", json!({"StarSystem": "Achenar", "Body": "Achenar 4 a"})),
        ],
    );
    assert_eq!(state.body.as_deref(), Some("Achenar 4 a"));

    let state = LocationReducer
        .reduce(state, &event("LeaveBody", json!({"Body": "Achenar 4 a"})))
        .unwrap();
    assert_eq!(state.body, None);
}
