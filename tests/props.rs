mod common;

use common::{cargo, event, loadout};
use journalfold::reducers::{
    CargoReducer, CargoStatus, CarrierReducer, MaterialsReducer, MiningReducer,
};
use journalfold::tail::FileTailer;
use journalfold::{
    CargoState, CarrierConfig, Event, FleetCarrierState, MiningConfig, MiningSession, Reducer,
    RetryPolicy, Slice,
};
use proptest::prelude::*;
use serde_json::json;
use std::fs::OpenOptions;
use std::io::Write;
use tempfile::tempdir;

const CARRIER: u64 = 3_700_000_001;

fn arb_material_step() -> impl Strategy<Value = (bool, String, u64)> {
    (
        any::<bool>(),
        prop_oneof![Just("iron".to_string()), Just("nickel".to_string()), Just("$Iron_name;".to_string())],
        0u64..40,
    )
}

fn arb_cargo() -> impl Strategy<Value = Vec<(String, u64)>> {
    proptest::collection::vec(("[a-z]{3,8}", 0u64..500), 0..6)
}

// For any sequence of collect/discard events, every step leaves
// count = max(0, count +/- delta).
proptest! {
    #[test]
    fn prop_material_counts_never_negative(steps in proptest::collection::vec(arb_material_step(), 0..60)) {
        let mut state = MaterialsReducer
            .reduce(Default::default(), &event("Materials", json!({"Raw": [{"Name": "iron", "Count": 5}]})))
            .unwrap();
        let mut model: std::collections::HashMap<&'static str, i64> =
            [("iron", 5), ("nickel", 0)].into_iter().collect();

        for (collect, name, count) in steps {
            let tag = if collect { "MaterialCollected" } else { "MaterialDiscarded" };
            state = MaterialsReducer
                .reduce(state, &event(tag, json!({"Category": "Raw", "Name": name, "Count": count})))
                .unwrap();

            let key = if name.contains("nickel") { "nickel" } else { "iron" };
            let expected = model[key] + if collect { count as i64 } else { -(count as i64) };
            model.insert(key, expected.max(0));
            prop_assert_eq!(state.count(key) as i64, model[key]);
        }
    }
}

// A full cargo event applied twice is a change at most once.
proptest! {
    #[test]
    fn prop_cargo_idempotent(items in arb_cargo()) {
        let items: Vec<(&str, u64)> = items.iter().map(|(n, c)| (n.as_str(), *c)).collect();
        let full = event("Cargo", cargo(&items));
        let mut slice = Slice::new(CargoReducer);

        slice.apply(&full).unwrap();
        prop_assert!(!slice.apply(&full).unwrap());
        prop_assert_eq!(slice.state().status, CargoStatus::Known);
    }
}

// Cargo survives a loadout for the same ship and is cleared for another.
proptest! {
    #[test]
    fn prop_cargo_cleared_only_on_ship_change(
        items in arb_cargo(),
        first in 1u64..5,
        second in 1u64..5,
    ) {
        let items: Vec<(&str, u64)> = items.iter().map(|(n, c)| (n.as_str(), *c)).collect();
        let events = [
            event("Loadout", loadout(first, 64)),
            event("Cargo", cargo(&items)),
            event("Loadout", loadout(second, 64)),
        ];
        let state: CargoState = events
            .iter()
            .fold(Default::default(), |s, e| CargoReducer.reduce(s, e).unwrap());

        if first == second {
            prop_assert_eq!(state.status, CargoStatus::Known);
            prop_assert_eq!(state.items.len(), items.len());
        } else {
            prop_assert_eq!(state.status, CargoStatus::AwaitingRefresh);
            prop_assert!(state.items.is_empty());
            prop_assert_eq!(state.count, 0);
        }
    }
}

// Prospector bounds depend on the set of observations, not their order.
proptest! {
    #[test]
    fn prop_mining_bounds_order_independent(
        proportions in proptest::collection::vec(0u32..1000, 1..12).prop_shuffle(),
    ) {
        let reducer = MiningReducer::new(MiningConfig {
            auto_start: true,
            max_prospector_results: 100,
        });
        let events: Vec<Event> = proportions
            .iter()
            .enumerate()
            .map(|(i, p)| {
                event(
                    "ProspectedAsteroid",
                    json!({
                        "Materials": [{"Name": "Platinum", "Proportion": f64::from(*p) / 1000.0}],
                        "Content": "$AsteroidMaterialContent_Low;",
                        "Remaining": i as f64
                    }),
                )
            })
            .collect();
        let session: MiningSession = events
            .iter()
            .fold(Default::default(), |s, e| reducer.reduce(s, e).unwrap());

        let lo = f64::from(*proportions.iter().min().unwrap()) / 1000.0;
        let hi = f64::from(*proportions.iter().max().unwrap()) / 1000.0;
        let platinum = session.material("platinum").unwrap();
        prop_assert_eq!(platinum.min_proportion, Some(lo));
        prop_assert_eq!(platinum.max_proportion, Some(hi));
    }
}

#[test]
fn test_mining_bounds_documented_case() {
    let reducer = MiningReducer::new(MiningConfig::default());
    for order in [[0.3, 0.5, 0.2], [0.2, 0.3, 0.5], [0.5, 0.2, 0.3]] {
        let session: MiningSession = order.iter().enumerate().fold(Default::default(), |s, (i, p)| {
            reducer
                .reduce(
                    s,
                    &event(
                        "ProspectedAsteroid",
                        json!({"Materials": [{"Name": "Gold", "Proportion": p}], "Remaining": i as f64}),
                    ),
                )
                .unwrap()
        });
        let gold = session.material("gold").unwrap();
        assert_eq!((gold.min_proportion, gold.max_proportion), (Some(0.2), Some(0.5)));
    }
}

// A carrier commodity stays listed exactly while any of stock, outstanding
// purchase orders, or sale price is nonzero.
proptest! {
    #[test]
    fn prop_carrier_prunes_only_empty_entries(
        stock in 0u64..3,
        quantity in 0u64..3,
        price in 0u64..3,
        sale in any::<bool>(),
    ) {
        let reducer = CarrierReducer::new(CarrierConfig::default());
        let mut events = vec![
            event("CarrierStats", json!({"CarrierID": CARRIER, "Callsign": "ABC-123"})),
            event("Docked", json!({"MarketID": CARRIER, "StationName": "ABC-123"})),
            event(
                "CargoTransfer",
                json!({"Transfers": [{"Type": "tritium", "Count": stock, "Direction": "tocarrier"}]}),
            ),
        ];
        let order = if sale {
            json!({"CarrierID": CARRIER, "Commodity": "tritium", "BlackMarket": false, "SaleOrder": quantity, "Price": price})
        } else {
            json!({"CarrierID": CARRIER, "Commodity": "tritium", "BlackMarket": false, "PurchaseOrder": quantity, "Price": price})
        };
        events.push(event("CarrierTradeOrder", order));

        let state: FleetCarrierState = events
            .iter()
            .fold(Default::default(), |s, e| reducer.reduce(s, e).unwrap());

        let listed = state.commodity("tritium", false).is_some();
        let expected = if sale {
            stock > 0 || price > 0
        } else {
            stock > 0 || quantity > 0
        };
        prop_assert_eq!(listed, expected);
    }
}

// However appends are split across polls, every complete non-blank line is
// delivered exactly once and in order, and blank lines never cause a replay.
proptest! {
    #[test]
    fn prop_tailer_delivers_each_line_once(
        lines in proptest::collection::vec("[a-z0-9]{0,12}", 1..20),
        cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("j.log");
        let text: String = lines.iter().map(|l| format!("{l}\n")).collect();
        let bytes = text.as_bytes();

        let mut points: Vec<usize> = cuts.iter().map(|i| i.index(bytes.len())).collect();
        points.push(bytes.len());
        points.sort_unstable();

        let mut tailer = FileTailer::new(&path, RetryPolicy::default());
        let mut seen = Vec::new();
        let mut written = 0;
        for point in points {
            let mut file = OpenOptions::new().create(true).append(true).open(&path).unwrap();
            file.write_all(&bytes[written..point]).unwrap();
            drop(file);
            written = point;
            seen.extend(tailer.poll().unwrap().into_iter().map(|r| r.line));
        }
        seen.extend(tailer.poll().unwrap().into_iter().map(|r| r.line));

        let expected: Vec<String> = lines.into_iter().filter(|l| !l.is_empty()).collect();
        prop_assert_eq!(seen, expected);
    }
}
