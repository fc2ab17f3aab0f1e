mod common;

use common::{event, reduce_all};
use journalfold::reducers::MaterialsReducer;
use journalfold::{MaterialCategory, MaterialInventory, Reducer};
use serde_json::json;

fn stocked() -> MaterialInventory {
    reduce_all(
        &MaterialsReducer,
        &[event(
            "Materials",
            json!({
                "Raw": [{"Name": "iron", "Count": 10}, {"Name": "nickel", "Count": 5}],
                "Manufactured": [{"Name": "hybridcapacitors", "Name_Localised": "Hybrid Capacitors", "Count": 3}],
                "Encoded": [{"Name": "shieldcyclerecordings", "Name_Localised": "Distorted Shield Cycle Recordings", "Count": 7}]
            }),
        )],
    )
}

fn apply(state: MaterialInventory, tag: &str, data: serde_json::Value) -> MaterialInventory {
    MaterialsReducer.reduce(state, &event(tag, data)).unwrap()
}

#[test]
fn test_full_inventory_replaces_everything() {
    let state = stocked();
    assert_eq!(state.count("Iron"), 10);
    assert_eq!(state.find("hybridcapacitors"), Some(MaterialCategory::Manufactured));
    assert_eq!(
        state.encoded["shieldcyclerecordings"].localized.as_deref(),
        Some("Distorted Shield Cycle Recordings")
    );

    let state = apply(state, "Materials", json!({"Raw": [{"Name": "carbon", "Count": 1}]}));
    assert_eq!(state.count("iron"), 0);
    assert_eq!(state.count("carbon"), 1);
    assert!(state.manufactured.is_empty());
}

#[test]
fn test_collect_uses_explicit_category() {
    let state = apply(
        stocked(),
        "MaterialCollected",
        json!({"Category": "Raw", "Name": "iron", "Count": 3}),
    );
    assert_eq!(state.count("iron"), 13);

    let state = apply(
        state,
        "MaterialCollected",
        json!({"Category": "$MICRORESOURCE_CATEGORY_Encoded;", "Name": "$bulkscandata_name;", "Name_Localised": "Anomalous Bulk Scan Data", "Count": 2}),
    );
    assert_eq!(state.encoded["bulkscandata"].count, 2, "unseen material starts at the collected count");
    assert_eq!(
        state.encoded["bulkscandata"].localized.as_deref(),
        Some("Anomalous Bulk Scan Data")
    );
}

#[test]
fn test_discard_clamps_at_zero() {
    let state = apply(
        stocked(),
        "MaterialDiscarded",
        json!({"Category": "Raw", "Name": "nickel", "Count": 50}),
    );
    assert_eq!(state.count("nickel"), 0);
}

#[test]
fn test_discarding_absent_material_is_noop() {
    let before = stocked();
    let after = apply(
        before.clone(),
        "MaterialDiscarded",
        json!({"Category": "Raw", "Name": "zinc", "Count": 1}),
    );
    assert_eq!(before, after);
}

#[test]
fn test_unknown_category_is_rejected() {
    let result = MaterialsReducer.reduce(
        stocked(),
        &event(
            "MaterialCollected",
            json!({"Category": "Mystery", "Name": "iron", "Count": 1}),
        ),
    );
    assert!(result.is_err());
}

#[test]
fn test_trade_finds_categories_by_name() {
    let state = apply(
        stocked(),
        "MaterialTrade",
        json!({
            "TraderType": "raw",
            "Paid": {"Material": "iron", "Quantity": 6},
            "Received": {"Material": "nickel", "Quantity": 1}
        }),
    );
    assert_eq!(state.count("iron"), 4);
    assert_eq!(state.count("nickel"), 6);
}

#[test]
fn test_trade_places_unseen_material_in_trader_category() {
    let state = apply(
        stocked(),
        "MaterialTrade",
        json!({
            "TraderType": "encoded",
            "Paid": {"Material": "shieldcyclerecordings", "Quantity": 6},
            "Received": {"Material": "encryptedfiles", "Quantity": 2}
        }),
    );
    assert_eq!(state.count("shieldcyclerecordings"), 1);
    assert_eq!(state.find("encryptedfiles"), Some(MaterialCategory::Encoded));
    assert_eq!(state.count("encryptedfiles"), 2);
}

#[test]
fn test_craft_and_synthesis_consume_ingredients() {
    let state = apply(
        stocked(),
        "EngineerCraft",
        json!({"Ingredients": [{"Name": "iron", "Count": 2}, {"Name": "hybridcapacitors", "Count": 5}]}),
    );
    assert_eq!(state.count("iron"), 8);
    assert_eq!(state.count("hybridcapacitors"), 0);

    let state = apply(
        state,
        "Synthesis",
        json!({"Materials": [{"Name": "nickel", "Count": 1}]}),
    );
    assert_eq!(state.count("nickel"), 4);
}

#[test]
fn test_mission_rewards_add_materials() {
    let state = apply(
        stocked(),
        "MissionCompleted",
        json!({
            "Reward": 100000,
            "MaterialsReward": [{"Name": "iron", "Category": "$MICRORESOURCE_CATEGORY_Raw;", "Count": 4}]
        }),
    );
    assert_eq!(state.count("iron"), 14);
}

#[test]
fn test_category_parse() {
    assert_eq!(MaterialCategory::parse("Raw"), Some(MaterialCategory::Raw));
    assert_eq!(MaterialCategory::parse("manufactured"), Some(MaterialCategory::Manufactured));
    assert_eq!(
        MaterialCategory::parse("$MICRORESOURCE_CATEGORY_Encoded;"),
        Some(MaterialCategory::Encoded)
    );
    assert_eq!(MaterialCategory::parse("data"), None);
}
