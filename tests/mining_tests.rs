mod common;

use common::{event_at, reduce_all, ts};
use journalfold::reducers::{ContentTier, MiningReducer};
use journalfold::{Event, EventKind, MiningConfig, MiningPhase, MiningSession, Reducer};
use serde_json::{Value, json};

fn auto() -> MiningReducer {
    MiningReducer::new(MiningConfig::default())
}

fn manual() -> MiningReducer {
    MiningReducer::new(MiningConfig {
        auto_start: false,
        ..MiningConfig::default()
    })
}

fn prospect(materials: &[(&str, f64)], content: &str) -> Value {
    let materials: Vec<Value> = materials
        .iter()
        .map(|(name, proportion)| json!({"Name": name, "Proportion": proportion}))
        .collect();
    json!({
        "Materials": materials,
        "Content": format!("$AsteroidMaterialContent_{content};"),
        "Remaining": 100.0
    })
}

fn launch(kind: &str) -> Value {
    json!({"Type": kind})
}

#[test]
fn test_idle_until_activity() {
    let session = reduce_all(&auto(), &[event_at(0, "LaunchDrone", launch("Hatchbreaker"))]);
    assert_eq!(session.phase, MiningPhase::Idle);

    let session = reduce_all(&auto(), &[event_at(5, "LaunchDrone", launch("Prospector"))]);
    assert_eq!(session.phase, MiningPhase::Active);
    assert_eq!(session.started_at, Some(ts(5)));
    assert_eq!(session.prospectors_launched, 1);
}

#[test]
fn test_auto_start_disabled_ignores_activity() {
    let session = reduce_all(
        &manual(),
        &[
            event_at(0, "LaunchDrone", launch("Prospector")),
            event_at(1, "MiningRefined", json!({"Type": "painite"})),
        ],
    );
    assert_eq!(session, MiningSession::default());
}

#[test]
fn test_explicit_start_and_stop() {
    let reducer = manual();
    let session = reduce_all(
        &reducer,
        &[
            Event::control(EventKind::StartMiningSession, ts(0)),
            event_at(10, "LaunchDrone", launch("Collection")),
            event_at(20, "MiningRefined", json!({"Type": "$painite_name;", "Type_Localised": "Painite"})),
            Event::control(EventKind::StopMiningSession, ts(30)),
            event_at(40, "MiningRefined", json!({"Type": "painite"})),
        ],
    );

    assert_eq!(session.phase, MiningPhase::Finished);
    assert_eq!(session.started_at, Some(ts(0)));
    assert_eq!(session.finished_at, Some(ts(30)));
    assert_eq!(session.collectors_launched, 1);
    assert_eq!(session.material("Painite").unwrap().refined, 1, "nothing counted after stop");
    assert_eq!(session.material("painite").unwrap().localized.as_deref(), Some("Painite"));
}

#[test]
fn test_stop_when_idle_does_nothing() {
    let session = reduce_all(&auto(), &[Event::control(EventKind::StopMiningSession, ts(0))]);
    assert_eq!(session, MiningSession::default());
}

#[test]
fn test_finished_session_is_kept_until_explicit_start() {
    let reducer = auto();
    let finished = reduce_all(
        &reducer,
        &[
            event_at(0, "AsteroidCracked", json!({"Body": "Ring A"})),
            Event::control(EventKind::StopMiningSession, ts(10)),
            event_at(20, "AsteroidCracked", json!({"Body": "Ring A"})),
            event_at(25, "LaunchDrone", launch("Prospector")),
        ],
    );
    assert_eq!(finished.phase, MiningPhase::Finished);
    assert_eq!(finished.started_at, Some(ts(0)));
    assert_eq!(finished.finished_at, Some(ts(10)));
    assert_eq!(finished.asteroids_cracked, 1);
    assert_eq!(finished.prospectors_launched, 0);

    let restarted = [
        Event::control(EventKind::StartMiningSession, ts(30)),
        event_at(40, "AsteroidCracked", json!({"Body": "Ring A"})),
    ]
    .iter()
    .fold(finished, |s, e| reducer.reduce(s, e).unwrap());
    assert_eq!(restarted.phase, MiningPhase::Active);
    assert_eq!(restarted.started_at, Some(ts(30)));
    assert_eq!(restarted.asteroids_cracked, 1);
    assert_eq!(restarted.finished_at, None);
}

#[test]
fn test_reset_discards_session() {
    let session = reduce_all(
        &auto(),
        &[
            event_at(0, "AsteroidCracked", json!({})),
            Event::control(EventKind::ResetMiningSession, ts(1)),
        ],
    );
    assert_eq!(session, MiningSession::default());
}

#[test]
fn test_prospector_bounds_and_content() {
    let session = reduce_all(
        &auto(),
        &[
            event_at(0, "ProspectedAsteroid", prospect(&[("Platinum", 30.0)], "High")),
            event_at(1, "ProspectedAsteroid", prospect(&[("Platinum", 50.0), ("Osmium", 8.0)], "Medium")),
            event_at(2, "ProspectedAsteroid", prospect(&[("Platinum", 20.0)], "Low")),
        ],
    );

    let platinum = session.material("platinum").unwrap();
    assert_eq!(platinum.min_proportion, Some(20.0));
    assert_eq!(platinum.max_proportion, Some(50.0));
    assert_eq!(platinum.times_prospected, 3);
    assert_eq!(session.asteroids_prospected, 3);
    assert_eq!(
        (session.content.low, session.content.medium, session.content.high),
        (1, 1, 1)
    );

    let osmium = session.material("osmium").unwrap();
    assert_eq!((osmium.min_proportion, osmium.max_proportion), (Some(8.0), Some(8.0)));
}

#[test]
fn test_motherlode_is_counted_on_its_material() {
    let session = reduce_all(
        &auto(),
        &[event_at(
            0,
            "ProspectedAsteroid",
            json!({
                "Materials": [{"Name": "Bromellite", "Proportion": 12.0}],
                "MotherlodeMaterial": "$VoidOpal_name;",
                "MotherlodeMaterial_Localised": "Void Opal",
                "Content": "$AsteroidMaterialContent_High;",
                "Remaining": 100.0
            }),
        )],
    );

    let opal = session.material("voidopal").unwrap();
    assert_eq!(opal.motherlodes, 1);
    assert_eq!(opal.localized.as_deref(), Some("Void Opal"));
    assert_eq!(session.recent_prospects[0].motherlode.as_deref(), Some("voidopal"));
    assert_eq!(session.recent_prospects[0].content, Some(ContentTier::High));
}

#[test]
fn test_duplicate_prospect_is_ignored() {
    let data = prospect(&[("Painite", 25.0)], "High");
    let session = reduce_all(
        &auto(),
        &[
            event_at(0, "ProspectedAsteroid", data.clone()),
            event_at(1, "ProspectedAsteroid", data),
        ],
    );

    assert_eq!(session.asteroids_prospected, 1);
    assert_eq!(session.recent_prospects.len(), 1);
    assert_eq!(session.material("painite").unwrap().times_prospected, 1);
}

#[test]
fn test_recent_prospects_are_bounded_newest_first() {
    let reducer = MiningReducer::new(MiningConfig {
        auto_start: true,
        max_prospector_results: 3,
    });
    let events: Vec<Event> = (0..5)
        .map(|i| event_at(i, "ProspectedAsteroid", prospect(&[("Gold", i as f64)], "Low")))
        .collect();
    let session = reduce_all(&reducer, &events);

    assert_eq!(session.asteroids_prospected, 5);
    let newest: Vec<f64> = session
        .recent_prospects
        .iter()
        .map(|p| p.materials[0].proportion)
        .collect();
    assert_eq!(newest, vec![4.0, 3.0, 2.0]);
}

#[test]
fn test_collected_materials_are_tallied() {
    let session = reduce_all(
        &auto(),
        &[
            Event::control(EventKind::StartMiningSession, ts(0)),
            event_at(1, "MaterialCollected", json!({"Category": "Raw", "Name": "tellurium", "Count": 2})),
            event_at(2, "MaterialCollected", json!({"Category": "Raw", "Name": "tellurium", "Count": 1})),
        ],
    );
    assert_eq!(session.material("tellurium").unwrap().collected, 3);
}

#[test]
fn test_collected_material_alone_does_not_auto_start() {
    let session = reduce_all(
        &auto(),
        &[event_at(1, "MaterialCollected", json!({"Category": "Raw", "Name": "iron", "Count": 2}))],
    );
    assert_eq!(session.phase, MiningPhase::Idle);
}

#[test]
fn test_total_refined() {
    let session = reduce_all(
        &auto(),
        &[
            event_at(0, "MiningRefined", json!({"Type": "painite"})),
            event_at(1, "MiningRefined", json!({"Type": "painite"})),
            event_at(2, "MiningRefined", json!({"Type": "platinum"})),
        ],
    );
    assert_eq!(session.total_refined(), 3);
}
