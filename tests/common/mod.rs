#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use journalfold::{EngineConfig, Event, Reducer, RetryPolicy};
use serde_json::{Value, json};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const JOURNAL: &str = "Journal.2024-05-01T120000.01.log";

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_714_564_800 + secs, 0)
        .single()
        .unwrap()
}

/// Build an event the way the decoder would, stamped at `ts(0)`.
pub fn event(tag: &str, data: Value) -> Event {
    Event::new(tag, data).with_timestamp(ts(0))
}

pub fn event_at(secs: i64, tag: &str, data: Value) -> Event {
    Event::new(tag, data).with_timestamp(ts(secs))
}

/// One journal line: `data` with `timestamp` and `event` added.
pub fn journal_line(tag: &str, data: Value) -> String {
    let mut fields = match data {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    fields.insert("timestamp".into(), json!("2024-05-01T12:00:00Z"));
    fields.insert("event".into(), json!(tag));
    Value::Object(fields).to_string()
}

pub fn append_lines(path: &Path, lines: &[String]) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
}

pub fn write_journal(dir: &Path, lines: &[String]) -> PathBuf {
    let path = dir.join(JOURNAL);
    append_lines(&path, lines);
    path
}

pub fn write_snapshot(dir: &Path, name: &str, tag: &str, data: Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, journal_line(tag, data)).unwrap();
    path
}

/// Fold `events` through `reducer` from the initial state, panicking on
/// reducer errors.
pub fn reduce_all<R: Reducer>(reducer: &R, events: &[Event]) -> R::State {
    events.iter().fold(R::State::default(), |state, e| {
        reducer.reduce(state, e).unwrap()
    })
}

/// A config that polls quickly and never watches the filesystem.
pub fn fast_config(dir: &Path) -> EngineConfig {
    EngineConfig::new(dir)
        .poll_interval(Duration::from_millis(10))
        .lock_retry(RetryPolicy::new(3, Duration::from_millis(5)))
        .watch_files(false)
}

pub fn loadout(ship_id: u64, capacity: u64) -> Value {
    json!({
        "Ship": "Python",
        "ShipID": ship_id,
        "ShipName": "Rock Hound",
        "ShipIdent": "RH-01",
        "CargoCapacity": capacity,
        "Modules": [
            {"Slot": "Slot01_Size6", "Item": "int_cargorack_size5_class1"}
        ]
    })
}

pub fn cargo(items: &[(&str, u64)]) -> Value {
    let inventory: Vec<Value> = items
        .iter()
        .map(|(name, count)| json!({"Name": name, "Count": count, "Stolen": 0}))
        .collect();
    json!({
        "Vessel": "Ship",
        "Count": items.iter().map(|(_, c)| c).sum::<u64>(),
        "Inventory": inventory
    })
}
