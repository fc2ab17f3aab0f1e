use crate::error::{DecodeError, ReduceError};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// One line of text read from a source file.
///
/// Carries the file it came from and the byte offset at which the line
/// starts. Records are short-lived: they are decoded and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub source: PathBuf,
    pub offset: u64,
    pub line: String,
}

macro_rules! event_kinds {
    ($($variant:ident => $tag:literal,)*) => {
        /// Closed set of event discriminators the reducers understand.
        ///
        /// Journal tags outside this set decode to [`EventKind::Unrecognized`].
        /// The mining control kinds are produced by the engine only; no journal
        /// text maps onto them.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[non_exhaustive]
        pub enum EventKind {
            $($variant,)*
            StartMiningSession,
            StopMiningSession,
            ResetMiningSession,
            #[default]
            Unrecognized,
        }

        impl EventKind {
            /// Map a journal `event` tag onto its kind.
            pub fn from_tag(tag: &str) -> Self {
                match tag {
                    $($tag => EventKind::$variant,)*
                    _ => EventKind::Unrecognized,
                }
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $(EventKind::$variant => $tag,)*
                    EventKind::StartMiningSession => "StartMiningSession",
                    EventKind::StopMiningSession => "StopMiningSession",
                    EventKind::ResetMiningSession => "ResetMiningSession",
                    EventKind::Unrecognized => "Unrecognized",
                }
            }
        }
    };
}

event_kinds! {
    // cargo and ship
    Cargo => "Cargo",
    Loadout => "Loadout",
    CargoTransfer => "CargoTransfer",
    // materials
    Materials => "Materials",
    MaterialCollected => "MaterialCollected",
    MaterialDiscarded => "MaterialDiscarded",
    MaterialTrade => "MaterialTrade",
    EngineerCraft => "EngineerCraft",
    Synthesis => "Synthesis",
    TechnologyBroker => "TechnologyBroker",
    MissionCompleted => "MissionCompleted",
    // balance
    LoadGame => "LoadGame",
    Status => "Status",
    MarketBuy => "MarketBuy",
    MarketSell => "MarketSell",
    BuyDrones => "BuyDrones",
    SellDrones => "SellDrones",
    RefuelAll => "RefuelAll",
    Repair => "Repair",
    RepairAll => "RepairAll",
    BuyAmmo => "BuyAmmo",
    RestockVehicle => "RestockVehicle",
    ModuleBuy => "ModuleBuy",
    ModuleSell => "ModuleSell",
    ShipyardBuy => "ShipyardBuy",
    ShipyardSell => "ShipyardSell",
    RedeemVoucher => "RedeemVoucher",
    PayFines => "PayFines",
    PayBounties => "PayBounties",
    SellExplorationData => "SellExplorationData",
    MultiSellExplorationData => "MultiSellExplorationData",
    // location
    Location => "Location",
    FsdJump => "FSDJump",
    CarrierJump => "CarrierJump",
    Docked => "Docked",
    Undocked => "Undocked",
    SupercruiseEntry => "SupercruiseEntry",
    SupercruiseExit => "SupercruiseExit",
    ApproachBody => "ApproachBody",
    LeaveBody => "LeaveBody",
    // mining
    ProspectedAsteroid => "ProspectedAsteroid",
    AsteroidCracked => "AsteroidCracked",
    MiningRefined => "MiningRefined",
    LaunchDrone => "LaunchDrone",
    // fleet carrier
    CarrierStats => "CarrierStats",
    CarrierFinance => "CarrierFinance",
    CarrierBankTransfer => "CarrierBankTransfer",
    CarrierDepositFuel => "CarrierDepositFuel",
    CarrierJumpRequest => "CarrierJumpRequest",
    CarrierJumpCancelled => "CarrierJumpCancelled",
    CarrierLocation => "CarrierLocation",
    CarrierCrewServices => "CarrierCrewServices",
    CarrierTradeOrder => "CarrierTradeOrder",
}

/// A decoded journal event.
///
/// The discriminator is kept twice: as the raw `event_type` string written by
/// the game and as the closed [`EventKind`] used for routing. The payload is
/// intentionally untyped ([`serde_json::Value`]) with the `event` and
/// `timestamp` fields removed; reducers give it meaning through
/// [`Event::payload`].
///
/// # Examples
///
/// ```
/// use journalfold::{Event, EventKind};
///
/// let event = Event::decode(
///     r#"{"timestamp":"2024-05-01T12:00:00Z","event":"LoadGame","Credits":1000}"#,
/// )
/// .unwrap();
/// assert_eq!(event.kind, EventKind::LoadGame);
/// assert_eq!(event.data["Credits"], 1000);
/// assert!(event.timestamp.is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Event {
    pub kind: EventKind,

    /// The journal's `event` field, verbatim.
    pub event_type: String,

    /// When the game wrote the record. `None` if missing or malformed.
    pub timestamp: Option<DateTime<Utc>>,

    /// Every other field of the record, as a JSON object.
    pub data: Value,
}

impl Event {
    /// Create an event from a tag and payload, without a timestamp.
    ///
    /// # Examples
    ///
    /// ```
    /// use journalfold::{Event, EventKind};
    /// use serde_json::json;
    ///
    /// let event = Event::new("AsteroidCracked", json!({"Body": "Ring A"}));
    /// assert_eq!(event.kind, EventKind::AsteroidCracked);
    /// assert_eq!(event.timestamp, None);
    /// ```
    pub fn new(event_type: &str, data: Value) -> Self {
        Event {
            kind: EventKind::from_tag(event_type),
            event_type: event_type.to_string(),
            timestamp: None,
            data,
        }
    }

    /// Build an engine-originated control event with an empty payload.
    pub fn control(kind: EventKind, timestamp: DateTime<Utc>) -> Self {
        Event {
            kind,
            event_type: kind.as_str().to_string(),
            timestamp: Some(timestamp),
            data: Value::Object(Map::new()),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Decode one JSON record.
    ///
    /// Unknown discriminators are not an error; they decode with
    /// [`EventKind::Unrecognized`]. Extra fields are kept in `data`.
    pub fn decode(line: &str) -> Result<Self, DecodeError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(DecodeError::Empty);
        }

        let mut fields = match serde_json::from_str::<Value>(line)? {
            Value::Object(map) => map,
            _ => return Err(DecodeError::NotAnObject),
        };

        let event_type = match fields.remove("event") {
            Some(Value::String(tag)) if !tag.is_empty() => tag,
            _ => return Err(DecodeError::MissingDiscriminator),
        };

        let timestamp = fields
            .remove("timestamp")
            .and_then(|v| v.as_str().and_then(parse_timestamp));

        Ok(Event {
            kind: EventKind::from_tag(&event_type),
            event_type,
            timestamp,
            data: Value::Object(fields),
        })
    }

    /// Decode the line carried by a [`RawRecord`].
    pub fn from_record(record: &RawRecord) -> Result<Self, DecodeError> {
        Self::decode(&record.line)
    }

    /// Deserialize the payload into a typed view of this event.
    ///
    /// A mismatch is reported as a [`ReduceError`], since it means a
    /// well-formed record carried a value the reducer cannot accept.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, ReduceError> {
        T::deserialize(&self.data).map_err(|source| ReduceError::Payload {
            event: self.event_type.clone(),
            source,
        })
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn u64_field(&self, key: &str) -> Option<u64> {
        self.data.get(key).and_then(Value::as_u64)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Normalize a journal item name to a lookup key.
///
/// Localisation symbols (`$painite_name;`) and display-style names
/// (`Painite`) collapse onto the same lowercase key.
///
/// # Examples
///
/// ```
/// use journalfold::normalize_name;
///
/// assert_eq!(normalize_name("$painite_name;"), "painite");
/// assert_eq!(normalize_name("LowTemperatureDiamond"), "lowtemperaturediamond");
/// assert_eq!(normalize_name("  Iron "), "iron");
/// ```
pub fn normalize_name(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let mut name = lower.as_str();
    name = name.strip_prefix('$').unwrap_or(name);
    name = name.strip_suffix(';').unwrap_or(name);
    name = name.strip_suffix("_name").unwrap_or(name);
    name.to_string()
}

/// Deserialize the journal's 0/1 (or boolean) flags as `bool`.
pub(crate) fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|v| v != 0.0)),
        Value::Null => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected a flag, found {other}"
        ))),
    }
}
