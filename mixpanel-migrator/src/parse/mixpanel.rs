use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const DISTINCT_ID: &str = "distinct_id";
pub const TIME: &str = "time";
pub const INSERT_ID: &str = "$insert_id";
pub const MP_LIB: &str = "mp_lib";
pub const LIB: &str = "$lib";
pub const LIB_VERSION: &str = "$lib_version";

// Mixpanel bookkeeping that means nothing once the event lives somewhere else
const DROPPED_PROPERTIES: [&str; 3] = [
    "$mp_api_endpoint",
    "$mp_api_timestamp_ms",
    "mp_processing_time_ms",
];

/// One object of a Mixpanel raw export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub event: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub event: String,
    pub distinct_id: String,
    pub timestamp: DateTime<Utc>,
    pub insert_id: Option<String>,
    pub properties: Map<String, Value>,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    #[error("no distinct_id")]
    MissingDistinctId,
    #[error("distinct_id is not a string")]
    InvalidDistinctId,
    #[error("no time")]
    MissingTime,
    #[error("time is not a valid unix timestamp")]
    InvalidTime,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingDistinctId => "missing_distinct_id",
            SkipReason::InvalidDistinctId => "invalid_distinct_id",
            SkipReason::MissingTime => "missing_time",
            SkipReason::InvalidTime => "invalid_time",
        }
    }
}

/// Pulls the identity fields out of a raw export record and cleans up its properties. Records
/// we can't attribute to a person and a point in time are skipped rather than failed.
pub fn normalize(raw: RawRecord, lib_version: &str) -> Result<NormalizedRecord, SkipReason> {
    let RawRecord {
        event,
        properties: raw_properties,
    } = raw;

    let event = match event.as_str() {
        "Pageview" => "$pageview".to_string(),
        _ => event,
    };

    let mut distinct_id = Err(SkipReason::MissingDistinctId);
    let mut timestamp = Err(SkipReason::MissingTime);
    let mut insert_id = None;

    let mut properties = Map::with_capacity(raw_properties.len() + 1);

    for (key, value) in raw_properties {
        match key.as_str() {
            DISTINCT_ID => distinct_id = parse_distinct_id(value),
            TIME => timestamp = parse_time(&value),
            INSERT_ID => {
                insert_id = match value {
                    Value::String(id) if !id.is_empty() => Some(id),
                    _ => None,
                }
            }
            MP_LIB => {
                let lib = match value {
                    Value::String(lib) => lib,
                    other => other.to_string(),
                };
                properties.insert(LIB.to_string(), Value::String(format!("{lib}-imported")));
            }
            k if DROPPED_PROPERTIES.contains(&k) => {}
            _ => {
                properties.insert(key, value);
            }
        }
    }

    // Replaces the SDK version the event was originally sent with
    properties.insert(LIB_VERSION.to_string(), Value::String(lib_version.to_string()));

    Ok(NormalizedRecord {
        event,
        distinct_id: distinct_id?,
        timestamp: timestamp?,
        insert_id,
        properties,
    })
}

fn parse_distinct_id(value: Value) -> Result<String, SkipReason> {
    match value {
        Value::String(id) if id.is_empty() => Err(SkipReason::MissingDistinctId),
        Value::String(id) => Ok(id),
        Value::Null => Err(SkipReason::MissingDistinctId),
        _ => Err(SkipReason::InvalidDistinctId),
    }
}

// Mixpanel exports `time` as whole seconds, but it's a json number so it may arrive as a float
fn parse_time(value: &Value) -> Result<DateTime<Utc>, SkipReason> {
    let seconds = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .ok_or(SkipReason::InvalidTime)?,
        Value::Null => return Err(SkipReason::MissingTime),
        _ => return Err(SkipReason::InvalidTime),
    };
    if seconds == 0 {
        return Err(SkipReason::InvalidTime);
    }
    DateTime::<Utc>::from_timestamp(seconds, 0).ok_or(SkipReason::InvalidTime)
}
