use crate::errors::Result;
use crate::model::{Actuators, Analysis, Reading, Sensors};
use chrono::SecondsFormat;
use serde::Serialize;
use serde_json::Value;

/// Event name browsers dispatch on for live sensor pushes.
pub const EVENT_SENSOR_UPDATE: &str = "update_sensor_data";

/// Transport-safe form of a stored reading: the store id and timestamp become
/// plain strings, the document sections pass through as-is and absent
/// sections serialize as null.
#[derive(Debug, Serialize)]
pub struct WireReading {
    pub id: String,
    pub timestamp: String,
    pub sensors: Option<Sensors>,
    pub actuators: Option<Actuators>,
    pub analysis: Option<Analysis>,
}

impl From<&Reading> for WireReading {
    fn from(reading: &Reading) -> Self {
        Self {
            id: reading.id.to_string(),
            timestamp: reading
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            sensors: reading.sensors.clone(),
            actuators: reading.actuators.clone(),
            analysis: reading.analysis.clone(),
        }
    }
}

/// JSON for a possibly-missing reading; an empty store serializes to `null`.
pub fn wire_json(reading: Option<&Reading>) -> Result<Value> {
    match reading {
        Some(r) => Ok(serde_json::to_value(WireReading::from(r))?),
        None => Ok(Value::Null),
    }
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    event: &'a str,
    data: Value,
}

/// One serialized real-time frame: `{"event": <name>, "data": <wire reading>}`.
pub fn event_frame(event: &str, reading: &Reading) -> Result<String> {
    let data = wire_json(Some(reading))?;
    Ok(serde_json::to_string(&Envelope { event, data })?)
}
