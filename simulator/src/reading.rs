use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One generated air-quality document, shaped like the readings the
/// dashboard serves. Missing sensor metrics are omitted entirely so the
/// consumer sees genuinely absent fields, not nulls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub sensors: Sensors,
    pub actuators: Actuators,
    pub analysis: Analysis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sensors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub co2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm25: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hum: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actuators {
    pub ventilation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub prediction: String,
    pub confidence: f64,
}
