use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const VENTILATION_ON: &str = "ON";
pub const PREDICTION_POLLUTED: &str = "Polluted";

/// The four metrics the dashboard and the report know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Co2,
    Pm25,
    Temp,
    Hum,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Co2, Metric::Pm25, Metric::Temp, Metric::Hum];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Co2 => "co2",
            Metric::Pm25 => "pm25",
            Metric::Temp => "temp",
            Metric::Hum => "hum",
        }
    }
}

/// Numeric sensor section of a reading document; any metric may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sensors {
    pub co2: Option<f64>,
    pub pm25: Option<f64>,
    pub temp: Option<f64>,
    pub hum: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Actuator states, e.g. `ventilation` in {ON, OFF}.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Actuators {
    pub ventilation: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Classifier output attached to a reading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Analysis {
    pub prediction: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One stored sensor snapshot. Sections missing from the document stay `None`;
/// the accessors below own the missing-field defaulting policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub sensors: Option<Sensors>,
    pub actuators: Option<Actuators>,
    pub analysis: Option<Analysis>,
}

impl Reading {
    /// Value of one metric, if this reading carries it.
    pub fn sensor(&self, metric: Metric) -> Option<f64> {
        let sensors = self.sensors.as_ref()?;
        match metric {
            Metric::Co2 => sensors.co2,
            Metric::Pm25 => sensors.pm25,
            Metric::Temp => sensors.temp,
            Metric::Hum => sensors.hum,
        }
    }

    /// Raw ventilation state string, if the reading reported one.
    pub fn ventilation_state(&self) -> Option<&str> {
        self.actuators.as_ref().and_then(|a| a.ventilation.as_deref())
    }

    /// Whether the ventilation actuator reported ON.
    pub fn ventilation_on(&self) -> bool {
        self.ventilation_state()
            .is_some_and(|state| state == VENTILATION_ON)
    }

    /// The classifier label, if the reading was analyzed.
    pub fn prediction(&self) -> Option<&str> {
        self.analysis.as_ref().and_then(|a| a.prediction.as_deref())
    }

    pub fn is_polluted(&self) -> bool {
        self.prediction() == Some(PREDICTION_POLLUTED)
    }
}

/// Static metadata about a physical sensor/actuator unit. Display-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hardware {
    pub id: i64,
    pub doc: HardwareDoc,
}

/// Fields observed in hardware documents; anything else passes through `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HardwareDoc {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
