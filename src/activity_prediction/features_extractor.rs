use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::AdvisorError;

pub const NUM_FEATURES: usize = 6;

/// Column order of every feature vector and of the model's input tensor.
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "cpu_usage",
    "memory_usage",
    "screen_brightness",
    "battery_percent",
    "keyboard_activity",
    "mouse_activity",
];

pub const KEYBOARD_ACTIVITY_INDEX: usize = 4;
pub const MOUSE_ACTIVITY_INDEX: usize = 5;

/// One raw measurement sent by a client agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureSample {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub screen_brightness: f64,
    pub battery_percent: f64,
    pub keyboard_activity: i64,
    pub mouse_activity: i64,
}

impl FeatureSample {
    /// Builds a sample from an agent payload. Fields are checked in column
    /// order so the first missing or malformed one is the one reported.
    pub fn from_json(payload: &Value) -> Result<Self, AdvisorError> {
        let fields = match payload {
            Value::Null => return Err(AdvisorError::EmptyPayload),
            Value::Object(map) if map.is_empty() => return Err(AdvisorError::EmptyPayload),
            Value::Object(map) => map,
            other => {
                return Err(AdvisorError::InvalidPayload(format!(
                    "expected a JSON object, got {}",
                    json_type_name(other)
                )));
            }
        };

        Ok(FeatureSample {
            cpu_usage: read_float(fields, "cpu_usage")?,
            memory_usage: read_float(fields, "memory_usage")?,
            screen_brightness: read_float(fields, "screen_brightness")?,
            battery_percent: read_float(fields, "battery_percent")?,
            keyboard_activity: read_int(fields, "keyboard_activity")?,
            mouse_activity: read_int(fields, "mouse_activity")?,
        })
    }

    pub fn to_vec(&self) -> [f64; NUM_FEATURES] {
        [
            self.cpu_usage,
            self.memory_usage,
            self.screen_brightness,
            self.battery_percent,
            self.keyboard_activity as f64,
            self.mouse_activity as f64,
        ]
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn read_float(fields: &Map<String, Value>, field: &'static str) -> Result<f64, AdvisorError> {
    let value = fields.get(field).ok_or(AdvisorError::MissingField(field))?;
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(AdvisorError::InvalidField {
            field,
            detail: format!("expected a finite number, got {}", value),
        }),
    }
}

/// Integral counters. Fractional numbers are truncated toward zero, numeric
/// strings must hold an integer.
fn read_int(fields: &Map<String, Value>, field: &'static str) -> Result<i64, AdvisorError> {
    let value = fields.get(field).ok_or(AdvisorError::MissingField(field))?;
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && f.abs() < i64::MAX as f64).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| AdvisorError::InvalidField {
        field,
        detail: format!("expected an integer, got {}", value),
    })
}
