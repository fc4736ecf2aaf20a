use serde::{Deserialize, Serialize};

use crate::activity_prediction::features_extractor::{FEATURE_NAMES, FeatureSample, NUM_FEATURES};
use crate::errors::AdvisorError;

/// One normalized sample, columns in `FEATURE_NAMES` order.
pub type NormalizedVector = [f32; NUM_FEATURES];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureBounds {
    pub min: f64,
    pub max: f64,
}

impl FeatureBounds {
    pub const fn new(min: f64, max: f64) -> Self {
        FeatureBounds { min, max }
    }
}

/// Per-field reference ranges. Fixed at startup, never fit on live traffic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizationBounds {
    pub cpu_usage: FeatureBounds,
    pub memory_usage: FeatureBounds,
    pub screen_brightness: FeatureBounds,
    pub battery_percent: FeatureBounds,
    pub keyboard_activity: FeatureBounds,
    pub mouse_activity: FeatureBounds,
}

impl Default for NormalizationBounds {
    // Same reference fit the model was served with: 0..100 for the
    // continuous readings, 0..50 for input event counts.
    fn default() -> Self {
        NormalizationBounds {
            cpu_usage: FeatureBounds::new(0.0, 100.0),
            memory_usage: FeatureBounds::new(0.0, 100.0),
            screen_brightness: FeatureBounds::new(0.0, 100.0),
            battery_percent: FeatureBounds::new(0.0, 100.0),
            keyboard_activity: FeatureBounds::new(0.0, 50.0),
            mouse_activity: FeatureBounds::new(0.0, 50.0),
        }
    }
}

impl NormalizationBounds {
    pub fn to_array(&self) -> [FeatureBounds; NUM_FEATURES] {
        [
            self.cpu_usage,
            self.memory_usage,
            self.screen_brightness,
            self.battery_percent,
            self.keyboard_activity,
            self.mouse_activity,
        ]
    }

    /// Every field needs `max > min`; NaN bounds fail too.
    pub fn validate(&self) -> Result<(), AdvisorError> {
        for (field, bounds) in FEATURE_NAMES.into_iter().zip(self.to_array()) {
            if !(bounds.max > bounds.min) || !bounds.min.is_finite() || !bounds.max.is_finite() {
                return Err(AdvisorError::InvalidBounds {
                    field,
                    min: bounds.min,
                    max: bounds.max,
                });
            }
        }
        Ok(())
    }
}

/// Equivalent to sklearn's MinMaxScaler fitted on two reference rows.
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    min: [f64; NUM_FEATURES],
    range: [f64; NUM_FEATURES],
}

impl MinMaxScaler {
    pub fn new(bounds: &NormalizationBounds) -> Result<Self, AdvisorError> {
        bounds.validate()?;
        let bounds = bounds.to_array();
        Ok(MinMaxScaler {
            min: bounds.map(|b| b.min),
            range: bounds.map(|b| b.max - b.min),
        })
    }

    /// Out-of-range readings map outside [0, 1]. The model was trained on
    /// unclamped values so none is applied here.
    pub fn transform(&self, sample: &FeatureSample) -> NormalizedVector {
        let raw = sample.to_vec();
        std::array::from_fn(|column| self.transform_value(column, raw[column]))
    }

    pub fn transform_value(&self, column: usize, value: f64) -> f32 {
        ((value - self.min[column]) / self.range[column]) as f32
    }
}

/// Validates `bounds` then scales `sample`.
pub fn normalize(
    sample: &FeatureSample,
    bounds: &NormalizationBounds,
) -> Result<NormalizedVector, AdvisorError> {
    Ok(MinMaxScaler::new(bounds)?.transform(sample))
}
