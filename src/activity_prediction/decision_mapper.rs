use serde::{Deserialize, Serialize};

/// Probabilities strictly above this are reported as idle.
pub const IDLE_THRESHOLD: f64 = 0.7;
/// Probabilities strictly above this (and not idle) are reported as uncertain.
pub const UNCERTAIN_THRESHOLD: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserState {
    #[serde(rename = "Likely Idle")]
    LikelyIdle,
    Uncertain,
    Active,
}

impl UserState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserState::LikelyIdle => "Likely Idle",
            UserState::Uncertain => "Uncertain",
            UserState::Active => "Active",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub idle_probability: f64,
    pub user_state: UserState,
    pub confidence: Confidence,
    pub recommendations: Vec<String>,
    pub estimated_battery_gain_minutes: u32,
}

/// Maps the model's idle probability onto the advice table. Values outside
/// [0, 1] go through the same comparisons unchanged.
pub fn decide(probability: f64) -> Prediction {
    let (user_state, confidence, recommendations, gain) =
        if probability > IDLE_THRESHOLD {
            (
                UserState::LikelyIdle,
                Confidence::High,
                vec![
                    "Reduce screen brightness by 20%",
                    "Switch CPU to power saver mode",
                    "Pause unused background applications",
                ],
                35,
            )
        } else if probability > UNCERTAIN_THRESHOLD {
            (
                UserState::Uncertain,
                Confidence::Medium,
                vec!["Lower screen brightness slightly", "Monitor background applications"],
                15,
            )
        } else {
            (UserState::Active, Confidence::High, vec!["System running optimally"], 0)
        };

    Prediction {
        idle_probability: round_to_hundredths(probability),
        user_state,
        confidence,
        recommendations: recommendations.into_iter().map(String::from).collect(),
        estimated_battery_gain_minutes: gain,
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
