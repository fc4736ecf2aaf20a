use serde::{Deserialize, Serialize};

use crate::activity_prediction::activity_model::ModelHandle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub status: String,
    pub buffer_size: usize,
}

impl AnalyzeResponse {
    pub fn received(buffer_size: usize) -> Self {
        AnalyzeResponse {
            status: "received".to_string(),
            buffer_size,
        }
    }
}

/// Returned instead of data until enough samples have arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarmingUpResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WarmingUpResponse {
    pub fn new(message: Option<&str>) -> Self {
        WarmingUpResponse {
            status: "warming_up".to_string(),
            message: message.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatusResponse {
    pub status: String,
    pub model_loaded: bool,
    pub model_path: Option<String>,
    pub model_error: Option<String>,
}

impl From<&ModelHandle> for ServiceStatusResponse {
    fn from(model: &ModelHandle) -> Self {
        ServiceStatusResponse {
            status: "ok".to_string(),
            model_loaded: model.is_loaded(),
            model_path: model.path().map(|p| p.display().to_string()),
            model_error: model.load_error().map(str::to_string),
        }
    }
}
