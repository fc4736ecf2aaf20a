use actix_web::{HttpResponse, ResponseError, http::StatusCode};

use crate::api::api_objects::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    #[error("No data received")]
    EmptyPayload,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Missing field: '{0}'")]
    MissingField(&'static str),

    #[error("Invalid field: '{field}' ({detail})")]
    InvalidField { field: &'static str, detail: String },

    #[error("Invalid bounds for '{field}': max ({max}) must be greater than min ({min})")]
    InvalidBounds { field: &'static str, min: f64, max: f64 },

    /// The inference backend never came up. Carries the load failure reason.
    #[error("Model not loaded: {0}")]
    ModelUnavailable(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

impl AdvisorError {
    /// Name of the offending input field for validation failures.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            AdvisorError::MissingField(field) => Some(*field),
            AdvisorError::InvalidField { field, .. } => Some(*field),
            AdvisorError::InvalidBounds { field, .. } => Some(*field),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AdvisorError::EmptyPayload
                | AdvisorError::InvalidPayload(_)
                | AdvisorError::MissingField(_)
                | AdvisorError::InvalidField { .. }
        )
    }

    /// Message sent back to HTTP callers. Load failure details stay in the
    /// logs and on `/status`.
    pub fn public_message(&self) -> String {
        match self {
            AdvisorError::ModelUnavailable(_) => "Model not loaded".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for AdvisorError {
    fn status_code(&self) -> StatusCode {
        if self.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.public_message()))
    }
}
