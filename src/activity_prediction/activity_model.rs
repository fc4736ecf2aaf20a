use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::{Array3, Axis};
use tracing::{error, info};

use crate::activity_prediction::features_extractor::{KEYBOARD_ACTIVITY_INDEX, MOUSE_ACTIVITY_INDEX};
use crate::activity_prediction::min_max_scaler::MinMaxScaler;
use crate::errors::AdvisorError;
use crate::utils::{ModelBackend, ModelConfig};

/// Probed in order when no model path is configured.
pub const DEFAULT_MODEL_CANDIDATES: [&str; 2] = ["/models/model.onnx", "model/model.onnx"];

/// Sequence classifier: a (1, W, F) window of normalized samples in, the
/// probability that the user is idle out.
pub trait ActivityModel: Send + Sync {
    fn predict_idle_probability(&self, sequence: &Array3<f32>) -> Result<f32, AdvisorError>;
}

/// Fallback backend built on the labeling rule the model was trained
/// against: a step is idle when neither keyboard nor mouse saw any input.
/// The probability is the idle share of the window.
#[derive(Debug, Clone)]
pub struct InputActivityHeuristic {
    keyboard_floor: f32,
    mouse_floor: f32,
}

impl InputActivityHeuristic {
    pub fn new(scaler: &MinMaxScaler) -> Self {
        InputActivityHeuristic {
            keyboard_floor: scaler.transform_value(KEYBOARD_ACTIVITY_INDEX, 0.0),
            mouse_floor: scaler.transform_value(MOUSE_ACTIVITY_INDEX, 0.0),
        }
    }
}

impl ActivityModel for InputActivityHeuristic {
    fn predict_idle_probability(&self, sequence: &Array3<f32>) -> Result<f32, AdvisorError> {
        let (batch, window, features) = sequence.dim();
        if batch == 0 || window == 0 || features <= MOUSE_ACTIVITY_INDEX {
            return Err(AdvisorError::Inference(format!(
                "unexpected input shape {:?}",
                sequence.shape()
            )));
        }
        let steps = sequence.index_axis(Axis(0), 0);
        let idle_steps = steps
            .rows()
            .into_iter()
            .filter(|step| {
                step[KEYBOARD_ACTIVITY_INDEX] <= self.keyboard_floor
                    && step[MOUSE_ACTIVITY_INDEX] <= self.mouse_floor
            })
            .count();
        Ok(idle_steps as f32 / steps.nrows() as f32)
    }
}

#[cfg(feature = "onnx")]
pub use onnx::OnnxActivityModel;

#[cfg(feature = "onnx")]
mod onnx {
    use std::path::Path;
    use std::sync::Mutex;

    use anyhow::Result;
    use ndarray::{Array3, ArrayD};
    use ort::{inputs, session::Session, value::Value};

    use super::ActivityModel;
    use crate::errors::AdvisorError;

    /// ONNX export of the trained sequence classifier.
    pub struct OnnxActivityModel {
        session: Mutex<Session>,
    }

    impl OnnxActivityModel {
        pub fn load(model_path: &Path) -> Result<Self> {
            let session = Session::builder()
                .map_err(|e| anyhow::anyhow!("Failed to create session builder: {:?}", e))?
                .commit_from_file(model_path)
                .map_err(|e| anyhow::anyhow!("Failed to load model from {}: {:?}", model_path.display(), e))?;
            Ok(OnnxActivityModel {
                session: Mutex::new(session),
            })
        }
    }

    impl ActivityModel for OnnxActivityModel {
        fn predict_idle_probability(&self, sequence: &Array3<f32>) -> Result<f32, AdvisorError> {
            let input_array_dyn: ArrayD<f32> = sequence.clone().into_dyn();
            let input_value = Value::from_array(input_array_dyn)
                .map_err(|e| AdvisorError::Inference(format!("failed to create input value: {:?}", e)))?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| AdvisorError::Inference("model session lock poisoned".to_string()))?;

            // Owned names so the session can be borrowed mutably by `run`
            let input_name = session.inputs[0].name.clone();
            let output_name = session.outputs[0].name.clone();

            let outputs = session
                .run(inputs![input_name.as_str() => input_value])
                .map_err(|e| AdvisorError::Inference(format!("failed to run inference: {:?}", e)))?;

            // Output is (1, 1); the first element is the idle probability
            let (_shape, data) = outputs[output_name.as_str()]
                .try_extract_tensor::<f32>()
                .map_err(|e| AdvisorError::Inference(format!("failed to extract output tensor: {:?}", e)))?;
            data.first()
                .copied()
                .ok_or_else(|| AdvisorError::Inference("model returned an empty output".to_string()))
        }
    }
}

/// Outcome of loading the inference backend at startup. A failed load is
/// kept around so callers can be told why.
#[derive(Clone)]
pub struct ModelHandle {
    model: Result<Arc<dyn ActivityModel>, String>,
    path: Option<PathBuf>,
}

impl ModelHandle {
    pub fn loaded(model: Arc<dyn ActivityModel>, path: Option<PathBuf>) -> Self {
        ModelHandle {
            model: Ok(model),
            path,
        }
    }

    pub fn unavailable(reason: impl Into<String>, path: Option<PathBuf>) -> Self {
        ModelHandle {
            model: Err(reason.into()),
            path,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_ok()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.model.as_ref().err().map(String::as_str)
    }

    pub fn available(&self) -> Result<Arc<dyn ActivityModel>, AdvisorError> {
        self.model
            .as_ref()
            .map(Arc::clone)
            .map_err(|reason| AdvisorError::ModelUnavailable(reason.clone()))
    }
}

/// Explicit path if given, else the first default candidate that exists.
pub fn resolve_model_path(explicit: Option<&Path>) -> Result<PathBuf, String> {
    let candidates: Vec<PathBuf> = match explicit {
        Some(path) => vec![path.to_path_buf()],
        None => DEFAULT_MODEL_CANDIDATES.iter().map(PathBuf::from).collect(),
    };
    candidates.iter().find(|p| p.exists()).cloned().ok_or_else(|| {
        let checked: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
        format!("Model file not found. Checked: {}", checked.join(", "))
    })
}

/// Builds the configured backend. Never fails: load errors are captured in
/// the returned handle and the service keeps running without predictions.
pub fn load_model(config: &ModelConfig, scaler: &MinMaxScaler) -> ModelHandle {
    match config.backend {
        ModelBackend::Heuristic => {
            info!("Using input-activity heuristic model");
            ModelHandle::loaded(Arc::new(InputActivityHeuristic::new(scaler)), None)
        }
        ModelBackend::Onnx => {
            let path = match resolve_model_path(config.path.as_deref()) {
                Ok(path) => path,
                Err(reason) => {
                    error!("Model load failed: {}", reason);
                    return ModelHandle::unavailable(reason, None);
                }
            };
            load_onnx(path)
        }
    }
}

#[cfg(feature = "onnx")]
fn load_onnx(path: PathBuf) -> ModelHandle {
    match OnnxActivityModel::load(&path) {
        Ok(model) => {
            info!("Loaded ONNX model from {}", path.display());
            ModelHandle::loaded(Arc::new(model), Some(path))
        }
        Err(e) => {
            error!("Model load failed: {:#}", e);
            ModelHandle::unavailable(format!("{:#}", e), Some(path))
        }
    }
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(path: PathBuf) -> ModelHandle {
    let reason = "built without ONNX support (enable the `onnx` feature)";
    error!("Model load failed for {}: {}", path.display(), reason);
    ModelHandle::unavailable(reason, Some(path))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity_prediction::features_extractor::NUM_FEATURES;
    use crate::activity_prediction::min_max_scaler::NormalizationBounds;

    fn scaler() -> MinMaxScaler {
        MinMaxScaler::new(&NormalizationBounds::default()).unwrap()
    }

    #[test]
    fn test_heuristic_counts_idle_steps() {
        let model = InputActivityHeuristic::new(&scaler());
        let mut sequence = Array3::<f32>::zeros((1, 4, NUM_FEATURES));
        sequence[[0, 1, KEYBOARD_ACTIVITY_INDEX]] = 0.02;
        sequence[[0, 3, MOUSE_ACTIVITY_INDEX]] = 0.02;
        assert_eq!(model.predict_idle_probability(&sequence).unwrap(), 0.5);

        let idle = Array3::<f32>::zeros((1, 4, NUM_FEATURES));
        assert_eq!(model.predict_idle_probability(&idle).unwrap(), 1.0);
    }

    #[test]
    fn test_heuristic_rejects_bad_shape() {
        let model = InputActivityHeuristic::new(&scaler());
        let narrow = Array3::<f32>::zeros((1, 4, 2));
        assert!(matches!(
            model.predict_idle_probability(&narrow),
            Err(AdvisorError::Inference(_))
        ));

        let empty_batch = Array3::<f32>::zeros((0, 10, NUM_FEATURES));
        assert!(matches!(
            model.predict_idle_probability(&empty_batch),
            Err(AdvisorError::Inference(_))
        ));

        let empty_window = Array3::<f32>::zeros((1, 0, NUM_FEATURES));
        assert!(matches!(
            model.predict_idle_probability(&empty_window),
            Err(AdvisorError::Inference(_))
        ));
    }

    #[test]
    fn test_missing_model_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelConfig {
            backend: ModelBackend::Onnx,
            path: Some(dir.path().join("model.onnx")),
        };
        let handle = load_model(&config, &scaler());
        assert!(!handle.is_loaded());
        assert!(handle.load_error().unwrap().contains("Model file not found"));
        assert!(matches!(handle.available(), Err(AdvisorError::ModelUnavailable(_))));
    }

    #[test]
    fn test_resolve_prefers_explicit_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(resolve_model_path(Some(file.path())).unwrap(), file.path());
    }

    #[test]
    fn test_heuristic_backend_loads_without_file() {
        let config = ModelConfig {
            backend: ModelBackend::Heuristic,
            path: None,
        };
        let handle = load_model(&config, &scaler());
        assert!(handle.is_loaded());
        assert!(handle.path().is_none());
        assert!(handle.available().is_ok());
    }
}
