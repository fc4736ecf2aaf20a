use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::activity_prediction::activity_model::ModelHandle;
use crate::activity_prediction::decision_mapper::{Prediction, decide};
use crate::activity_prediction::features_extractor::FeatureSample;
use crate::activity_prediction::min_max_scaler::MinMaxScaler;
use crate::activity_prediction::sliding_window::{SlidingWindow, WindowState};
use crate::errors::AdvisorError;

struct SessionState {
    window: SlidingWindow,
    last_prediction: Option<Prediction>,
    last_sample: Option<FeatureSample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub buffer_size: usize,
    pub prediction_updated: bool,
}

/// Serving state shared by all request handlers: the sample window, the
/// most recent prediction and the most recent raw sample.
///
/// Submitting a sample is one critical section under a single async lock:
/// push, then (once the window is full) inference and publication. The
/// model call runs while the lock is held, so a slow model delays later
/// submissions and predictions always land in sample arrival order.
pub struct AdvisorSession {
    scaler: MinMaxScaler,
    model: ModelHandle,
    state: Mutex<SessionState>,
}

impl AdvisorSession {
    pub fn new(window_size: usize, scaler: MinMaxScaler, model: ModelHandle) -> Self {
        AdvisorSession {
            scaler,
            model,
            state: Mutex::new(SessionState {
                window: SlidingWindow::new(window_size),
                last_prediction: None,
                last_sample: None,
            }),
        }
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    /// Validates and ingests one agent payload. Rejected payloads leave the
    /// session untouched. A failed inference keeps the pushed sample and the
    /// previously published prediction.
    pub async fn submit_sample(&self, payload: &Value) -> Result<SubmitReceipt, AdvisorError> {
        let model = self.model.available()?;
        let sample = FeatureSample::from_json(payload).inspect_err(|e| {
            warn!("Rejected sample: {}", e);
        })?;
        let normalized = self.scaler.transform(&sample);

        let mut state = self.state.lock().await;
        let was_ready = state.window.is_ready();
        state.last_sample = Some(sample);
        state.window.push(normalized);
        debug!("Sample buffered: {:?}", state.window.state());

        let Some(sequence) = state.window.to_tensor() else {
            return Ok(SubmitReceipt {
                buffer_size: state.window.len(),
                prediction_updated: false,
            });
        };
        if !was_ready {
            info!("Window full ({} samples), predictions enabled", state.window.capacity());
        }

        let probability = model.predict_idle_probability(&sequence).inspect_err(|e| {
            error!("{}", e);
        })?;
        let prediction = decide(f64::from(probability));
        debug!(
            "Prediction updated: {} (p={})",
            prediction.user_state.as_str(),
            prediction.idle_probability
        );
        state.last_prediction = Some(prediction);

        Ok(SubmitReceipt {
            buffer_size: state.window.len(),
            prediction_updated: true,
        })
    }

    /// Latest prediction, `Ok(None)` while warming up. Fails when the model
    /// never loaded, so callers can tell that apart from warming up.
    pub async fn last_prediction(&self) -> Result<Option<Prediction>, AdvisorError> {
        self.model.available()?;
        Ok(self.state.lock().await.last_prediction.clone())
    }

    pub async fn last_sample(&self) -> Option<FeatureSample> {
        self.state.lock().await.last_sample
    }

    pub async fn window_state(&self) -> WindowState {
        self.state.lock().await.window.state()
    }

    pub async fn buffer_len(&self) -> usize {
        self.state.lock().await.window.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::activity_prediction::activity_model::test_models::{FixedProbability, RecordingModel, ScriptedModel};
    use crate::activity_prediction::activity_model::ActivityModel;
    use crate::activity_prediction::decision_mapper::UserState;
    use crate::activity_prediction::min_max_scaler::NormalizationBounds;

    fn session_with(model: Arc<dyn ActivityModel>, window_size: usize) -> AdvisorSession {
        let scaler = MinMaxScaler::new(&NormalizationBounds::default()).unwrap();
        AdvisorSession::new(window_size, scaler, ModelHandle::loaded(model, None))
    }

    fn payload(cpu: f64) -> Value {
        json!({
            "cpu_usage": cpu,
            "memory_usage": 40.0,
            "screen_brightness": 70.0,
            "battery_percent": 88.0,
            "keyboard_activity": 0,
            "mouse_activity": 0
        })
    }

    #[tokio::test]
    async fn test_warms_up_then_predicts() {
        let session = session_with(Arc::new(FixedProbability(0.85)), 10);

        for i in 0..9 {
            let receipt = session.submit_sample(&payload(i as f64)).await.unwrap();
            assert_eq!(receipt.buffer_size, i + 1);
            assert!(!receipt.prediction_updated);
        }
        assert_eq!(session.window_state().await, WindowState::Filling(9));
        assert!(session.last_prediction().await.unwrap().is_none());

        let receipt = session.submit_sample(&payload(9.0)).await.unwrap();
        assert_eq!(receipt.buffer_size, 10);
        assert!(receipt.prediction_updated);
        assert_eq!(session.window_state().await, WindowState::Ready);

        let prediction = session.last_prediction().await.unwrap().unwrap();
        assert_eq!(prediction.user_state, UserState::LikelyIdle);
        assert_eq!(prediction.estimated_battery_gain_minutes, 35);
        assert_eq!(prediction.idle_probability, 0.85);
    }

    #[tokio::test]
    async fn test_missing_field_leaves_window_unchanged() {
        let session = session_with(Arc::new(FixedProbability(0.1)), 10);
        session.submit_sample(&payload(10.0)).await.unwrap();
        session.submit_sample(&payload(20.0)).await.unwrap();

        let mut bad = payload(30.0);
        bad.as_object_mut().unwrap().remove("battery_percent");
        let err = session.submit_sample(&bad).await.unwrap_err();
        assert_eq!(err.field(), Some("battery_percent"));
        assert_eq!(session.buffer_len().await, 2);
        assert_eq!(session.last_sample().await.unwrap().cpu_usage, 20.0);
    }

    #[tokio::test]
    async fn test_prediction_recomputed_on_every_ready_push() {
        let model = Arc::new(ScriptedModel::new(vec![0.9, 0.5, 0.1]));
        let session = session_with(model.clone(), 2);

        session.submit_sample(&payload(10.0)).await.unwrap();
        session.submit_sample(&payload(20.0)).await.unwrap();
        assert_eq!(
            session.last_prediction().await.unwrap().unwrap().user_state,
            UserState::LikelyIdle
        );
        session.submit_sample(&payload(30.0)).await.unwrap();
        assert_eq!(
            session.last_prediction().await.unwrap().unwrap().user_state,
            UserState::Uncertain
        );
        session.submit_sample(&payload(40.0)).await.unwrap();
        assert_eq!(
            session.last_prediction().await.unwrap().unwrap().user_state,
            UserState::Active
        );

        // Each inference saw the two most recent samples, oldest first
        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2].shape(), &[1, 2, 6]);
        assert_eq!(seen[2][[0, 0, 0]], 0.3);
        assert_eq!(seen[2][[0, 1, 0]], 0.4);
    }

    #[tokio::test]
    async fn test_inference_failure_keeps_previous_prediction() {
        let session = session_with(Arc::new(ScriptedModel::new(vec![0.9])), 1);
        session.submit_sample(&payload(10.0)).await.unwrap();

        let err = session.submit_sample(&payload(20.0)).await.unwrap_err();
        assert!(matches!(err, AdvisorError::Inference(_)));
        assert_eq!(session.last_sample().await.unwrap().cpu_usage, 20.0);
        assert_eq!(
            session.last_prediction().await.unwrap().unwrap().user_state,
            UserState::LikelyIdle
        );
    }

    #[tokio::test]
    async fn test_unavailable_model_rejects_before_buffering() {
        let scaler = MinMaxScaler::new(&NormalizationBounds::default()).unwrap();
        let session = AdvisorSession::new(10, scaler, ModelHandle::unavailable("no file", None));

        let err = session.submit_sample(&payload(10.0)).await.unwrap_err();
        assert!(matches!(err, AdvisorError::ModelUnavailable(_)));
        assert_eq!(session.buffer_len().await, 0);
        assert!(session.last_sample().await.is_none());
        assert!(matches!(
            session.last_prediction().await,
            Err(AdvisorError::ModelUnavailable(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submissions_publish_consistent_windows() {
        let model = Arc::new(RecordingModel::new(0.2));
        let session = Arc::new(session_with(model.clone(), 10));
        let handles: Vec<_> = (0..64)
            .map(|i| {
                let session = session.clone();
                tokio::spawn(async move { session.submit_sample(&payload(i as f64)).await })
            })
            .collect();
        for handle in handles {
            let receipt = handle.await.unwrap().unwrap();
            assert!(receipt.buffer_size <= 10);
        }
        assert_eq!(session.buffer_len().await, 10);
        assert!(session.last_prediction().await.unwrap().is_some());

        // One inference per push once full, each window the previous one
        // shifted by exactly one new sample
        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 64 - 10 + 1);
        for pair in seen.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);
            for step in 0..9 {
                for feature in 0..6 {
                    assert_eq!(current[[0, step, feature]], previous[[0, step + 1, feature]]);
                }
            }
        }
        for window in seen.iter() {
            let mut cpu: Vec<f32> = (0..10).map(|step| window[[0, step, 0]]).collect();
            cpu.sort_by(f32::total_cmp);
            cpu.dedup();
            assert_eq!(cpu.len(), 10, "window holds a duplicated sample");
        }

        let last_sample = session.last_sample().await.unwrap();
        let newest = seen.last().unwrap()[[0, 9, 0]];
        assert_eq!(newest, (last_sample.cpu_usage / 100.0) as f32);
    }
}
