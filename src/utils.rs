use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::{info, warn};

use crate::activity_prediction::min_max_scaler::NormalizationBounds;
use crate::activity_prediction::sliding_window::DEFAULT_WINDOW_SIZE;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
pub const CONFIG_PATH_ENV: &str = "ADVISOR_CONFIG";
pub const MODEL_PATH_ENV: &str = "MODEL_PATH";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    #[default]
    Onnx,
    Heuristic,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub backend: ModelBackend,
    /// Explicit model file. When unset the default locations are probed.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub window_size: usize,
    pub model: ModelConfig,
    pub bounds: NormalizationBounds,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port: 5000,
            window_size: DEFAULT_WINDOW_SIZE,
            model: ModelConfig::default(),
            bounds: NormalizationBounds::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            bail!("window_size must be at least 1");
        }
        self.bounds.validate().context("invalid normalization bounds")?;
        Ok(())
    }

    /// A non-empty `model_path` replaces whatever the file configured.
    pub fn with_model_path_override(mut self, model_path: Option<String>) -> Self {
        if let Some(path) = model_path.filter(|p| !p.trim().is_empty()) {
            self.model.path = Some(PathBuf::from(path));
        }
        self
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    // An empty document means "all defaults".
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(content).context("failed to parse config")?;
    config.validate()?;
    Ok(config)
}

/// Reads the config at `path`. A missing file falls back to defaults, a
/// present but broken one is an error.
pub fn load_config_from(path: &Path) -> Result<Config> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let config = parse_config(&content).with_context(|| format!("in {}", path.display()))?;
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("{} not found, using defaults", path.display());
            Ok(Config::default())
        }
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

/// Loads the process configuration: file from `ADVISOR_CONFIG` (or
/// `config.yaml`), then the `MODEL_PATH` override.
pub fn load_config() -> Result<Config> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config_from(Path::new(&path))?;
    Ok(config.with_model_path_override(std::env::var(MODEL_PATH_ENV).ok()))
}
