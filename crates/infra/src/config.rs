//! Configuration loading and representation.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration. Environment overrides are applied on top of the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use retailsense_affinity::AffinitySettings;
use retailsense_ai::EngineSettings;
use retailsense_forecast::ForecastSettings;
use retailsense_inventory::InventorySettings;
use retailsense_observability::LogFormat;
use retailsense_segmentation::SegmentationSettings;

pub const ENV_ARTIFACT_DIR: &str = "RETAILSENSE_ARTIFACT_DIR";
pub const ENV_LOG_FORMAT: &str = "RETAILSENSE_LOG_FORMAT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub artifact_dir: PathBuf,
    pub log_format: LogFormat,
    pub forecast: ForecastSettings,
    pub affinity: AffinitySettings,
    pub segmentation: SegmentationSettings,
    pub inventory: InventorySettings,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("./ml_models"),
            log_format: LogFormat::default(),
            forecast: ForecastSettings::default(),
            affinity: AffinitySettings::default(),
            segmentation: SegmentationSettings::default(),
            inventory: InventorySettings::default(),
        }
    }
}

impl AnalyticsConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `RETAILSENSE_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(dir) = lookup(ENV_ARTIFACT_DIR) {
            self.artifact_dir = PathBuf::from(dir);
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            self.log_format = format.parse().map_err(ConfigError::Invalid)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = &self.forecast;
        if !(f.holdout_fraction > 0.0 && f.holdout_fraction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "forecast.holdout_fraction must be in (0, 1), got {}",
                f.holdout_fraction
            )));
        }
        if f.cv_folds < 2 {
            return Err(ConfigError::Invalid("forecast.cv_folds must be at least 2".into()));
        }
        if f.history_window_days <= 0 || f.recent_window_days <= 0 {
            return Err(ConfigError::Invalid("forecast windows must be positive".into()));
        }

        let a = &self.affinity;
        for (name, w) in [("co_purchase_weight", a.co_purchase_weight), ("content_weight", a.content_weight)] {
            if !(0.0..=1.0).contains(&w) {
                return Err(ConfigError::Invalid(format!("affinity.{name} must be in [0, 1], got {w}")));
            }
        }

        if self.segmentation.cluster_count == 0 {
            return Err(ConfigError::Invalid("segmentation.cluster_count must be at least 1".into()));
        }

        let i = &self.inventory;
        if i.order_cost < 0.0 || i.holding_cost_rate < 0.0 || i.purchase_cost_ratio < 0.0 {
            return Err(ConfigError::Invalid("inventory costs must be non-negative".into()));
        }
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            forecast: self.forecast.clone(),
            affinity: self.affinity.clone(),
            segmentation: self.segmentation.clone(),
            inventory: self.inventory.clone(),
        }
    }
}
