use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use retailsense_core::{ArtifactId, ModelType};

/// Outcome of one training call as seen by the caller.
///
/// Training failures are reported here rather than raised, so a scheduled
/// retrain can record the failure and move on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub success: bool,
    pub model_type: ModelType,
    pub artifact_id: Option<ArtifactId>,
    pub metrics: JsonValue,
    pub training_sample_size: usize,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl TrainingReport {
    pub fn succeeded(model_type: ModelType, artifact_id: ArtifactId, training_sample_size: usize) -> Self {
        Self {
            success: true,
            model_type,
            artifact_id: Some(artifact_id),
            metrics: JsonValue::Null,
            training_sample_size,
            duration_ms: 0,
            error: None,
        }
    }

    pub fn failed(model_type: ModelType, error: impl Into<String>) -> Self {
        Self {
            success: false,
            model_type,
            artifact_id: None,
            metrics: JsonValue::Null,
            training_sample_size: 0,
            duration_ms: 0,
            error: Some(error.into()),
        }
    }

    pub fn with_metrics(mut self, metrics: JsonValue) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStatus {
    Completed,
    Failed,
}

/// Audit row written for every training attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingLogEntry {
    pub model_type: ModelType,
    pub status: TrainingStatus,
    pub records_processed: usize,
    pub duration_ms: u64,
    pub metrics: JsonValue,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl TrainingLogEntry {
    pub fn from_report(report: &TrainingReport, started_at: DateTime<Utc>) -> Self {
        Self {
            model_type: report.model_type,
            status: if report.success {
                TrainingStatus::Completed
            } else {
                TrainingStatus::Failed
            },
            records_processed: report.training_sample_size,
            duration_ms: report.duration_ms,
            metrics: report.metrics.clone(),
            error: report.error.clone(),
            started_at,
        }
    }
}

/// Stored result of one successful prediction or analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Service operation that produced the result, e.g. `predict_sales`.
    pub operation: String,
    /// `None` for the artifact-free inventory analyses.
    pub model_type: Option<ModelType>,
    pub artifact_id: Option<ArtifactId>,
    pub input: JsonValue,
    pub result: JsonValue,
    pub execution_time_ms: u64,
    pub created_at: DateTime<Utc>,
}
