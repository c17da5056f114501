//! Trained model artifacts and the store capability they live in.
//!
//! An artifact is produced once per successful training run and never mutated;
//! the next run of the same model type replaces the whole slot.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::history::HistorySnapshot;
use crate::id::ArtifactId;
use crate::outcome::Readiness;

/// Learned model families, one artifact slot each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    SalesForecast,
    ProductAffinity,
    CustomerSegmentation,
}

impl ModelType {
    /// Stable slot name (also the on-disk file stem).
    pub fn slot(&self) -> &'static str {
        match self {
            ModelType::SalesForecast => "sales_forecast",
            ModelType::ProductAffinity => "product_affinity",
            ModelType::CustomerSegmentation => "customer_segmentation",
        }
    }
}

impl core::fmt::Display for ModelType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.slot())
    }
}

/// Persisted output of one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModelArtifact<S> {
    pub id: ArtifactId,
    pub model_type: ModelType,
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub parameters: JsonValue,
    pub fitted_state: S,
    pub training_sample_size: usize,
    pub quality_metrics: JsonValue,
}

impl<S> TrainedModelArtifact<S> {
    pub fn new(model_type: ModelType, parameters: JsonValue, run: TrainingRun<S>) -> Self {
        let trained_at = Utc::now();
        Self {
            id: ArtifactId::new(),
            model_type,
            version: trained_at.format("%Y%m%d_%H%M%S").to_string(),
            trained_at,
            parameters,
            fitted_state: run.state,
            training_sample_size: run.training_sample_size,
            quality_metrics: run.metrics,
        }
    }
}

/// Opaque blob storage with one slot per model type.
///
/// Implementations must make `save` atomic: a reader sees either the previous
/// blob or the new one, never a partial write.
pub trait ArtifactStore: Send + Sync {
    fn save(&self, model_type: ModelType, blob: &[u8]) -> AnalyticsResult<()>;
    fn load(&self, model_type: ModelType) -> AnalyticsResult<Option<Vec<u8>>>;
}

impl<S> ArtifactStore for std::sync::Arc<S>
where
    S: ArtifactStore + ?Sized,
{
    fn save(&self, model_type: ModelType, blob: &[u8]) -> AnalyticsResult<()> {
        (**self).save(model_type, blob)
    }

    fn load(&self, model_type: ModelType) -> AnalyticsResult<Option<Vec<u8>>> {
        (**self).load(model_type)
    }
}

pub fn save_artifact<S, T>(store: &T, artifact: &TrainedModelArtifact<S>) -> AnalyticsResult<()>
where
    S: Serialize,
    T: ArtifactStore + ?Sized,
{
    let blob = serde_json::to_vec(artifact)
        .map_err(|e| AnalyticsError::storage(format!("encode {}: {e}", artifact.model_type)))?;
    store.save(artifact.model_type, &blob)?;
    info!(
        model_type = %artifact.model_type,
        artifact_id = %artifact.id,
        bytes = blob.len(),
        "artifact saved"
    );
    Ok(())
}

/// Load the current artifact for `model_type`, failing with `ModelNotTrained`
/// when the slot is empty.
pub fn load_artifact<S, T>(store: &T, model_type: ModelType) -> AnalyticsResult<TrainedModelArtifact<S>>
where
    S: DeserializeOwned,
    T: ArtifactStore + ?Sized,
{
    let blob = store
        .load(model_type)?
        .ok_or(AnalyticsError::ModelNotTrained(model_type))?;
    let artifact: TrainedModelArtifact<S> = serde_json::from_slice(&blob)
        .map_err(|e| AnalyticsError::storage(format!("decode {model_type}: {e}")))?;
    if artifact.model_type != model_type {
        return Err(AnalyticsError::storage(format!(
            "slot {model_type} holds a {} artifact",
            artifact.model_type
        )));
    }
    debug!(model_type = %model_type, artifact_id = %artifact.id, "artifact loaded");
    Ok(artifact)
}

/// Fitted state plus what the run measured about itself.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRun<S> {
    pub state: S,
    pub training_sample_size: usize,
    pub metrics: JsonValue,
}

/// A learned engine: a pre-flight check and a pure fit over a snapshot.
pub trait Trainer {
    type Params: Serialize;
    type State: Serialize + DeserializeOwned;

    fn model_type(&self) -> ModelType;

    fn can_train(&self, history: &HistorySnapshot, params: &Self::Params) -> Readiness;

    fn fit(
        &self,
        history: &HistorySnapshot,
        params: &Self::Params,
    ) -> AnalyticsResult<TrainingRun<Self::State>>;
}

/// Pre-flight, fit, wrap and persist. The store is only written after the fit
/// fully succeeded, so a failed run leaves the previous artifact in place.
pub fn train_and_store<T, S>(
    trainer: &T,
    store: &S,
    history: &HistorySnapshot,
    params: &T::Params,
) -> AnalyticsResult<TrainedModelArtifact<T::State>>
where
    T: Trainer + ?Sized,
    S: ArtifactStore + ?Sized,
{
    let model_type = trainer.model_type();
    trainer.can_train(history, params).into_result()?;

    info!(model_type = %model_type, "training started");
    let run = trainer.fit(history, params)?;

    let parameters = serde_json::to_value(params)
        .map_err(|e| AnalyticsError::computation(format!("encode parameters: {e}")))?;
    let artifact = TrainedModelArtifact::new(model_type, parameters, run);
    save_artifact(store, &artifact)?;

    info!(
        model_type = %model_type,
        artifact_id = %artifact.id,
        samples = artifact.training_sample_size,
        "training finished"
    );
    Ok(artifact)
}
