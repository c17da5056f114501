//! Analytics error model.

use thiserror::Error;

use crate::artifact::ModelType;

/// Result type used across the analytics engines.
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// Analytics-level error.
///
/// Covers deterministic data/model failures. Adapter failures (disk, decoding)
/// are folded into `Storage` so engines never depend on IO error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    /// Training thresholds were not met (too few days, customers or items).
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// A prediction was requested but no artifact is stored for the model type.
    #[error("model not trained: {0}")]
    ModelNotTrained(ModelType),

    /// Neither the co-purchase nor the content similarity matrix could be built.
    #[error("no similarity data: neither co-purchase nor content similarity could be built")]
    NoSimilarityData,

    /// An unexpected numeric failure (non-finite values, singular systems).
    #[error("computation failed: {0}")]
    Computation(String),

    /// A caller-supplied parameter was invalid.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A requested entity does not exist in the snapshot.
    #[error("not found: {0}")]
    NotFound(String),

    /// Artifact or history storage failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl AnalyticsError {
    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        Self::InsufficientData(msg.into())
    }

    pub fn computation(msg: impl Into<String>) -> Self {
        Self::Computation(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}
