//! Pre-flight checks and degraded-result tagging.

use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

/// Result of a cheap pre-flight check run before an expensive training run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    NotReady(String),
}

impl Readiness {
    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self::NotReady(reason.into())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }

    /// Convert into the error a training call reports when not ready.
    pub fn into_result(self) -> Result<(), AnalyticsError> {
        match self {
            Readiness::Ready => Ok(()),
            Readiness::NotReady(reason) => Err(AnalyticsError::InsufficientData(reason)),
        }
    }
}

/// A value produced either by the model or by a documented fallback path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Estimate<T> {
    Predicted { value: T },
    Fallback { value: T, reason: String },
}

impl<T> Estimate<T> {
    pub fn predicted(value: T) -> Self {
        Self::Predicted { value }
    }

    pub fn fallback(value: T, reason: impl Into<String>) -> Self {
        Self::Fallback {
            value,
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Estimate::Predicted { value } | Estimate::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Estimate::Predicted { value } | Estimate::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Estimate::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            Estimate::Fallback { reason, .. } => Some(reason),
            Estimate::Predicted { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Estimate<U> {
        match self {
            Estimate::Predicted { value } => Estimate::Predicted { value: f(value) },
            Estimate::Fallback { value, reason } => Estimate::Fallback {
                value: f(value),
                reason,
            },
        }
    }
}
