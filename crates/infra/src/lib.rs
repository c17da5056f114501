//! Infrastructure layer: artifact storage, history sources, insight sinks, config.

pub mod artifact_store;
pub mod config;
pub mod history;
pub mod insights;

pub use artifact_store::{FsArtifactStore, InMemoryArtifactStore};
pub use config::{AnalyticsConfig, ConfigError};
pub use history::{InMemoryHistory, JsonFileHistory};
pub use insights::InMemoryInsightSink;
