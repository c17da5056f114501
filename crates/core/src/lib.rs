//! `retailsense-core`
//!
//! Shared foundation for the analytics engines.
//!
//! Pure building blocks only: identifiers, the read-only history model, the
//! error type, shared statistics and the artifact/trainer seams. No IO.

pub mod artifact;
pub mod error;
pub mod history;
pub mod id;
pub mod outcome;
pub mod stats;

pub use artifact::{
    ArtifactStore, ModelType, TrainedModelArtifact, Trainer, TrainingRun, load_artifact,
    save_artifact, train_and_store,
};
pub use error::{AnalyticsError, AnalyticsResult};
pub use history::{
    CatalogItem, CustomerRecord, HistoryReader, HistorySnapshot, OrderStatus, OrderSummary,
    TransactionEvent, VariantStock,
};
pub use id::{ArtifactId, CustomerId, ItemId, OrderId, VariantId};
pub use outcome::{Estimate, Readiness};
pub use stats::StandardScaler;
