//! `retailsense-ai`
//!
//! **Responsibility:** the call boundary of the analytics subsystem.
//!
//! - Exposes every training, prediction and analysis operation through
//!   [`AnalyticsService`].
//! - Never raises from training calls; failures come back as a
//!   [`TrainingReport`].
//! - Emits training logs and prediction records to an [`InsightSink`], never
//!   into the storefront's own tables.

pub mod dashboard;
pub mod report;
pub mod service;
pub mod sink;

pub use dashboard::{AffinityPanel, CustomerPanel, DashboardSummary, InventoryPanel, SalesPanel, SalesTrend};
pub use report::{PredictionRecord, TrainingLogEntry, TrainingReport, TrainingStatus};
pub use service::{AnalyticsService, EngineSettings};
pub use sink::{DiscardInsights, InsightSink};
