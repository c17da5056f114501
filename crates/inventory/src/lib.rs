//! `retailsense-inventory`
//!
//! Inventory Optimization Engine. Stateless and rule driven: every report is
//! recomputed from a [`retailsense_core::HistorySnapshot`] with no trained
//! artifact behind it.

pub mod alert;
pub mod demand;
pub mod optimizer;

pub use alert::{AlertKind, AlertSummary, InventorySignal};
pub use demand::StockPosition;
pub use optimizer::{
    HealthMetrics, HealthReport, HealthStatus, InventoryAnalysis, InventoryOptimizer,
    InventorySettings, ReorderPlan, ReorderPriority, ReorderRecommendation, SlowMovingItem,
    SlowMovingReport,
};
