//! `retailsense-forecast`
//!
//! Sales Forecast Engine: daily revenue aggregation, per-day feature
//! engineering, regression (random forest, gradient boosting, linear) and
//! forward projection with a symmetric confidence band.

pub mod engine;
pub mod features;
pub mod metrics;
pub mod regressor;
pub mod tree;

pub use engine::{
    FeatureImportance, ForecastEvaluation, ForecastPoint, ForecastSettings, ForecastState,
    ForecastSummary, MIN_TRAINING_DAYS, SalesForecast, SalesForecastEngine, SalesTrainParams,
};
pub use features::{DailySales, DayFeatures, HistoryParts};
pub use metrics::{CrossValidation, RegressionScores};
pub use regressor::{ModelKind, Regressor};
