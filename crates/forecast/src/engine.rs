//! Sales Forecast Engine: train on daily revenue, project future days.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use retailsense_core::stats::round_to;
use retailsense_core::{
    AnalyticsError, AnalyticsResult, ArtifactId, ArtifactStore, Estimate, HistorySnapshot,
    ModelType, Readiness, TrainedModelArtifact, Trainer, TrainingRun, load_artifact,
    train_and_store,
};

use crate::features::{DailySales, DayFeatures, HistoryParts, aggregate_daily, build_features, future_features};
use crate::metrics::{RegressionScores, cross_validate, holdout_rows};
use crate::regressor::{ModelKind, Regressor};

/// Days with sales required before a model can be trained.
pub const MIN_TRAINING_DAYS: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    pub history_window_days: i64,
    pub model_kind: ModelKind,
    pub default_days_ahead: u32,
    pub holdout_fraction: f64,
    pub cv_folds: usize,
    pub recent_window_days: i64,
    pub confidence_margin: f64,
    pub seed: u64,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            history_window_days: 720,
            model_kind: ModelKind::RandomForest,
            default_days_ahead: 30,
            holdout_fraction: 0.2,
            cv_folds: 5,
            recent_window_days: 60,
            confidence_margin: 0.15,
            seed: 42,
        }
    }
}

/// Parameters of one training run. Pre-aggregated rows may be supplied
/// instead of deriving them from the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesTrainParams {
    pub model_kind: ModelKind,
    pub history_window_days: i64,
    pub holdout_fraction: f64,
    pub cv_folds: usize,
    pub seed: u64,
    #[serde(skip)]
    pub data: Option<Vec<DailySales>>,
}

impl SalesTrainParams {
    pub fn from_settings(settings: &ForecastSettings) -> Self {
        Self {
            model_kind: settings.model_kind,
            history_window_days: settings.history_window_days,
            holdout_fraction: settings.holdout_fraction,
            cv_folds: settings.cv_folds,
            seed: settings.seed,
            data: None,
        }
    }

    pub fn with_model_kind(mut self, model_kind: ModelKind) -> Self {
        self.model_kind = model_kind;
        self
    }

    pub fn with_data(mut self, data: Vec<DailySales>) -> Self {
        self.data = Some(data);
        self
    }
}

/// Fitted state persisted in the `sales_forecast` slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastState {
    pub model_kind: ModelKind,
    pub regressor: Regressor,
    pub feature_names: Vec<String>,
    pub history_window_days: i64,
    pub holdout_fraction: f64,
    pub train_rows: usize,
    pub test_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_value: f64,
    pub predicted_quantity: u64,
    pub confidence_lower: f64,
    pub confidence_upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub days: usize,
    pub total_revenue: f64,
    pub avg_daily_revenue: f64,
    pub total_quantity: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesForecast {
    pub artifact_id: ArtifactId,
    pub model_kind: ModelKind,
    pub points: Vec<ForecastPoint>,
    pub summary: ForecastSummary,
}

/// Stored model re-scored against the chronological hold-out split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEvaluation {
    pub artifact_id: ArtifactId,
    pub test_samples: usize,
    pub test: RegressionScores,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

pub struct SalesForecastEngine<S> {
    store: S,
    settings: ForecastSettings,
}

impl<S: ArtifactStore> SalesForecastEngine<S> {
    pub fn new(store: S, settings: ForecastSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &ForecastSettings {
        &self.settings
    }

    /// Aggregate the trailing window into daily rows, rejecting thin history.
    pub fn prepare(&self, history: &HistorySnapshot, history_window_days: i64) -> AnalyticsResult<Vec<DailySales>> {
        let days = aggregate_daily(history, history_window_days);
        if days.len() < MIN_TRAINING_DAYS {
            return Err(AnalyticsError::insufficient_data(format!(
                "need at least {MIN_TRAINING_DAYS} days with sales, found {}",
                days.len()
            )));
        }
        debug!(days = days.len(), window = history_window_days, "daily sales prepared");
        Ok(days)
    }

    pub fn train(
        &self,
        history: &HistorySnapshot,
        params: &SalesTrainParams,
    ) -> AnalyticsResult<TrainedModelArtifact<ForecastState>> {
        train_and_store(self, &self.store, history, params)
    }

    pub fn load(&self) -> AnalyticsResult<TrainedModelArtifact<ForecastState>> {
        load_artifact(&self.store, ModelType::SalesForecast)
    }

    /// Project `days_ahead` days starting at the snapshot date.
    ///
    /// Every future day shares the same lag/rolling inputs derived from the
    /// recent window. Without recent sales the flat default inputs are used
    /// and the result is tagged as a fallback.
    pub fn predict(&self, history: &HistorySnapshot, days_ahead: u32) -> AnalyticsResult<Estimate<SalesForecast>> {
        if days_ahead == 0 {
            return Err(AnalyticsError::invalid_input("days_ahead must be at least 1"));
        }
        let artifact = self.load()?;
        let state = &artifact.fitted_state;

        let recent = aggregate_daily(history, self.settings.recent_window_days);
        let (parts, fallback) = match HistoryParts::from_recent(&recent).filter(HistoryParts::is_finite) {
            Some(parts) => (parts, None),
            None => {
                warn!(
                    window = self.settings.recent_window_days,
                    "no recent sales, forecasting from default inputs"
                );
                (
                    HistoryParts::DEFAULT,
                    Some(format!(
                        "no sales in the last {} days; default inputs used",
                        self.settings.recent_window_days
                    )),
                )
            }
        };

        let margin = self.settings.confidence_margin;
        let start = history.as_of_date();
        let mut points = Vec::with_capacity(days_ahead as usize);
        for offset in 0..days_ahead {
            let date = start + Duration::days(offset as i64);
            let raw = state.regressor.predict_row(&future_features(date, &parts).to_vec())?;
            if !raw.is_finite() {
                return Err(AnalyticsError::computation(format!("non-finite prediction for {date}")));
            }
            let value = raw.max(0.0);
            let quantity = if parts.avg_order_value > 0.0 {
                (value / parts.avg_order_value).floor() as u64
            } else {
                0
            };
            points.push(ForecastPoint {
                date,
                predicted_value: round_to(value, 2),
                predicted_quantity: quantity,
                confidence_lower: round_to(value * (1.0 - margin), 2),
                confidence_upper: round_to(value * (1.0 + margin), 2),
            });
        }

        let total_revenue: f64 = points.iter().map(|p| p.predicted_value).sum();
        let summary = ForecastSummary {
            days: points.len(),
            total_revenue: round_to(total_revenue, 2),
            avg_daily_revenue: round_to(total_revenue / points.len() as f64, 2),
            total_quantity: points.iter().map(|p| p.predicted_quantity).sum(),
        };
        info!(
            artifact_id = %artifact.id,
            days_ahead,
            total_revenue = summary.total_revenue,
            fallback = fallback.is_some(),
            "sales forecast produced"
        );

        let forecast = SalesForecast {
            artifact_id: artifact.id,
            model_kind: state.model_kind,
            points,
            summary,
        };
        Ok(match fallback {
            Some(reason) => Estimate::fallback(forecast, reason),
            None => Estimate::predicted(forecast),
        })
    }

    /// Re-score the stored model on the hold-out split of `history`.
    pub fn evaluate(&self, history: &HistorySnapshot) -> AnalyticsResult<ForecastEvaluation> {
        let artifact = self.load()?;
        let days = self.prepare(history, artifact.fitted_state.history_window_days)?;
        self.evaluate_rows(&artifact, &days)
    }

    pub fn evaluate_rows(
        &self,
        artifact: &TrainedModelArtifact<ForecastState>,
        days: &[DailySales],
    ) -> AnalyticsResult<ForecastEvaluation> {
        let state = &artifact.fitted_state;
        let (x, y) = design_matrix(days)?;
        let n_test = holdout_rows(x.len(), state.holdout_fraction)?;
        let n_train = x.len() - n_test;
        let predicted = state.regressor.predict(&x[n_train..])?;
        Ok(ForecastEvaluation {
            artifact_id: artifact.id,
            test_samples: n_test,
            test: RegressionScores::compute(&y[n_train..], &predicted),
        })
    }
}

fn design_matrix(days: &[DailySales]) -> AnalyticsResult<(Vec<Vec<f64>>, Vec<f64>)> {
    let features = build_features(days);
    if let Some(bad) = features.iter().position(|f| !f.is_finite()) {
        return Err(AnalyticsError::computation(format!(
            "non-finite features for {}",
            days[bad].date
        )));
    }
    let x = features.iter().map(DayFeatures::to_vec).collect();
    let y = days.iter().map(|d| d.revenue).collect();
    Ok((x, y))
}

fn top_importances(importances: &[f64], limit: usize) -> Vec<FeatureImportance> {
    let mut ranked: Vec<(usize, f64)> = importances.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(i, importance)| FeatureImportance {
            feature: DayFeatures::NAMES[i].to_string(),
            importance,
        })
        .collect()
}

impl<S: ArtifactStore> Trainer for SalesForecastEngine<S> {
    type Params = SalesTrainParams;
    type State = ForecastState;

    fn model_type(&self) -> ModelType {
        ModelType::SalesForecast
    }

    fn can_train(&self, history: &HistorySnapshot, params: &SalesTrainParams) -> Readiness {
        let rows = match &params.data {
            Some(data) => data.len(),
            None => aggregate_daily(history, params.history_window_days).len(),
        };
        if rows < MIN_TRAINING_DAYS {
            Readiness::not_ready(format!(
                "need at least {MIN_TRAINING_DAYS} days with sales, found {rows}"
            ))
        } else {
            Readiness::Ready
        }
    }

    fn fit(&self, history: &HistorySnapshot, params: &SalesTrainParams) -> AnalyticsResult<TrainingRun<ForecastState>> {
        let days = match &params.data {
            Some(data) => data.clone(),
            None => self.prepare(history, params.history_window_days)?,
        };
        let (x, y) = design_matrix(&days)?;
        let n_test = holdout_rows(x.len(), params.holdout_fraction)?;
        let n_train = x.len() - n_test;

        let regressor = Regressor::fit(params.model_kind, &x[..n_train], &y[..n_train], params.seed)?;
        let train = RegressionScores::compute(&y[..n_train], &regressor.predict(&x[..n_train])?);
        let test = RegressionScores::compute(&y[n_train..], &regressor.predict(&x[n_train..])?);
        // folds span every row, hold-out included
        let cv = cross_validate(params.model_kind, &x, &y, params.cv_folds, params.seed)?;
        debug!(
            model_kind = %params.model_kind,
            train_rows = n_train,
            test_rows = n_test,
            test_r2 = test.r2,
            cv_r2_mean = cv.r2_mean,
            "forecast model scored"
        );

        let mut metrics = json!({
            "model_kind": params.model_kind,
            "train_r2": train.r2,
            "train_rmse": train.rmse,
            "train_mae": train.mae,
            "test_r2": test.r2,
            "test_rmse": test.rmse,
            "test_mae": test.mae,
            "cv_r2_mean": cv.r2_mean,
            "cv_r2_std": cv.r2_std,
            "cv_folds": cv.folds,
            "cv_samples": x.len(),
            "train_samples": n_train,
            "test_samples": n_test,
        });
        if let Some(importances) = regressor.feature_importances() {
            metrics["feature_importance"] = json!(top_importances(importances, 10));
        }

        Ok(TrainingRun {
            state: ForecastState {
                model_kind: params.model_kind,
                regressor,
                feature_names: DayFeatures::NAMES.iter().map(|s| s.to_string()).collect(),
                history_window_days: params.history_window_days,
                holdout_fraction: params.holdout_fraction,
                train_rows: n_train,
                test_rows: n_test,
            },
            training_sample_size: days.len(),
            metrics,
        })
    }
}
