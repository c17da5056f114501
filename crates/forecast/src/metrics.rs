//! Regression quality metrics and chronological validation.

use serde::{Deserialize, Serialize};

use retailsense_core::stats::{mean, stddev_population};
use retailsense_core::{AnalyticsError, AnalyticsResult};

use crate::regressor::{ModelKind, Regressor};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionScores {
    pub r2: f64,
    pub rmse: f64,
    pub mae: f64,
}

impl RegressionScores {
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Self {
        Self {
            r2: r2(actual, predicted),
            rmse: rmse(actual, predicted),
            mae: mae(actual, predicted),
        }
    }
}

/// Coefficient of determination. A constant target scores 1 when matched
/// exactly and 0 otherwise, so the value is always finite.
pub fn r2(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let m = mean(actual);
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p) * (a - p)).sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - m) * (a - m)).sum();
    if ss_tot <= f64::EPSILON {
        return if ss_res <= f64::EPSILON { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let mse: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p) * (a - p))
        .sum::<f64>()
        / actual.len() as f64;
    mse.sqrt()
}

pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()).sum::<f64>() / actual.len() as f64
}

/// Rows held out at the end of a chronological split.
pub fn holdout_rows(total: usize, fraction: f64) -> AnalyticsResult<usize> {
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(AnalyticsError::invalid_input(format!(
            "holdout fraction must be in (0, 1), got {fraction}"
        )));
    }
    if total < 2 {
        return Err(AnalyticsError::insufficient_data(format!(
            "need at least 2 rows to split, found {total}"
        )));
    }
    let n_test = (total as f64 * fraction).ceil() as usize;
    Ok(n_test.clamp(1, total - 1))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidation {
    pub folds: usize,
    pub r2_scores: Vec<f64>,
    pub r2_mean: f64,
    pub r2_std: f64,
}

/// Unshuffled k-fold: contiguous folds, the first `n % k` one row larger.
pub fn fold_bounds(n: usize, k: usize) -> Vec<(usize, usize)> {
    let base = n / k;
    let extra = n % k;
    let mut start = 0;
    (0..k)
        .map(|i| {
            let len = base + usize::from(i < extra);
            let bounds = (start, start + len);
            start += len;
            bounds
        })
        .collect()
}

pub fn cross_validate(
    kind: ModelKind,
    x: &[Vec<f64>],
    y: &[f64],
    folds: usize,
    seed: u64,
) -> AnalyticsResult<CrossValidation> {
    if folds < 2 {
        return Err(AnalyticsError::invalid_input(format!(
            "cross-validation needs at least 2 folds, got {folds}"
        )));
    }
    if x.len() < folds {
        return Err(AnalyticsError::insufficient_data(format!(
            "cannot run {folds}-fold cross-validation on {} rows",
            x.len()
        )));
    }

    let mut scores = Vec::with_capacity(folds);
    for (start, end) in fold_bounds(x.len(), folds) {
        let train_x: Vec<Vec<f64>> = x[..start].iter().chain(&x[end..]).cloned().collect();
        let train_y: Vec<f64> = y[..start].iter().chain(&y[end..]).copied().collect();
        let model = Regressor::fit(kind, &train_x, &train_y, seed)?;
        let predicted = model.predict(&x[start..end])?;
        scores.push(r2(&y[start..end], &predicted));
    }

    Ok(CrossValidation {
        folds,
        r2_mean: mean(&scores),
        r2_std: stddev_population(&scores),
        r2_scores: scores,
    })
}
