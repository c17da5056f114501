//! Regression model families for daily revenue.

use core::fmt;
use core::str::FromStr;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use retailsense_core::stats::mean;
use retailsense_core::{AnalyticsError, AnalyticsResult, StandardScaler};

use crate::tree::{RegressionTree, TreeParams};

const FOREST_TREES: usize = 100;
const FOREST_MAX_DEPTH: usize = 10;
const FOREST_MIN_SPLIT: usize = 5;

const BOOSTING_STAGES: usize = 100;
const BOOSTING_MAX_DEPTH: usize = 5;
const BOOSTING_LEARNING_RATE: f64 = 0.1;

/// Ridge term per training row; keeps collinear calendar columns solvable.
const LINEAR_RIDGE: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    RandomForest,
    GradientBoosting,
    Linear,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "random_forest",
            ModelKind::GradientBoosting => "gradient_boosting",
            ModelKind::Linear => "linear",
        }
    }

    pub fn is_tree_based(&self) -> bool {
        !matches!(self, ModelKind::Linear)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random_forest" => Ok(ModelKind::RandomForest),
            "gradient_boosting" => Ok(ModelKind::GradientBoosting),
            "linear" => Ok(ModelKind::Linear),
            other => Err(AnalyticsError::invalid_input(format!(
                "unknown model kind '{other}' (expected random_forest, gradient_boosting or linear)"
            ))),
        }
    }
}

/// A fitted regressor. Serialized as-is inside the forecast artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regressor {
    RandomForest {
        trees: Vec<RegressionTree>,
        importances: Vec<f64>,
    },
    GradientBoosting {
        init: f64,
        learning_rate: f64,
        trees: Vec<RegressionTree>,
        importances: Vec<f64>,
    },
    Linear {
        scaler: StandardScaler,
        intercept: f64,
        coefficients: Vec<f64>,
    },
}

impl Regressor {
    pub fn fit(kind: ModelKind, x: &[Vec<f64>], y: &[f64], seed: u64) -> AnalyticsResult<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(AnalyticsError::computation(format!(
                "cannot fit on {} feature rows and {} targets",
                x.len(),
                y.len()
            )));
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(AnalyticsError::computation("non-finite training target"));
        }

        match kind {
            ModelKind::RandomForest => Ok(fit_forest(x, y, seed)),
            ModelKind::GradientBoosting => Ok(fit_boosting(x, y)),
            ModelKind::Linear => fit_linear(x, y),
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Regressor::RandomForest { .. } => ModelKind::RandomForest,
            Regressor::GradientBoosting { .. } => ModelKind::GradientBoosting,
            Regressor::Linear { .. } => ModelKind::Linear,
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> AnalyticsResult<f64> {
        match self {
            Regressor::RandomForest { trees, .. } => {
                if trees.is_empty() {
                    return Ok(0.0);
                }
                let sum: f64 = trees.iter().map(|t| t.predict(row)).sum();
                Ok(sum / trees.len() as f64)
            }
            Regressor::GradientBoosting {
                init,
                learning_rate,
                trees,
                ..
            } => Ok(trees
                .iter()
                .fold(*init, |acc, t| acc + learning_rate * t.predict(row))),
            Regressor::Linear {
                scaler,
                intercept,
                coefficients,
            } => {
                let z = scaler.transform_row(row)?;
                Ok(intercept + z.iter().zip(coefficients).map(|(a, b)| a * b).sum::<f64>())
            }
        }
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> AnalyticsResult<Vec<f64>> {
        rows.iter().map(|r| self.predict_row(r)).collect()
    }

    /// Normalized impurity-decrease importances; `None` for linear models.
    pub fn feature_importances(&self) -> Option<&[f64]> {
        match self {
            Regressor::RandomForest { importances, .. }
            | Regressor::GradientBoosting { importances, .. } => Some(importances),
            Regressor::Linear { .. } => None,
        }
    }
}

fn fit_forest(x: &[Vec<f64>], y: &[f64], seed: u64) -> Regressor {
    let n = x.len();
    let width = x[0].len();
    let params = TreeParams {
        max_depth: FOREST_MAX_DEPTH,
        min_samples_split: FOREST_MIN_SPLIT,
        min_samples_leaf: 1,
    };
    let mut rng = StdRng::seed_from_u64(seed);
    let mut trees = Vec::with_capacity(FOREST_TREES);
    let mut importances = vec![0.0; width];

    for _ in 0..FOREST_TREES {
        let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
        let (tree, raw) = RegressionTree::fit(x, y, &sample, params);
        for (acc, v) in importances.iter_mut().zip(normalized(raw)) {
            *acc += v;
        }
        trees.push(tree);
    }

    Regressor::RandomForest {
        trees,
        importances: normalized(importances),
    }
}

fn fit_boosting(x: &[Vec<f64>], y: &[f64]) -> Regressor {
    let n = x.len();
    let width = x[0].len();
    let params = TreeParams {
        max_depth: BOOSTING_MAX_DEPTH,
        min_samples_split: 2,
        min_samples_leaf: 1,
    };
    let all: Vec<usize> = (0..n).collect();
    let init = mean(y);
    let mut current = vec![init; n];
    let mut trees = Vec::with_capacity(BOOSTING_STAGES);
    let mut importances = vec![0.0; width];

    for _ in 0..BOOSTING_STAGES {
        let residuals: Vec<f64> = y.iter().zip(&current).map(|(t, p)| t - p).collect();
        let (tree, raw) = RegressionTree::fit(x, &residuals, &all, params);
        for (acc, v) in importances.iter_mut().zip(raw) {
            *acc += v;
        }
        for (p, row) in current.iter_mut().zip(x) {
            *p += BOOSTING_LEARNING_RATE * tree.predict(row);
        }
        trees.push(tree);
    }

    Regressor::GradientBoosting {
        init,
        learning_rate: BOOSTING_LEARNING_RATE,
        trees,
        importances: normalized(importances),
    }
}

fn fit_linear(x: &[Vec<f64>], y: &[f64]) -> AnalyticsResult<Regressor> {
    let scaler = StandardScaler::fit(x)?;
    let z = scaler.transform(x)?;
    let width = scaler.means.len();
    let n = z.len();
    let y_mean = mean(y);

    // Normal equations on centered data: (ZᵀZ + λI) β = Zᵀ(y - ȳ).
    let mut gram = vec![vec![0.0; width]; width];
    let mut rhs = vec![0.0; width];
    for (row, target) in z.iter().zip(y) {
        let centered = target - y_mean;
        for i in 0..width {
            rhs[i] += row[i] * centered;
            for j in 0..width {
                gram[i][j] += row[i] * row[j];
            }
        }
    }
    let ridge = LINEAR_RIDGE * n as f64;
    for (i, r) in gram.iter_mut().enumerate() {
        r[i] += ridge;
    }

    let coefficients = solve(gram, rhs)?;
    Ok(Regressor::Linear {
        scaler,
        intercept: y_mean,
        coefficients,
    })
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> AnalyticsResult<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < 1e-12 {
            return Err(AnalyticsError::computation("singular normal equations"));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        let pivot_row = a[col].clone();
        let pivot_rhs = b[col];
        for row in col + 1..n {
            let factor = a[row][col] / pivot_row[col];
            if factor == 0.0 {
                continue;
            }
            for (k, p) in pivot_row.iter().enumerate().skip(col) {
                a[row][k] -= factor * p;
            }
            b[row] -= factor * pivot_rhs;
        }
    }

    let mut out = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * out[k]).sum();
        out[row] = (b[row] - tail) / a[row][row];
    }
    if out.iter().any(|v| !v.is_finite()) {
        return Err(AnalyticsError::computation("non-finite regression coefficient"));
    }
    Ok(out)
}

fn normalized(mut xs: Vec<f64>) -> Vec<f64> {
    let total: f64 = xs.iter().sum();
    if total > 0.0 {
        for x in xs.iter_mut() {
            *x /= total;
        }
    }
    xs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let y: Vec<f64> = x.iter().map(|r| 3.0 * r[0] - 2.0 * r[1] + 10.0).collect();
        (x, y)
    }

    #[test]
    fn linear_recovers_exact_relationship() {
        let (x, y) = linear_data();
        let model = Regressor::fit(ModelKind::Linear, &x, &y, 0).unwrap();
        let p = model.predict_row(&[25.0, 1.0]).unwrap();
        assert!((p - 83.0).abs() < 1e-4, "got {p}");
        assert!(model.feature_importances().is_none());
    }

    #[test]
    fn linear_tolerates_constant_and_duplicate_columns() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, i as f64, 1.0]).collect();
        let y: Vec<f64> = (0..10).map(|i| 2.0 * i as f64).collect();
        let model = Regressor::fit(ModelKind::Linear, &x, &y, 0).unwrap();
        let p = model.predict_row(&[4.0, 4.0, 1.0]).unwrap();
        assert!((p - 8.0).abs() < 1e-4, "got {p}");
    }

    #[test]
    fn forest_is_seed_deterministic() {
        let (x, y) = linear_data();
        let a = Regressor::fit(ModelKind::RandomForest, &x, &y, 42).unwrap();
        let b = Regressor::fit(ModelKind::RandomForest, &x, &y, 42).unwrap();
        assert_eq!(a, b);
        let importances = a.feature_importances().unwrap();
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn boosting_fits_training_data_closely() {
        let (x, y) = linear_data();
        let model = Regressor::fit(ModelKind::GradientBoosting, &x, &y, 0).unwrap();
        let preds = model.predict(&x).unwrap();
        let worst = preds
            .iter()
            .zip(&y)
            .map(|(p, t)| (p - t).abs())
            .fold(0.0, f64::max);
        assert!(worst < 1.0, "max abs error {worst}");
        assert_eq!(model.kind(), ModelKind::GradientBoosting);
    }

    #[test]
    fn model_kind_parses_and_rejects_unknown() {
        assert_eq!("gradient_boosting".parse::<ModelKind>().unwrap(), ModelKind::GradientBoosting);
        assert!(matches!(
            "prophet".parse::<ModelKind>(),
            Err(AnalyticsError::InvalidInput(_))
        ));
    }

    #[test]
    fn empty_training_set_is_rejected() {
        assert!(matches!(
            Regressor::fit(ModelKind::Linear, &[], &[], 0),
            Err(AnalyticsError::Computation(_))
        ));
    }
}
