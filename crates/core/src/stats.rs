//! Small deterministic statistics shared by the engines.

use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, AnalyticsResult};

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / (xs.len() as f64)
}

/// Sample standard deviation (n-1). Zero for fewer than two points.
pub fn stddev_sample(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let var = xs
        .iter()
        .map(|x| {
            let d = x - m;
            d * d
        })
        .sum::<f64>()
        / ((xs.len() - 1) as f64);
    var.sqrt()
}

/// Population standard deviation (n).
pub fn stddev_population(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let m = mean(xs);
    let var = xs
        .iter()
        .map(|x| {
            let d = x - m;
            d * d
        })
        .sum::<f64>()
        / (xs.len() as f64);
    var.sqrt()
}

pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Cosine similarity; zero when either vector has zero norm.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if na <= f64::EPSILON || nb <= f64::EPSILON {
        return 0.0;
    }
    dot / (na * nb)
}

pub fn round_to(x: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (x * f).round() / f
}

/// Column-wise standardization (zero mean, unit variance), fitted once and
/// persisted alongside the model it feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit on row-major data. Zero-variance columns get scale 1.
    pub fn fit(rows: &[Vec<f64>]) -> AnalyticsResult<Self> {
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != width) {
            return Err(AnalyticsError::computation("ragged feature matrix"));
        }
        if rows.iter().flatten().any(|x| !x.is_finite()) {
            return Err(AnalyticsError::computation(
                "non-finite value in feature matrix during standardization",
            ));
        }

        let mut means = Vec::with_capacity(width);
        let mut scales = Vec::with_capacity(width);
        for col in 0..width {
            let column: Vec<f64> = rows.iter().map(|r| r[col]).collect();
            let std = stddev_population(&column);
            means.push(mean(&column));
            scales.push(if std <= f64::EPSILON { 1.0 } else { std });
        }
        Ok(Self { means, scales })
    }

    pub fn transform_row(&self, row: &[f64]) -> AnalyticsResult<Vec<f64>> {
        if row.len() != self.means.len() {
            return Err(AnalyticsError::computation(format!(
                "feature width mismatch: scaler has {}, row has {}",
                self.means.len(),
                row.len()
            )));
        }
        if row.iter().any(|x| !x.is_finite()) {
            return Err(AnalyticsError::computation("non-finite value in feature row"));
        }
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> AnalyticsResult<Vec<Vec<f64>>> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }
}
