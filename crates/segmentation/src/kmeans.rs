//! Seeded k-means with k-means++ initialisation and silhouette scoring.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use retailsense_core::stats::squared_distance;
use retailsense_core::{AnalyticsError, AnalyticsResult};

/// Centroid movement (squared) under which Lloyd iterations stop.
const TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KMeansParams {
    pub k: usize,
    pub restarts: usize,
    pub max_iterations: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeans {
    pub centroids: Vec<Vec<f64>>,
    pub inertia: f64,
    pub iterations: usize,
}

impl KMeans {
    /// Best of `restarts` runs by inertia. Earlier runs win ties.
    pub fn fit(points: &[Vec<f64>], params: KMeansParams) -> AnalyticsResult<Self> {
        if params.k == 0 {
            return Err(AnalyticsError::invalid_input("cluster count must be at least 1"));
        }
        if points.len() < params.k {
            return Err(AnalyticsError::insufficient_data(format!(
                "{} points cannot form {} clusters",
                points.len(),
                params.k
            )));
        }
        if points.iter().flatten().any(|x| !x.is_finite()) {
            return Err(AnalyticsError::computation("non-finite value in clustering input"));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut best: Option<KMeans> = None;
        for _ in 0..params.restarts.max(1) {
            let seeds = plus_plus_init(points, params.k, &mut rng);
            let run = lloyd(points, seeds, params.max_iterations.max(1));
            if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }
        best.ok_or_else(|| AnalyticsError::computation("k-means produced no run"))
    }

    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    /// Euclidean distance to every centroid.
    pub fn transform(&self, point: &[f64]) -> Vec<f64> {
        self.centroids
            .iter()
            .map(|c| squared_distance(point, c).sqrt())
            .collect()
    }

    pub fn predict(&self, point: &[f64]) -> usize {
        nearest(&self.centroids, point).0
    }

    pub fn labels(&self, points: &[Vec<f64>]) -> Vec<usize> {
        points.iter().map(|p| self.predict(p)).collect()
    }
}

/// Index and squared distance of the closest centroid; lowest index on ties.
fn nearest(centroids: &[Vec<f64>], point: &[f64]) -> (usize, f64) {
    let mut best = (0usize, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

fn plus_plus_init(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..n)].clone());

    while centroids.len() < k {
        let weights: Vec<f64> = points.iter().map(|p| nearest(&centroids, p).1).collect();
        let total: f64 = weights.iter().sum();
        let pick = if total > 0.0 {
            let target = rng.gen_range(0.0..total);
            let mut acc = 0.0;
            weights
                .iter()
                .position(|w| {
                    acc += w;
                    acc > target
                })
                .unwrap_or(n - 1)
        } else {
            // every point coincides with a centroid already
            rng.gen_range(0..n)
        };
        centroids.push(points[pick].clone());
    }
    centroids
}

fn lloyd(points: &[Vec<f64>], mut centroids: Vec<Vec<f64>>, max_iterations: usize) -> KMeans {
    let k = centroids.len();
    let width = points[0].len();
    let mut iterations = 0;

    for _ in 0..max_iterations {
        iterations += 1;
        let assignments: Vec<(usize, f64)> = points.iter().map(|p| nearest(&centroids, p)).collect();

        let mut sums = vec![vec![0.0; width]; k];
        let mut counts = vec![0usize; k];
        for (p, (c, _)) in points.iter().zip(&assignments) {
            counts[*c] += 1;
            for (s, x) in sums[*c].iter_mut().zip(p) {
                *s += x;
            }
        }

        let mut next: Vec<Vec<f64>> = sums
            .into_iter()
            .zip(&counts)
            .zip(&centroids)
            .map(|((sum, &count), old)| {
                if count == 0 {
                    old.clone()
                } else {
                    sum.into_iter().map(|s| s / count as f64).collect()
                }
            })
            .collect();

        // Re-seed empty clusters from the points farthest from their centroid.
        let mut far: Vec<usize> = (0..points.len()).collect();
        far.sort_by(|&a, &b| assignments[b].1.total_cmp(&assignments[a].1).then(a.cmp(&b)));
        let mut far = far.into_iter();
        for (c, count) in counts.iter().enumerate() {
            if *count == 0 {
                if let Some(p) = far.next() {
                    next[c] = points[p].clone();
                }
            }
        }

        let shift: f64 = centroids
            .iter()
            .zip(&next)
            .map(|(a, b)| squared_distance(a, b))
            .sum();
        centroids = next;
        if shift <= TOLERANCE {
            break;
        }
    }

    let inertia = points.iter().map(|p| nearest(&centroids, p).1).sum();
    KMeans {
        centroids,
        inertia,
        iterations,
    }
}

/// Mean silhouette coefficient. Zero unless there are at least two clusters
/// and fewer clusters than points.
pub fn silhouette_score(points: &[Vec<f64>], labels: &[usize]) -> f64 {
    let n = points.len();
    let mut clusters: Vec<usize> = labels.to_vec();
    clusters.sort_unstable();
    clusters.dedup();
    if clusters.len() < 2 || clusters.len() >= n {
        return 0.0;
    }

    let k = clusters.iter().max().map_or(0, |m| m + 1);
    let mut total = 0.0;
    for i in 0..n {
        let mut sums = vec![0.0; k];
        let mut counts = vec![0usize; k];
        for j in 0..n {
            if i == j {
                continue;
            }
            sums[labels[j]] += squared_distance(&points[i], &points[j]).sqrt();
            counts[labels[j]] += 1;
        }

        let own = labels[i];
        if counts[own] == 0 {
            // singleton cluster contributes 0
            continue;
        }
        let a = sums[own] / counts[own] as f64;
        let b = (0..k)
            .filter(|&c| c != own && counts[c] > 0)
            .map(|c| sums[c] / counts[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let denom = a.max(b);
        if denom > 0.0 && b.is_finite() {
            total += (b - a) / denom;
        }
    }
    total / n as f64
}
