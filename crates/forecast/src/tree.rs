//! CART regression tree builder.
//!
//! Exact-greedy splits on squared error. Candidate thresholds are midpoints
//! between consecutive distinct feature values; ties keep the first candidate
//! in (feature, threshold) order so identical input always yields the same tree.

use serde::{Deserialize, Serialize};

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct Builder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    params: TreeParams,
    feature_count: usize,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl RegressionTree {
    /// Fit on the rows named by `indices` (duplicates allowed, e.g. bootstrap
    /// samples). Returns the tree and its raw impurity decrease per feature.
    pub fn fit(x: &[Vec<f64>], y: &[f64], indices: &[usize], params: TreeParams) -> (Self, Vec<f64>) {
        let feature_count = x.first().map(|r| r.len()).unwrap_or(0);
        let mut builder = Builder {
            x,
            y,
            params,
            feature_count,
            nodes: Vec::new(),
            importances: vec![0.0; feature_count],
        };

        if indices.is_empty() {
            builder.nodes.push(Node::Leaf { value: 0.0 });
        } else {
            builder.build_node(indices, 0);
        }

        (Self { nodes: builder.nodes }, builder.importances)
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            match self.nodes.get(idx) {
                None => return 0.0,
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = row.get(*feature).copied().unwrap_or(0.0);
                    idx = if v <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() { 0 } else { walk(&self.nodes, 0) }
    }
}

impl Builder<'_> {
    fn build_node(&mut self, indices: &[usize], depth: usize) -> usize {
        let current = self.nodes.len();
        let leaf_value = self.mean(indices);

        if depth >= self.params.max_depth || indices.len() < self.params.min_samples_split.max(2) {
            self.nodes.push(Node::Leaf { value: leaf_value });
            return current;
        }

        let Some(split) = self.find_best_split(indices) else {
            self.nodes.push(Node::Leaf { value: leaf_value });
            return current;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x[i][split.feature] <= split.threshold);

        self.importances[split.feature] += split.gain;

        // Reserve the slot, then patch child positions once they exist.
        self.nodes.push(Node::Leaf { value: leaf_value });
        let left = self.build_node(&left_idx, depth + 1);
        let right = self.build_node(&right_idx, depth + 1);
        self.nodes[current] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };

        current
    }

    fn find_best_split(&self, indices: &[usize]) -> Option<SplitCandidate> {
        let n = indices.len();
        let total_sum: f64 = indices.iter().map(|&i| self.y[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| self.y[i] * self.y[i]).sum();
        let parent_sse = sse(total_sum, total_sq, n);
        if parent_sse <= 1e-12 {
            return None;
        }

        let mut best: Option<SplitCandidate> = None;
        let mut order: Vec<usize> = indices.to_vec();

        for feature in 0..self.feature_count {
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for pos in 0..n - 1 {
                let i = order[pos];
                left_sum += self.y[i];
                left_sq += self.y[i] * self.y[i];

                let here = self.x[i][feature];
                let next = self.x[order[pos + 1]][feature];
                if next <= here {
                    continue;
                }

                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < self.params.min_samples_leaf || n_right < self.params.min_samples_leaf {
                    continue;
                }

                let children = sse(left_sum, left_sq, n_left)
                    + sse(total_sum - left_sum, total_sq - left_sq, n_right);
                let gain = parent_sse - children;

                if gain > 1e-12 && best.map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: here + (next - here) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }

    fn mean(&self, indices: &[usize]) -> f64 {
        if indices.is_empty() {
            return 0.0;
        }
        indices.iter().map(|&i| self.y[i]).sum::<f64>() / indices.len() as f64
    }
}

fn sse(sum: f64, sum_sq: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    (sum_sq - sum * sum / n as f64).max(0.0)
}
