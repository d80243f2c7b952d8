//! Small regressors used by the ensemble strategy.
//!
//! Inputs are dense feature rows of equal width paired with scalar targets.
//! Fitting never fails: degenerate inputs produce constant predictors.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One feature row.
pub type Row = Vec<f64>;

/// Diagonal load added to the normal equations, relative to their mean
/// diagonal. Keeps collinear columns solvable.
const RIDGE: f64 = 1e-8;

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn width(rows: &[Row]) -> usize {
    rows.first().map_or(0, Vec::len)
}

/// Per-column standardization to zero mean and unit variance.
/// Constant columns are only centred.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Row]) -> Self {
        let n = rows.len() as f64;
        let mut means = Vec::new();
        let mut scales = Vec::new();

        for j in 0..width(rows) {
            let column: Vec<f64> = rows.iter().map(|r| r[j]).collect();
            let m = mean(&column);
            let std = (column.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / n).sqrt();
            means.push(m);
            scales.push(if std > 1e-12 * m.abs().max(1.0) { std } else { 1.0 });
        }

        Self { means, scales }
    }

    pub fn transform(&self, row: &[f64]) -> Row {
        row.iter()
            .enumerate()
            .map(|(j, v)| {
                let m = self.means.get(j).copied().unwrap_or(0.0);
                let s = self.scales.get(j).copied().unwrap_or(1.0);
                (v - m) / s
            })
            .collect()
    }
}

/// Least-squares linear model with a tiny ridge term.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRegression {
    pub weights: Vec<f64>,
    pub intercept: f64,
}

impl LinearRegression {
    pub fn fit(rows: &[Row], ys: &[f64]) -> Self {
        let n = rows.len().min(ys.len());
        let (rows, ys) = (&rows[..n], &ys[..n]);
        let d = width(rows);

        let y_mean = mean(ys);
        let x_means: Vec<f64> = (0..d)
            .map(|j| mean(&rows.iter().map(|r| r[j]).collect::<Vec<_>>()))
            .collect();

        // Normal equations on centred data: (XᵀX + λI) w = Xᵀy.
        let mut gram = vec![vec![0.0; d]; d];
        let mut rhs = vec![0.0; d];
        for (row, y) in rows.iter().zip(ys) {
            let centred: Vec<f64> = row.iter().zip(&x_means).map(|(x, m)| x - m).collect();
            for i in 0..d {
                rhs[i] += centred[i] * (y - y_mean);
                for j in 0..d {
                    gram[i][j] += centred[i] * centred[j];
                }
            }
        }

        let trace: f64 = (0..d).map(|i| gram[i][i]).sum();
        let lambda = RIDGE * (trace / d.max(1) as f64).max(1.0);
        for (i, row) in gram.iter_mut().enumerate() {
            row[i] += lambda;
        }

        let weights = solve(gram, rhs);
        let intercept = y_mean - weights.iter().zip(&x_means).map(|(w, m)| w * m).sum::<f64>();
        Self { weights, intercept }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        self.intercept + self.weights.iter().zip(row).map(|(w, x)| w * x).sum::<f64>()
    }
}

/// Gaussian elimination with partial pivoting. Singular pivots yield a zero
/// weight for that column.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().partial_cmp(&a[j][col].abs()).unwrap_or(Ordering::Equal))
            .unwrap_or(col);
        a.swap(col, pivot);
        b.swap(col, pivot);

        let pivot_row = a[col].clone();
        let p = pivot_row[col];
        if p.abs() < f64::MIN_POSITIVE {
            continue;
        }
        for row in col + 1..n {
            let factor = a[row][col] / p;
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * pivot_row[k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let p = a[row][row];
        if p.abs() < f64::MIN_POSITIVE {
            continue;
        }
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / p;
    }
    x
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// CART regression tree splitting on squared error over every feature.
#[derive(Debug, Clone)]
pub struct RegressionTree {
    root: Node,
}

impl RegressionTree {
    pub fn fit(rows: &[Row], ys: &[f64], max_depth: usize) -> Self {
        let n = rows.len().min(ys.len());
        let indices: Vec<usize> = (0..n).collect();
        Self {
            root: build(rows, ys, &indices, max_depth),
        }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = row.get(*feature).copied().unwrap_or(0.0);
                    node = if x <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn depth(node: &Node) -> usize {
            match node {
                Node::Leaf(_) => 0,
                Node::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        depth(&self.root)
    }
}

/// Best split found so far: feature, threshold and resulting squared error.
struct Candidate {
    feature: usize,
    threshold: f64,
    sse: f64,
}

fn build(rows: &[Row], ys: &[f64], indices: &[usize], depth_left: usize) -> Node {
    let values: Vec<f64> = indices.iter().map(|&i| ys[i]).collect();
    let leaf = Node::Leaf(mean(&values));

    if depth_left == 0 || indices.len() < 2 {
        return leaf;
    }

    let total_sum: f64 = values.iter().sum();
    let total_sq: f64 = values.iter().map(|y| y * y).sum();
    let n = indices.len() as f64;
    let parent_sse = total_sq - total_sum * total_sum / n;
    if parent_sse <= f64::EPSILON {
        return leaf;
    }

    let mut best: Option<Candidate> = None;
    for feature in 0..width(rows) {
        let mut order = indices.to_vec();
        order.sort_by(|&a, &b| {
            rows[a][feature]
                .partial_cmp(&rows[b][feature])
                .unwrap_or(Ordering::Equal)
        });

        // Scan split positions between distinct values, tracking prefix sums.
        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for i in 0..order.len() - 1 {
            let y = ys[order[i]];
            left_sum += y;
            left_sq += y * y;

            let here = rows[order[i]][feature];
            let next = rows[order[i + 1]][feature];
            if here == next {
                continue;
            }

            let left_n = (i + 1) as f64;
            let right_n = n - left_n;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / left_n)
                + (right_sq - right_sum * right_sum / right_n);

            if best.as_ref().map_or(true, |b| sse < b.sse) {
                best = Some(Candidate {
                    feature,
                    threshold: (here + next) / 2.0,
                    sse,
                });
            }
        }
    }

    let Some(split) = best.filter(|b| b.sse < parent_sse) else {
        return leaf;
    };

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| rows[i][split.feature] <= split.threshold);
    if left.is_empty() || right.is_empty() {
        return leaf;
    }

    Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(build(rows, ys, &left, depth_left - 1)),
        right: Box::new(build(rows, ys, &right, depth_left - 1)),
    }
}

/// Bagged ensemble of regression trees.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// Fit `n_trees` trees, each on a bootstrap sample drawn from `rng`.
    pub fn fit(rows: &[Row], ys: &[f64], n_trees: usize, max_depth: usize, rng: &mut StdRng) -> Self {
        let n = rows.len().min(ys.len());
        if n == 0 {
            return Self { trees: Vec::new() };
        }

        let trees = (0..n_trees.max(1))
            .map(|_| {
                let mut sample_rows = Vec::with_capacity(n);
                let mut sample_ys = Vec::with_capacity(n);
                for _ in 0..n {
                    let idx = rng.gen_range(0..n);
                    sample_rows.push(rows[idx].clone());
                    sample_ys.push(ys[idx]);
                }
                RegressionTree::fit(&sample_rows, &sample_ys, max_depth)
            })
            .collect();

        Self { trees }
    }

    /// Mean of the tree predictions; 0 for an empty forest.
    pub fn predict(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

/// Shuffle `0..n` and split off `ceil(n × test_fraction)` indices for
/// scoring. Returns `(train, test)`; both are non-empty once `n >= 2`.
pub fn train_test_split(n: usize, test_fraction: f64, rng: &mut StdRng) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    if n < 2 {
        return (indices, Vec::new());
    }

    let test = ((n as f64 * test_fraction).ceil() as usize).clamp(1, n - 1);
    let train = indices.split_off(test);
    (train, indices)
}

/// Held-out fit quality of one regressor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitMetrics {
    /// Mean absolute error in tonnes.
    pub mae: f64,
    /// Coefficient of determination; at most 1.
    pub r2: f64,
}

impl FitMetrics {
    /// Score `predicted` against `actual`. A constant `actual` scores an R²
    /// of 1 when matched exactly and 0 otherwise.
    pub fn evaluate(actual: &[f64], predicted: &[f64]) -> Self {
        let n = actual.len().min(predicted.len());
        let (actual, predicted) = (&actual[..n], &predicted[..n]);

        let errors: Vec<f64> = actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()).collect();
        let actual_mean = mean(actual);
        let ss_res: f64 = errors.iter().map(|e| e * e).sum();
        let ss_tot: f64 = actual.iter().map(|a| (a - actual_mean) * (a - actual_mean)).sum();

        let r2 = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        };

        Self {
            mae: mean(&errors),
            r2,
        }
    }
}
