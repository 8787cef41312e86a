//! Random forest over one-hot encoded incident features.
//!
//! Bagged Gini decision trees with per-node feature subsampling.
//! Feature importances are impurity decreases, normalized per tree and
//! averaged across the ensemble.

use crate::rng::Lcg;

/// Training knobs for the ensemble.
#[derive(Debug, Clone)]
pub struct ForestConfig {
    /// Number of bagged trees.
    pub n_trees: usize,
    /// Maximum tree depth.
    pub max_depth: usize,
    /// Seed for bootstrap and feature subsampling.
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 12,
            seed: 42,
        }
    }
}

/// A fitted node. Features are one-hot columns, so every split tests
/// `row[feature] < 0.5`.
enum TreeNode {
    Leaf {
        probability: f64,
    },
    Split {
        feature: usize,
        low: Box<TreeNode>,
        high: Box<TreeNode>,
    },
}

impl TreeNode {
    fn probability(&self, row: &[f64]) -> f64 {
        match self {
            Self::Leaf { probability } => *probability,
            Self::Split { feature, low, high } => {
                if row.get(*feature).copied().unwrap_or(0.0) < 0.5 {
                    low.probability(row)
                } else {
                    high.probability(row)
                }
            }
        }
    }
}

/// A fitted random forest for binary classification.
pub struct RandomForest {
    trees: Vec<TreeNode>,
    importances: Vec<f64>,
}

impl RandomForest {
    /// Fits the ensemble on dense feature rows and boolean labels.
    ///
    /// `rows` must all share the same width. Empty input produces an
    /// ensemble that always predicts `false`.
    #[must_use]
    pub fn fit(rows: &[Vec<f64>], labels: &[bool], config: &ForestConfig) -> Self {
        let n_features = rows.first().map_or(0, Vec::len);
        let mut rng = Lcg::new(config.seed);
        let mut trees = Vec::with_capacity(config.n_trees);
        let mut importances = vec![0.0; n_features];

        if rows.is_empty() || n_features == 0 {
            return Self {
                trees: vec![TreeNode::Leaf { probability: 0.0 }],
                importances,
            };
        }

        for _ in 0..config.n_trees {
            // Bootstrap sample, same size as the input, with replacement.
            let bootstrap: Vec<usize> =
                (0..rows.len()).map(|_| rng.next_index(rows.len())).collect();

            let mut tree_importance = vec![0.0; n_features];
            let tree = grow(
                rows,
                labels,
                bootstrap,
                0,
                config.max_depth,
                &mut rng,
                &mut tree_importance,
            );

            let total: f64 = tree_importance.iter().sum();
            if total > 0.0 {
                for (acc, imp) in importances.iter_mut().zip(&tree_importance) {
                    *acc += imp / total;
                }
            }
            trees.push(tree);
        }

        #[allow(clippy::cast_precision_loss)]
        let n_trees = trees.len() as f64;
        for imp in &mut importances {
            *imp /= n_trees;
        }

        Self { trees, importances }
    }

    /// Mean positive-class probability over the ensemble.
    #[must_use]
    pub fn probability(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.probability(row)).sum();
        #[allow(clippy::cast_precision_loss)]
        let n = self.trees.len() as f64;
        sum / n
    }

    /// Majority-vote prediction.
    #[must_use]
    pub fn predict(&self, row: &[f64]) -> bool {
        self.probability(row) >= 0.5
    }

    /// Normalized mean impurity decrease per feature.
    #[must_use]
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    /// Fraction of rows predicted correctly.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn accuracy(&self, rows: &[Vec<f64>], labels: &[bool]) -> f64 {
        if rows.is_empty() {
            return 0.0;
        }
        let correct = rows
            .iter()
            .zip(labels)
            .filter(|&(ref row, &label)| self.predict(row) == label)
            .count();
        correct as f64 / rows.len() as f64
    }
}

fn gini(p: f64) -> f64 {
    2.0 * p * (1.0 - p)
}

#[allow(clippy::cast_precision_loss)]
fn positive_fraction(labels: &[bool], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    let positives = indices.iter().filter(|&&i| labels[i]).count();
    positives as f64 / indices.len() as f64
}

#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn grow(
    rows: &[Vec<f64>],
    labels: &[bool],
    indices: Vec<usize>,
    depth: usize,
    max_depth: usize,
    rng: &mut Lcg,
    importance: &mut [f64],
) -> TreeNode {
    let p = positive_fraction(labels, &indices);
    if depth >= max_depth || indices.len() < 2 || p == 0.0 || p == 1.0 {
        return TreeNode::Leaf { probability: p };
    }

    let n_features = importance.len();
    let subsample = ((n_features as f64).sqrt().ceil() as usize).clamp(1, n_features);

    let parent_gini = gini(p);
    let node_size = indices.len() as f64;
    let mut best: Option<(usize, f64)> = None;

    for _ in 0..subsample {
        let feature = rng.next_index(n_features);

        let mut low_total = 0usize;
        let mut low_positive = 0usize;
        for &i in &indices {
            if rows[i][feature] < 0.5 {
                low_total += 1;
                if labels[i] {
                    low_positive += 1;
                }
            }
        }
        let high_total = indices.len() - low_total;
        if low_total == 0 || high_total == 0 {
            continue;
        }

        let high_positive =
            indices.iter().filter(|&&i| labels[i]).count() - low_positive;
        let low_p = low_positive as f64 / low_total as f64;
        let high_p = high_positive as f64 / high_total as f64;

        let weighted = (low_total as f64 * gini(low_p)
            + high_total as f64 * gini(high_p))
            / node_size;
        let gain = parent_gini - weighted;

        if gain > 1e-12 && best.is_none_or(|(_, best_gain)| gain > best_gain) {
            best = Some((feature, gain));
        }
    }

    let Some((feature, gain)) = best else {
        return TreeNode::Leaf { probability: p };
    };

    importance[feature] += node_size * gain;

    let (low, high): (Vec<usize>, Vec<usize>) =
        indices.into_iter().partition(|&i| rows[i][feature] < 0.5);

    TreeNode::Split {
        feature,
        low: Box::new(grow(
            rows, labels, low, depth + 1, max_depth, rng, importance,
        )),
        high: Box::new(grow(
            rows, labels, high, depth + 1, max_depth, rng, importance,
        )),
    }
}
