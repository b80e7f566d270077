//! Gradient-boosted regression trees for the feature-based leg.
//!
//! Squared-loss boosting with XGBoost-style regularized leaf weights,
//! row/column subsampling, and early stopping on a chronological validation
//! tail. The trained forest is plain data (serde-serializable) and prediction
//! is `&self`, so a fitted model can be shared across concurrent readers.

use crate::config::BoostingConfig;
use crate::error::{ForecastError, Result};
use crate::metrics::{mean_absolute_error, r_squared, root_mean_squared_error};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

/// One node of a regression tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        /// Index of the left child within the tree's node arena.
        left: usize,
        /// Index of the right child within the tree's node arena.
        right: usize,
    },
    Leaf {
        /// Leaf weight with learning rate already applied.
        value: f64,
    },
}

/// A single regression tree stored as a node arena rooted at index 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    fn score(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Summary of one boosting fit, reported back to the trainer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitSummary {
    pub train_r2: f64,
    pub validation_r2: f64,
    pub validation_mae: f64,
    pub best_iteration: usize,
}

/// Trained gradient-boosting regressor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingModel {
    config: BoostingConfig,
    base_score: f64,
    trees: Vec<RegressionTree>,
    feature_count: usize,
}

impl GradientBoostingModel {
    /// Fit on rows already sorted chronologically.
    ///
    /// The last `validation_fraction` of rows is held out for early stopping;
    /// the split must be chronological because a random split would leak
    /// future information into validation.
    pub fn fit(config: &BoostingConfig, x: &[Vec<f64>], y: &[f64]) -> Result<(Self, FitSummary)> {
        if x.is_empty() || x.len() != y.len() {
            return Err(ForecastError::DataError(format!(
                "Feature matrix and target lengths do not match or are empty ({} vs {})",
                x.len(),
                y.len()
            )));
        }
        let feature_count = x[0].len();
        if feature_count == 0 {
            return Err(ForecastError::DataError(
                "Feature matrix has zero columns".to_string(),
            ));
        }

        let val_len = ((x.len() as f64) * config.validation_fraction).round() as usize;
        let split = x.len().saturating_sub(val_len).max(1);
        let (x_train, x_val) = x.split_at(split.min(x.len()));
        let (y_train, y_val) = y.split_at(split.min(y.len()));

        let base_score = y_train.iter().sum::<f64>() / y_train.len() as f64;

        let mut model = Self {
            config: config.clone(),
            base_score,
            trees: Vec::new(),
            feature_count,
        };

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut train_scores = vec![base_score; x_train.len()];
        let mut val_scores = vec![base_score; x_val.len()];

        let mut best_rmse = f64::INFINITY;
        let mut best_iteration = 0usize;

        for m in 0..config.n_estimators {
            // Negative gradient of squared loss is the residual.
            let gradients: Vec<f64> = train_scores
                .iter()
                .zip(y_train.iter())
                .map(|(pred, target)| pred - target)
                .collect();

            let rows = sample_indices(x_train.len(), config.subsample, &mut rng);
            let columns = sample_indices(feature_count, config.colsample, &mut rng);

            let tree = grow_tree(x_train, &gradients, &rows, &columns, config);

            for (i, row) in x_train.iter().enumerate() {
                train_scores[i] += tree.score(row);
            }
            for (i, row) in x_val.iter().enumerate() {
                val_scores[i] += tree.score(row);
            }
            model.trees.push(tree);

            if x_val.is_empty() {
                best_iteration = m;
                continue;
            }

            let rmse = root_mean_squared_error(&val_scores, y_val);
            if rmse + 1e-12 < best_rmse {
                best_rmse = rmse;
                best_iteration = m;
            } else if m - best_iteration >= config.early_stopping_rounds {
                break;
            }
        }

        model.trees.truncate(best_iteration + 1);

        let train_preds: Vec<f64> = x_train.iter().map(|row| model.predict_row(row)).collect();
        let val_preds: Vec<f64> = x_val.iter().map(|row| model.predict_row(row)).collect();

        let summary = FitSummary {
            train_r2: r_squared(&train_preds, y_train),
            validation_r2: r_squared(&val_preds, y_val),
            validation_mae: mean_absolute_error(&val_preds, y_val),
            best_iteration,
        };

        info!(
            trees = model.trees.len(),
            train_r2 = summary.train_r2,
            validation_r2 = summary.validation_r2,
            validation_mae = summary.validation_mae,
            "gradient boosting fit complete"
        );

        Ok((model, summary))
    }

    /// Point prediction for one feature vector.
    pub fn predict_row(&self, features: &[f64]) -> f64 {
        let mut score = self.base_score;
        for tree in &self.trees {
            score += tree.score(features);
        }
        score
    }

    /// Point predictions for a batch of rows.
    pub fn predict(&self, x: &[Vec<f64>]) -> Vec<f64> {
        x.iter().map(|row| self.predict_row(row)).collect()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }
}

/// Draw a deterministic sample of `fraction * n` indices without replacement.
fn sample_indices(n: usize, fraction: f64, rng: &mut StdRng) -> Vec<usize> {
    let take = ((n as f64) * fraction).ceil().max(1.0) as usize;
    if take >= n {
        return (0..n).collect();
    }
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(take);
    indices.sort_unstable();
    indices
}

/// L1 soft-thresholding of the gradient sum.
fn soft_threshold(gradient_sum: f64, alpha: f64) -> f64 {
    if gradient_sum > alpha {
        gradient_sum - alpha
    } else if gradient_sum < -alpha {
        gradient_sum + alpha
    } else {
        0.0
    }
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    gradients: &'a [f64],
    columns: &'a [usize],
    config: &'a BoostingConfig,
    nodes: Vec<TreeNode>,
}

fn grow_tree(
    x: &[Vec<f64>],
    gradients: &[f64],
    rows: &[usize],
    columns: &[usize],
    config: &BoostingConfig,
) -> RegressionTree {
    let mut builder = TreeBuilder {
        x,
        gradients,
        columns,
        config,
        nodes: Vec::new(),
    };
    builder.build(rows.to_vec(), 0);
    RegressionTree {
        nodes: builder.nodes,
    }
}

impl TreeBuilder<'_> {
    /// Recursively grow the subtree for `rows`; returns its node index.
    fn build(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        // With squared loss every sample has unit hessian, so the hessian
        // sum of a node is its sample count.
        let count = rows.len() as f64;
        let gradient_sum: f64 = rows.iter().map(|&i| self.gradients[i]).sum();

        if depth >= self.config.max_depth || count < 2.0 * self.config.min_child_weight {
            return self.push_leaf(gradient_sum, count);
        }

        match self.best_split(&rows, gradient_sum, count) {
            None => self.push_leaf(gradient_sum, count),
            Some((feature, threshold)) => {
                let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                    .into_iter()
                    .partition(|&i| self.x[i][feature] < threshold);

                // Reserve the split slot before recursing into children.
                let idx = self.nodes.len();
                self.nodes.push(TreeNode::Leaf { value: 0.0 });
                let left = self.build(left_rows, depth + 1);
                let right = self.build(right_rows, depth + 1);
                self.nodes[idx] = TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                };
                idx
            }
        }
    }

    fn push_leaf(&mut self, gradient_sum: f64, count: f64) -> usize {
        let weight =
            -soft_threshold(gradient_sum, self.config.reg_alpha) / (count + self.config.reg_lambda);
        let idx = self.nodes.len();
        self.nodes.push(TreeNode::Leaf {
            value: self.config.learning_rate * weight,
        });
        idx
    }

    /// Exact greedy split search over the sampled columns.
    fn best_split(
        &self,
        rows: &[usize],
        gradient_sum: f64,
        count: f64,
    ) -> Option<(usize, f64)> {
        let lambda = self.config.reg_lambda;
        let min_child = self.config.min_child_weight;
        let parent_gain = gradient_sum * gradient_sum / (count + lambda);

        let mut best: Option<(usize, f64, f64)> = None;

        for &feature in self.columns {
            let mut ordered: Vec<(f64, f64)> = rows
                .iter()
                .map(|&i| (self.x[i][feature], self.gradients[i]))
                .collect();
            ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            let mut left_count = 0.0;

            for window in ordered.windows(2) {
                left_sum += window[0].1;
                left_count += 1.0;

                // Only split between distinct feature values.
                if window[0].0 == window[1].0 {
                    continue;
                }

                let right_count = count - left_count;
                if left_count < min_child || right_count < min_child {
                    continue;
                }

                let right_sum = gradient_sum - left_sum;
                let gain = left_sum * left_sum / (left_count + lambda)
                    + right_sum * right_sum / (right_count + lambda)
                    - parent_gain;

                if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                    let threshold = (window[0].0 + window[1].0) / 2.0;
                    best = Some((feature, threshold, gain));
                }
            }
        }

        best.map(|(feature, threshold, _)| (feature, threshold))
    }
}
