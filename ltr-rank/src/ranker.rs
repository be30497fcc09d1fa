//! Listwise ranking model.
//!
//! [`ScoringModel`] is the seam the reranker scores through; [`LambdaMart`]
//! implements it with gradient-boosted regression trees trained on
//! LambdaRank gradients. Training is deterministic for a fixed seed up to
//! floating-point summation order in the parallel split search.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::RankerParams;
use crate::error::{LetorError, Result};
use crate::lambdarank;
use crate::tree::{FeatureBins, GrowthLimits, RegressionTree, TreeGrower};

/// NDCG cutoff reported after training.
const REPORT_NDCG_AT: usize = 10;

/// A trained model that scores feature rows.
///
/// Scoring is read-only, so one model can serve many threads at once.
pub trait ScoringModel: Send + Sync {
    /// Width of the rows the model expects.
    fn num_features(&self) -> usize;

    /// Score every row. Rows are independent of any group structure.
    ///
    /// # Errors
    ///
    /// Returns [`LetorError::InvalidInput`] if a row has the wrong width.
    fn predict(&self, rows: &[Vec<f32>]) -> Result<Vec<f64>>;
}

/// Gradient-boosted LambdaMART ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaMart {
    num_features: usize,
    trees: Vec<RegressionTree>,
    /// Mean NDCG@10 on the training groups after the last round.
    train_ndcg: f64,
}

impl LambdaMart {
    /// Fit an ensemble on grouped rows.
    ///
    /// `rows`, `labels` and the groups described by `group_sizes` must line
    /// up: `rows.len() == labels.len() == group_sizes.iter().sum()`.
    ///
    /// # Errors
    ///
    /// Returns [`LetorError::InvalidInput`] for inconsistent shapes,
    /// [`LetorError::TrainingError`] for an empty training set, and
    /// [`LetorError::ConfigError`] for invalid parameters.
    pub fn train<R: AsRef<[f32]> + Sync>(
        rows: &[R],
        labels: &[u32],
        group_sizes: &[usize],
        params: &RankerParams,
        seed: Option<u64>,
    ) -> Result<Self> {
        params.validate()?;
        if rows.is_empty() {
            return Err(LetorError::TrainingError("no training examples".into()));
        }
        if rows.len() != labels.len() {
            return Err(LetorError::InvalidInput(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        let grouped: usize = group_sizes.iter().sum();
        if grouped != rows.len() {
            return Err(LetorError::InvalidInput(format!(
                "group sizes sum to {grouped} but there are {} rows",
                rows.len()
            )));
        }
        let num_features = rows[0].as_ref().len();
        if let Some(bad) = rows.iter().position(|r| r.as_ref().len() != num_features) {
            return Err(LetorError::InvalidInput(format!(
                "row {bad} has {} features, expected {num_features}",
                rows[bad].as_ref().len()
            )));
        }
        if num_features == 0 {
            return Err(LetorError::InvalidInput("rows have no features".into()));
        }

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let bins = FeatureBins::fit(rows, num_features, params.max_bin);
        let binned = bins.transform(rows);
        let grower = TreeGrower {
            bins: &bins,
            binned: &binned,
            limits: GrowthLimits {
                num_leaves: params.num_leaves,
                max_depth: params.max_depth,
                min_data_in_leaf: params.min_data_in_leaf,
                lambda_l2: params.lambda_l2,
                shrinkage: params.learning_rate,
            },
        };

        let n = rows.len();
        let features_per_tree =
            ((num_features as f64 * params.feature_fraction).ceil() as usize).clamp(1, num_features);
        let bagging = params.bagging_freq > 0 && params.bagging_fraction < 1.0;
        let mut bag: Vec<u32> = (0..n as u32).collect();
        let mut scores = vec![0.0; n];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for round in 0..params.n_estimators {
            let (grad, hess) = lambdarank::gradients(
                &scores,
                labels,
                group_sizes,
                params.sigmoid,
                params.truncation_level,
            );

            if bagging && round % params.bagging_freq == 0 {
                bag = (0..n as u32).filter(|_| rng.random_bool(params.bagging_fraction)).collect();
                if bag.is_empty() {
                    bag = (0..n as u32).collect();
                }
            }
            let mut features: Vec<usize> = (0..num_features).collect();
            if features_per_tree < num_features {
                features.shuffle(&mut rng);
                features.truncate(features_per_tree);
                features.sort_unstable();
            }

            let tree = grower.grow(&grad, &hess, bag.clone(), &features);
            for (i, score) in scores.iter_mut().enumerate() {
                *score += tree.predict_binned(&binned, i);
            }
            if round % 50 == 0 {
                debug!(round, leaves = tree.num_leaves(), "boosting round");
            }
            trees.push(tree);
        }

        let train_ndcg = lambdarank::mean_ndcg(&scores, labels, group_sizes, REPORT_NDCG_AT);
        info!(
            trees = trees.len(),
            groups = group_sizes.len(),
            examples = n,
            train_ndcg,
            "lambdamart trained"
        );
        Ok(Self { num_features, trees, train_ndcg })
    }

    /// Number of trees in the ensemble.
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean training NDCG@10 reached by the ensemble.
    pub fn train_ndcg(&self) -> f64 {
        self.train_ndcg
    }

    /// Score a single row without width checks.
    fn score_row(&self, row: &[f32]) -> f64 {
        self.trees.iter().map(|t| t.predict(row)).sum()
    }

    /// Check internal consistency, e.g. after deserialisation.
    pub(crate) fn check_shape(&self) -> std::result::Result<(), String> {
        for (i, tree) in self.trees.iter().enumerate() {
            if !tree.is_well_formed() {
                return Err(format!("tree {i} is malformed"));
            }
            if tree.max_feature().is_some_and(|f| f >= self.num_features) {
                return Err(format!("tree {i} references a feature beyond {}", self.num_features));
            }
        }
        Ok(())
    }
}

impl ScoringModel for LambdaMart {
    fn num_features(&self) -> usize {
        self.num_features
    }

    fn predict(&self, rows: &[Vec<f32>]) -> Result<Vec<f64>> {
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                if row.len() != self.num_features {
                    return Err(LetorError::InvalidInput(format!(
                        "row {i} has {} features, expected {}",
                        row.len(),
                        self.num_features
                    )));
                }
                Ok(self.score_row(row))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> RankerParams {
        RankerParams {
            n_estimators: 60,
            learning_rate: 0.3,
            num_leaves: 4,
            min_data_in_leaf: 1,
            bagging_fraction: 1.0,
            feature_fraction: 1.0,
            ..RankerParams::default()
        }
    }

    /// Ten groups of four; relevance is carried by feature 0, feature 1 is noise.
    fn toy() -> (Vec<Vec<f32>>, Vec<u32>, Vec<usize>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for g in 0..10u32 {
            for d in 0..4u32 {
                let label = if d == (g % 4) { 1 } else { 0 };
                rows.push(vec![label as f32 + 0.1 * d as f32, ((g * 7 + d * 3) % 5) as f32]);
                labels.push(label);
            }
        }
        (rows, labels, vec![4; 10])
    }

    #[test]
    fn learns_a_separable_signal() {
        let (rows, labels, groups) = toy();
        let model = LambdaMart::train(&rows, &labels, &groups, &params(), Some(7)).unwrap();
        assert_eq!(model.num_trees(), 60);
        assert!(model.train_ndcg() > 0.99);

        let scores = model.predict(&[vec![1.0, 0.0], vec![0.1, 0.0]]).unwrap();
        assert!(scores[0] > scores[1]);
    }

    #[test]
    fn same_seed_same_model() {
        let (rows, labels, groups) = toy();
        let p = RankerParams { bagging_fraction: 0.7, feature_fraction: 0.5, ..params() };
        let a = LambdaMart::train(&rows, &labels, &groups, &p, Some(11)).unwrap();
        let b = LambdaMart::train(&rows, &labels, &groups, &p, Some(11)).unwrap();
        assert_eq!(a.predict(&rows).unwrap(), b.predict(&rows).unwrap());
    }

    #[test]
    fn rejects_misaligned_groups() {
        let (rows, labels, _) = toy();
        let err = LambdaMart::train(&rows, &labels, &[4, 4], &params(), Some(1)).unwrap_err();
        assert!(matches!(err, LetorError::InvalidInput(_)));
    }

    #[test]
    fn rejects_empty_training_set() {
        let rows: Vec<Vec<f32>> = Vec::new();
        let err = LambdaMart::train(&rows, &[], &[], &params(), Some(1)).unwrap_err();
        assert!(matches!(err, LetorError::TrainingError(_)));
    }

    #[test]
    fn predict_checks_width_and_accepts_any_row_count() {
        let (rows, labels, groups) = toy();
        let model = LambdaMart::train(&rows, &labels, &groups, &params(), Some(3)).unwrap();
        assert!(model.predict(&[]).unwrap().is_empty());
        assert_eq!(model.predict(&rows[..3]).unwrap().len(), 3);
        assert!(model.predict(&[vec![1.0]]).is_err());
    }
}
