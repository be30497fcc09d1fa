//! Configuration for topic-model fitting and ranker training.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LetorError, Result};

/// Hyper-parameters for the LambdaMART ranker.
///
/// Defaults follow a conventional LightGBM `lambdarank` setup for small
/// judgment sets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RankerParams {
    /// Number of boosting rounds (trees).
    pub n_estimators: usize,
    /// Shrinkage applied to every tree's output.
    pub learning_rate: f64,
    /// Maximum number of leaves per tree.
    pub num_leaves: usize,
    /// Maximum tree depth. `0` means unlimited.
    pub max_depth: usize,
    /// Minimum number of rows in a leaf.
    pub min_data_in_leaf: usize,
    /// Fraction of rows sampled for each bagging round.
    pub bagging_fraction: f64,
    /// Re-sample rows every `bagging_freq` rounds. `0` disables bagging.
    pub bagging_freq: usize,
    /// Fraction of features considered by each tree.
    pub feature_fraction: f64,
    /// L2 regularisation on leaf values.
    pub lambda_l2: f64,
    /// Maximum number of histogram bins per feature.
    pub max_bin: usize,
    /// Steepness of the pairwise logistic used for lambdas.
    pub sigmoid: f64,
    /// Only pairs involving the top `truncation_level` documents (by current
    /// score) of a group contribute gradients.
    pub truncation_level: usize,
}

impl Default for RankerParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            learning_rate: 0.01,
            num_leaves: 20,
            max_depth: 5,
            min_data_in_leaf: 20,
            bagging_fraction: 0.6,
            bagging_freq: 1,
            feature_fraction: 0.8,
            lambda_l2: 0.0,
            max_bin: 255,
            sigmoid: 1.0,
            truncation_level: 30,
        }
    }
}

impl RankerParams {
    /// Check that every parameter is in range.
    ///
    /// # Errors
    ///
    /// Returns [`LetorError::ConfigError`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        fn fraction(name: &str, value: f64) -> Result<()> {
            if value > 0.0 && value <= 1.0 {
                Ok(())
            } else {
                Err(LetorError::ConfigError(format!("{name} ({value}) must be in (0, 1]")))
            }
        }

        if self.n_estimators == 0 {
            return Err(LetorError::ConfigError("n_estimators must be greater than zero".into()));
        }
        if !(self.learning_rate > 0.0) {
            return Err(LetorError::ConfigError(format!(
                "learning_rate ({}) must be positive",
                self.learning_rate
            )));
        }
        if self.num_leaves < 2 {
            return Err(LetorError::ConfigError(format!(
                "num_leaves ({}) must be at least 2",
                self.num_leaves
            )));
        }
        if !(2..=256).contains(&self.max_bin) {
            return Err(LetorError::ConfigError(format!(
                "max_bin ({}) must be between 2 and 256",
                self.max_bin
            )));
        }
        if self.lambda_l2 < 0.0 || self.sigmoid <= 0.0 {
            return Err(LetorError::ConfigError(
                "lambda_l2 must be non-negative and sigmoid positive".into(),
            ));
        }
        if self.truncation_level == 0 {
            return Err(LetorError::ConfigError("truncation_level must be greater than zero".into()));
        }
        fraction("bagging_fraction", self.bagging_fraction)?;
        fraction("feature_fraction", self.feature_fraction)?;
        Ok(())
    }
}

/// Configuration for the whole training and reranking workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LetorConfig {
    /// Length of every topic vector.
    pub num_topics: usize,
    /// Synthetic negatives appended to each query group.
    pub num_negatives: usize,
    /// Seed for negative sampling and ranker bagging. `None` draws from the OS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Directory holding the persisted artifacts.
    pub artifact_dir: PathBuf,
    /// Ranker hyper-parameters.
    pub ranker: RankerParams,
}

impl Default for LetorConfig {
    fn default() -> Self {
        Self {
            num_topics: 400,
            num_negatives: 1,
            seed: None,
            artifact_dir: PathBuf::from("artifacts"),
            ranker: RankerParams::default(),
        }
    }
}

impl LetorConfig {
    /// Create a new builder for constructing a [`LetorConfig`].
    pub fn builder() -> LetorConfigBuilder {
        LetorConfigBuilder::default()
    }

    /// Load a configuration from a TOML file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`LetorError::Io`] if the file cannot be read and
    /// [`LetorError::ConfigError`] if it does not parse or validate.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| LetorError::io(path, e))?;
        let config: Self = toml::from_str(&text).map_err(|e| {
            LetorError::ConfigError(format!("invalid config file {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| LetorError::ConfigError(e.to_string()))
    }

    /// Check the configuration for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`LetorError::ConfigError`] if `num_topics == 0` or any ranker
    /// parameter is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.num_topics == 0 {
            return Err(LetorError::ConfigError("num_topics must be greater than zero".into()));
        }
        self.ranker.validate()
    }
}

/// Builder for constructing a validated [`LetorConfig`].
#[derive(Debug, Clone, Default)]
pub struct LetorConfigBuilder {
    config: LetorConfig,
}

impl LetorConfigBuilder {
    /// Set the topic vector length.
    pub fn num_topics(mut self, num_topics: usize) -> Self {
        self.config.num_topics = num_topics;
        self
    }

    /// Set the number of synthetic negatives per query group.
    pub fn num_negatives(mut self, num_negatives: usize) -> Self {
        self.config.num_negatives = num_negatives;
        self
    }

    /// Fix the random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Set the artifact directory.
    pub fn artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.artifact_dir = dir.into();
        self
    }

    /// Replace the ranker hyper-parameters.
    pub fn ranker(mut self, params: RankerParams) -> Self {
        self.config.ranker = params;
        self
    }

    /// Build the [`LetorConfig`], validating every field.
    ///
    /// # Errors
    ///
    /// Returns [`LetorError::ConfigError`] on the first invalid field.
    pub fn build(self) -> Result<LetorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = LetorConfig::builder().build().unwrap();
        assert_eq!(config.num_topics, 400);
        assert_eq!(config.num_negatives, 1);
        assert_eq!(config.ranker.n_estimators, 200);
    }

    #[test]
    fn zero_topics_is_rejected() {
        let err = LetorConfig::builder().num_topics(0).build().unwrap_err();
        assert!(matches!(err, LetorError::ConfigError(_)));
    }

    #[test]
    fn out_of_range_fraction_is_rejected() {
        let params = RankerParams { bagging_fraction: 1.5, ..RankerParams::default() };
        let err = LetorConfig::builder().ranker(params).build().unwrap_err();
        assert!(err.to_string().contains("bagging_fraction"));
    }

    #[test]
    fn partial_toml_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("letor.toml");
        std::fs::write(&path, "num_topics = 16\nseed = 7\n\n[ranker]\nn_estimators = 5\n").unwrap();

        let config = LetorConfig::from_file(&path).unwrap();
        assert_eq!(config.num_topics, 16);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.ranker.n_estimators, 5);
        assert_eq!(config.ranker.num_leaves, 20);
    }

    #[test]
    fn toml_rendering_round_trips() {
        let config = LetorConfig::builder().num_topics(8).seed(1).build().unwrap();
        let parsed: LetorConfig = toml::from_str(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
