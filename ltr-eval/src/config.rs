//! Evaluation run configuration.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::retriever::RetrievalMethod;

/// Settings for one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Documents requested from the retriever per query.
    pub depth: usize,
    /// Persistence parameter of rank-biased precision.
    pub rbp_p: f64,
    /// Pad short relevance vectors with zeros up to `depth`.
    ///
    /// Padding changes precision and AP, so it is off by default.
    pub pad_to_depth: bool,
    /// Queries evaluated concurrently.
    pub concurrency: usize,
    /// Where the plain-text report is written.
    pub report_path: PathBuf,
    /// Baseline methods, each evaluated with and without reranking.
    pub methods: Vec<RetrievalMethod>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            depth: 1000,
            rbp_p: 0.8,
            pad_to_depth: false,
            concurrency: 1,
            report_path: PathBuf::from("evaluation.txt"),
            methods: vec![RetrievalMethod::TfIdf, RetrievalMethod::bm25()],
        }
    }
}

impl EvaluationConfig {
    /// Create a new builder for constructing an [`EvaluationConfig`].
    pub fn builder() -> EvaluationConfigBuilder {
        EvaluationConfigBuilder::default()
    }

    /// Load a configuration from a TOML file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Io`] if the file cannot be read and
    /// [`EvalError::ConfigError`] if it does not parse or validate.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
        let config: Self = toml::from_str(&text).map_err(|e| {
            EvalError::ConfigError(format!("invalid config file {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| EvalError::ConfigError(e.to_string()))
    }

    /// Check the configuration for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ConfigError`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.depth == 0 {
            return Err(EvalError::ConfigError("depth must be greater than zero".into()));
        }
        if !(self.rbp_p > 0.0 && self.rbp_p < 1.0) {
            return Err(EvalError::ConfigError(format!(
                "rbp_p ({}) must be in (0, 1)",
                self.rbp_p
            )));
        }
        if self.concurrency == 0 {
            return Err(EvalError::ConfigError("concurrency must be at least 1".into()));
        }
        if self.methods.is_empty() {
            return Err(EvalError::ConfigError("at least one retrieval method is required".into()));
        }
        // Runs and report blocks are keyed by method name.
        let mut seen = HashSet::new();
        if let Some(dup) = self.methods.iter().find(|m| !seen.insert(m.name())) {
            return Err(EvalError::ConfigError(format!(
                "retrieval method {dup} is configured more than once"
            )));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`EvaluationConfig`].
#[derive(Debug, Clone, Default)]
pub struct EvaluationConfigBuilder {
    config: EvaluationConfig,
}

impl EvaluationConfigBuilder {
    /// Set the retrieval depth.
    pub fn depth(mut self, depth: usize) -> Self {
        self.config.depth = depth;
        self
    }

    /// Set the RBP persistence parameter.
    pub fn rbp_p(mut self, p: f64) -> Self {
        self.config.rbp_p = p;
        self
    }

    /// Enable or disable zero padding up to the depth.
    pub fn pad_to_depth(mut self, pad: bool) -> Self {
        self.config.pad_to_depth = pad;
        self
    }

    /// Set how many queries run concurrently.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Set the report location.
    pub fn report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.report_path = path.into();
        self
    }

    /// Replace the evaluated methods.
    pub fn methods(mut self, methods: impl IntoIterator<Item = RetrievalMethod>) -> Self {
        self.config.methods = methods.into_iter().collect();
        self
    }

    /// Build the [`EvaluationConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ConfigError`] on the first invalid field.
    pub fn build(self) -> Result<EvaluationConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_legacy_run() {
        let config = EvaluationConfig::builder().build().unwrap();
        assert_eq!(config.depth, 1000);
        assert_eq!(config.rbp_p, 0.8);
        assert!(!config.pad_to_depth);
        assert_eq!(config.methods, vec![RetrievalMethod::TfIdf, RetrievalMethod::Bm25 { k1: 1.2, b: 0.5 }]);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(EvaluationConfig::builder().depth(0).build().is_err());
        assert!(EvaluationConfig::builder().rbp_p(1.0).build().is_err());
        assert!(EvaluationConfig::builder().concurrency(0).build().is_err());
        let err = EvaluationConfig::builder().methods(Vec::new()).build().unwrap_err();
        assert!(err.to_string().contains("retrieval method"));
    }

    #[test]
    fn same_method_twice_is_rejected() {
        let err = EvaluationConfig::builder()
            .methods([RetrievalMethod::bm25(), RetrievalMethod::Bm25 { k1: 0.9, b: 0.4 }])
            .build()
            .unwrap_err();
        assert!(matches!(err, EvalError::ConfigError(_)));
        assert!(err.to_string().contains("BM25"));

        let ok = EvaluationConfig::builder()
            .methods([RetrievalMethod::TfIdf, RetrievalMethod::Bm25 { k1: 0.9, b: 0.4 }])
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn rendered_toml_reloads() {
        let config = EvaluationConfig::builder().depth(50).report_path("out/eval.txt").build().unwrap();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[[methods]]"));
        let back: EvaluationConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn toml_file_with_methods() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eval.toml");
        std::fs::write(
            &path,
            "depth = 100\nconcurrency = 4\n\n[[methods]]\nkind = \"bm25\"\nk1 = 0.9\nb = 0.4\n",
        )
        .unwrap();
        let config = EvaluationConfig::from_file(&path).unwrap();
        assert_eq!(config.depth, 100);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.rbp_p, 0.8);
        assert_eq!(config.methods, vec![RetrievalMethod::Bm25 { k1: 0.9, b: 0.4 }]);
    }
}
