//! Error types for the `ltr-rank` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while training or applying the reranker.
#[derive(Debug, Error)]
pub enum LetorError {
    /// Scoring was attempted before the named artifact was trained or loaded.
    #[error("Model unavailable: {artifact} has not been trained or loaded")]
    ModelUnavailable {
        /// Which artifact is missing (`"topic model"` or `"ranker"`).
        artifact: &'static str,
    },

    /// A required input file could not be read.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A required input file is malformed.
    #[error("Parse error in {}:{line}: {message}", path.display())]
    Parse {
        /// The offending file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// A description of the problem.
        message: String,
    },

    /// A persisted artifact exists but could not be read or written.
    #[error("Artifact error ({}): {message}", path.display())]
    Artifact {
        /// Location of the artifact.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Training could not proceed with the supplied data.
    #[error("Training error: {0}")]
    TrainingError(String),

    /// A candidate document's content could not be loaded.
    #[error("Document load error ({reference}): {message}")]
    DocumentLoad {
        /// The document reference that failed.
        reference: String,
        /// A description of the failure.
        message: String,
    },

    /// Caller supplied inputs with inconsistent shapes.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl LetorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn artifact(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Artifact { path: path.into(), message: message.to_string() }
    }

    /// Returns `true` for the "not trained" failure, which callers surface
    /// instead of treating as a per-item skip.
    pub fn is_model_unavailable(&self) -> bool {
        matches!(self, Self::ModelUnavailable { .. })
    }
}

/// A convenience result type for reranking operations.
pub type Result<T> = std::result::Result<T, LetorError>;
