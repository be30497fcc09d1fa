//! Error types for the `ltr-eval` crate.

use std::path::PathBuf;

use ltr_rank::LetorError;
use thiserror::Error;

/// Errors that can occur while running an evaluation.
#[derive(Debug, Error)]
pub enum EvalError {
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

    /// The baseline retriever failed for one method.
    #[error("Retriever error ({method}): {message}")]
    Retriever {
        /// The retrieval method that failed.
        method: String,
        /// A description of the failure.
        message: String,
    },

    /// The reranker failed in a way that affects every query.
    #[error(transparent)]
    Rerank(#[from] LetorError),

    /// The report could not be written.
    #[error("Failed to write report to {}: {source}", path.display())]
    Report {
        /// The report location.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl EvalError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse { path: path.into(), line, message: message.into() }
    }
}

/// A convenience result type for evaluation operations.
pub type Result<T> = std::result::Result<T, EvalError>;
