//! Resolution of candidate document references into token sequences.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::document::tokenize;
use crate::error::{LetorError, Result};

/// Loads the content of a document reference as tokens.
///
/// # Example
///
/// ```rust,ignore
/// use ltr_rank::{DocumentSource, FsDocumentSource};
///
/// let source = FsDocumentSource::new("collections");
/// let tokens = source.load("1/5.txt").await?;
/// ```
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Load and tokenize one document.
    ///
    /// # Errors
    ///
    /// Returns [`LetorError::DocumentLoad`] if the reference cannot be resolved.
    async fn load(&self, reference: &str) -> Result<Vec<String>>;
}

/// Reads documents from files under a root directory.
///
/// References are paths relative to the root (absolute references are used
/// as-is). Content is split on whitespace.
#[derive(Debug, Clone)]
pub struct FsDocumentSource {
    root: PathBuf,
}

impl FsDocumentSource {
    /// Create a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DocumentSource for FsDocumentSource {
    async fn load(&self, reference: &str) -> Result<Vec<String>> {
        let path = self.root.join(reference);
        let text = tokio::fs::read_to_string(&path).await.map_err(|e| LetorError::DocumentLoad {
            reference: reference.to_string(),
            message: format!("{}: {e}", path.display()),
        })?;
        Ok(tokenize(&text))
    }
}

/// A fixed map of reference -> tokens. Suitable for tests and small demos.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentSource {
    documents: HashMap<String, Vec<String>>,
}

impl InMemoryDocumentSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document from raw text.
    pub fn with_text(mut self, reference: impl Into<String>, text: &str) -> Self {
        self.documents.insert(reference.into(), tokenize(text));
        self
    }
}

#[async_trait]
impl DocumentSource for InMemoryDocumentSource {
    async fn load(&self, reference: &str) -> Result<Vec<String>> {
        self.documents.get(reference).cloned().ok_or_else(|| LetorError::DocumentLoad {
            reference: reference.to_string(),
            message: "unknown document".to_string(),
        })
    }
}
