//! Reranking service.
//!
//! [`LetorService`] owns the two trained artifacts and a [`DocumentSource`]
//! and is constructed once at start-up, then shared (it is cheap to clone)
//! with every request handler. Either artifact may be absent; scoring then
//! fails with [`LetorError::ModelUnavailable`] instead of guessing.
//!
//! # Example
//!
//! ```rust,ignore
//! use ltr_rank::{ArtifactStore, FsDocumentSource, LetorService, Reranker};
//!
//! let service = LetorService::open(
//!     &ArtifactStore::new("artifacts"),
//!     Arc::new(FsDocumentSource::new("collections")),
//! )?;
//! let outcome = service.rerank("query text", candidates).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::artifact::ArtifactStore;
use crate::document::{Candidate, RankedDocument, tokenize};
use crate::error::{LetorError, Result};
use crate::features::FeatureExtractor;
use crate::ranker::ScoringModel;
use crate::reranker::{RerankOutcome, Reranker};
use crate::source::DocumentSource;
use crate::topic::TopicProjection;
use crate::training::TrainedModels;

/// Feature extraction plus ranker scoring over candidate documents.
#[derive(Clone)]
pub struct LetorService {
    topic_model: Option<Arc<dyn TopicProjection>>,
    ranker: Option<Arc<dyn ScoringModel>>,
    source: Arc<dyn DocumentSource>,
}

impl std::fmt::Debug for LetorService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LetorService")
            .field("topic_model", &self.topic_model.is_some())
            .field("ranker", &self.ranker.is_some())
            .finish_non_exhaustive()
    }
}

impl LetorService {
    /// Create a new [`LetorServiceBuilder`].
    pub fn builder() -> LetorServiceBuilder {
        LetorServiceBuilder::default()
    }

    /// Load whatever artifacts exist in `store`.
    ///
    /// Absent artifacts are logged and left empty; the service still starts.
    ///
    /// # Errors
    ///
    /// Returns [`LetorError::Artifact`] if an artifact exists but is corrupt.
    pub fn open(store: &ArtifactStore, source: Arc<dyn DocumentSource>) -> Result<Self> {
        let mut builder = Self::builder().document_source(source);
        match store.load_topic_model()? {
            Some(model) => builder = builder.topic_model(Arc::new(model)),
            None => warn!(path = %store.topic_model_path().display(), "topic model not trained yet"),
        }
        match store.load_ranker()? {
            Some(ranker) => builder = builder.ranker(Arc::new(ranker)),
            None => warn!(path = %store.ranker_path().display(), "ranker not trained yet"),
        }
        let service = builder.build()?;
        info!(ready = service.is_ready(), "letor service opened");
        Ok(service)
    }

    /// Wrap freshly trained models.
    pub fn from_trained(models: TrainedModels, source: Arc<dyn DocumentSource>) -> Self {
        Self {
            topic_model: Some(Arc::new(models.topic_model)),
            ranker: Some(Arc::new(models.ranker)),
            source,
        }
    }

    /// Whether both artifacts are present.
    pub fn is_ready(&self) -> bool {
        self.topic_model.is_some() && self.ranker.is_some()
    }

    fn models(&self) -> Result<(&dyn TopicProjection, &dyn ScoringModel)> {
        let topics = self
            .topic_model
            .as_deref()
            .ok_or(LetorError::ModelUnavailable { artifact: "topic model" })?;
        let ranker =
            self.ranker.as_deref().ok_or(LetorError::ModelUnavailable { artifact: "ranker" })?;
        Ok((topics, ranker))
    }

    /// Score already-tokenized documents against a tokenized query.
    ///
    /// # Errors
    ///
    /// Returns [`LetorError::ModelUnavailable`] if either artifact is absent
    /// and [`LetorError::InvalidInput`] if the artifacts disagree on width.
    pub fn score(&self, query: &[String], docs: &[Vec<String>]) -> Result<Vec<f64>> {
        let (topics, ranker) = self.models()?;
        let extractor = FeatureExtractor::new(topics);
        if extractor.dimensions() != ranker.num_features() {
            return Err(LetorError::InvalidInput(format!(
                "topic model yields {} features but the ranker expects {}",
                extractor.dimensions(),
                ranker.num_features()
            )));
        }
        let rows: Vec<Vec<f32>> = docs.iter().map(|doc| extractor.features(query, doc)).collect();
        ranker.predict(&rows)
    }

    /// Rerank candidates for an already-tokenized query.
    ///
    /// Candidates whose content cannot be loaded are dropped and reported in
    /// [`RerankOutcome::skipped`]. Ties keep their input order.
    ///
    /// # Errors
    ///
    /// Returns [`LetorError::ModelUnavailable`] if a non-empty list is
    /// submitted before both artifacts are available.
    pub async fn rerank_tokens(
        &self,
        query: &[String],
        candidates: Vec<Candidate>,
    ) -> Result<RerankOutcome> {
        if candidates.is_empty() {
            return Ok(RerankOutcome::default());
        }
        self.models()?;

        let loaded =
            join_all(candidates.iter().map(|c| self.source.load(&c.reference))).await;
        let mut references = Vec::with_capacity(candidates.len());
        let mut docs = Vec::with_capacity(candidates.len());
        let mut skipped = Vec::new();
        for (candidate, result) in candidates.into_iter().zip(loaded) {
            match result {
                Ok(tokens) => {
                    references.push(candidate.reference);
                    docs.push(tokens);
                }
                Err(e) => {
                    warn!(reference = %candidate.reference, error = %e, "skipping candidate");
                    skipped.push(candidate.reference);
                }
            }
        }

        let scores = self.score(query, &docs)?;
        let mut ranked: Vec<RankedDocument> = references
            .into_iter()
            .zip(scores)
            .map(|(reference, score)| RankedDocument { reference, score })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

        debug!(ranked = ranked.len(), skipped = skipped.len(), "reranked candidates");
        Ok(RerankOutcome { ranked, skipped })
    }
}

#[async_trait]
impl Reranker for LetorService {
    async fn rerank(&self, query: &str, candidates: Vec<Candidate>) -> Result<RerankOutcome> {
        self.rerank_tokens(&tokenize(query), candidates).await
    }
}

/// Builder for constructing a [`LetorService`].
///
/// Only the document source is required; the artifacts are optional.
#[derive(Default)]
pub struct LetorServiceBuilder {
    topic_model: Option<Arc<dyn TopicProjection>>,
    ranker: Option<Arc<dyn ScoringModel>>,
    source: Option<Arc<dyn DocumentSource>>,
}

impl LetorServiceBuilder {
    /// Set the topic model.
    pub fn topic_model(mut self, model: Arc<dyn TopicProjection>) -> Self {
        self.topic_model = Some(model);
        self
    }

    /// Set the ranker.
    pub fn ranker(mut self, ranker: Arc<dyn ScoringModel>) -> Self {
        self.ranker = Some(ranker);
        self
    }

    /// Set the document source used to load candidate content.
    pub fn document_source(mut self, source: Arc<dyn DocumentSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Build the [`LetorService`].
    ///
    /// # Errors
    ///
    /// Returns [`LetorError::ConfigError`] if no document source was set.
    pub fn build(self) -> Result<LetorService> {
        let source = self
            .source
            .ok_or_else(|| LetorError::ConfigError("document_source is required".to_string()))?;
        Ok(LetorService { topic_model: self.topic_model, ranker: self.ranker, source })
    }
}
