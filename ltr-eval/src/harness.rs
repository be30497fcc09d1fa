//! Evaluation harness: baseline versus reranked effectiveness.
//!
//! For every benchmark query and configured method the harness retrieves a
//! baseline list, reranks it, maps both lists to relevance vectors through
//! the [`JudgmentTable`] and scores them. Queries are independent and may be
//! evaluated concurrently; the report keeps query order regardless.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use ltr_rank::{Candidate, Reranker};
use tracing::{debug, info, warn};

use crate::benchmark::BenchmarkQuery;
use crate::config::EvaluationConfig;
use crate::error::{EvalError, Result};
use crate::metrics::MetricScores;
use crate::qrels::JudgmentTable;
use crate::report::{EvaluationReport, QueryEvaluation};
use crate::retriever::{RetrievalMethod, Retriever, ScoredDocument};

/// Suffix appended to a method name for its reranked variant.
pub const RERANKED_SUFFIX: &str = " + letor";

/// Runs baseline and reranked evaluations over a benchmark.
#[derive(Clone)]
pub struct EvaluationHarness {
    config: EvaluationConfig,
    retriever: Arc<dyn Retriever>,
    reranker: Arc<dyn Reranker>,
    judgments: Arc<JudgmentTable>,
}

impl EvaluationHarness {
    /// Create a harness.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ConfigError`] if `config` does not validate.
    pub fn new(
        config: EvaluationConfig,
        retriever: Arc<dyn Retriever>,
        reranker: Arc<dyn Reranker>,
        judgments: Arc<JudgmentTable>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, retriever, reranker, judgments })
    }

    /// The active configuration.
    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Evaluate every query and aggregate the results.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Rerank`] if the reranker reports that its models
    /// are unavailable. Every other per-query failure is logged and scored as
    /// an empty ranking.
    pub async fn run(&self, queries: &[BenchmarkQuery]) -> Result<EvaluationReport> {
        info!(
            queries = queries.len(),
            methods = self.config.methods.len(),
            depth = self.config.depth,
            "starting evaluation"
        );
        let per_query: Vec<Vec<QueryEvaluation>> = stream::iter(queries)
            .map(|query| self.evaluate_query(query))
            .buffered(self.config.concurrency)
            .try_collect()
            .await?;
        let labels = self
            .config
            .methods
            .iter()
            .flat_map(|method| [method.name().to_string(), format!("{method}{RERANKED_SUFFIX}")]);
        let report =
            EvaluationReport::from_evaluations(labels, per_query.into_iter().flatten().collect());
        info!(variants = report.variants.len(), "evaluation finished");
        Ok(report)
    }

    /// Evaluate one query under every configured method, baseline first.
    ///
    /// # Errors
    ///
    /// See [`EvaluationHarness::run`].
    pub async fn evaluate_query(&self, query: &BenchmarkQuery) -> Result<Vec<QueryEvaluation>> {
        let mut evaluations = Vec::with_capacity(self.config.methods.len() * 2);
        for method in &self.config.methods {
            let baseline = self.baseline(method, query).await;
            let (reranked, skipped) = self.rerank(method, query, &baseline).await?;
            let baseline_refs: Vec<&str> = baseline.iter().map(|d| d.reference.as_str()).collect();
            let reranked_refs: Vec<&str> = reranked.iter().map(String::as_str).collect();

            evaluations.push(self.score(query, method.name().to_string(), &baseline_refs, 0));
            evaluations.push(self.score(
                query,
                format!("{method}{RERANKED_SUFFIX}"),
                &reranked_refs,
                skipped,
            ));
        }
        Ok(evaluations)
    }

    async fn baseline(&self, method: &RetrievalMethod, query: &BenchmarkQuery) -> Vec<ScoredDocument> {
        match self.retriever.retrieve(method, query, self.config.depth).await {
            Ok(mut docs) => {
                docs.truncate(self.config.depth);
                docs
            }
            Err(e) => {
                warn!(query_id = %query.id, method = %method, error = %e, "baseline retrieval failed");
                Vec::new()
            }
        }
    }

    async fn rerank(
        &self,
        method: &RetrievalMethod,
        query: &BenchmarkQuery,
        baseline: &[ScoredDocument],
    ) -> Result<(Vec<String>, usize)> {
        let candidates =
            baseline.iter().map(|d| Candidate::new(d.reference.clone(), d.score)).collect();
        match self.reranker.rerank(&query.text, candidates).await {
            Ok(outcome) => {
                let skipped = outcome.skipped.len();
                if skipped > 0 {
                    warn!(query_id = %query.id, method = %method, skipped, "reranker skipped candidates");
                }
                Ok((outcome.ranked.into_iter().map(|d| d.reference).collect(), skipped))
            }
            Err(e) if e.is_model_unavailable() => Err(EvalError::Rerank(e)),
            Err(e) => {
                warn!(query_id = %query.id, method = %method, error = %e, "reranking failed");
                Ok((Vec::new(), 0))
            }
        }
    }

    fn score(
        &self,
        query: &BenchmarkQuery,
        label: String,
        references: &[&str],
        skipped: usize,
    ) -> QueryEvaluation {
        let mut relevance = self.judgments.relevance_vector(&query.id, references.iter().copied());
        if self.config.pad_to_depth {
            relevance.resize(self.config.depth, 0);
        }
        let scores = MetricScores::compute(&relevance, self.config.rbp_p);
        debug!(query_id = %query.id, label = %label, rbp = scores.rbp, dcg = scores.dcg, ap = scores.ap, "scored list");
        QueryEvaluation { query_id: query.id.clone(), label, depth: relevance.len(), skipped, scores }
    }
}
