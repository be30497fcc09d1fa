//! Reranker trait for re-scoring retrieved candidates.

use async_trait::async_trait;

use crate::document::{Candidate, RankedDocument};
use crate::error::Result;

/// The result of reranking one candidate list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RerankOutcome {
    /// Candidates in their new order, best first.
    pub ranked: Vec<RankedDocument>,
    /// References that were dropped because their content could not be loaded.
    pub skipped: Vec<String>,
}

/// A reranker that re-scores and reorders retrieved candidates.
///
/// Implementations must return candidates in strictly non-increasing score
/// order with ties kept in input order, return an empty outcome for an empty
/// input, and drop (not fail on) individual candidates that cannot be loaded.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Rerank `candidates` for the raw query text.
    async fn rerank(&self, query: &str, candidates: Vec<Candidate>) -> Result<RerankOutcome>;
}

/// A no-op reranker that keeps the retriever's order and scores.
///
/// # Example
///
/// ```rust,ignore
/// use ltr_rank::NoOpReranker;
///
/// let outcome = NoOpReranker.rerank("query", candidates).await?;
/// // same order, baseline scores
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReranker;

#[async_trait]
impl Reranker for NoOpReranker {
    async fn rerank(&self, _query: &str, candidates: Vec<Candidate>) -> Result<RerankOutcome> {
        let ranked = candidates
            .into_iter()
            .map(|c| RankedDocument { reference: c.reference, score: c.baseline_score })
            .collect();
        Ok(RerankOutcome { ranked, skipped: Vec::new() })
    }
}
