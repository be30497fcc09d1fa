//! Aggregated evaluation results and their plain-text rendering.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::{EvalError, Result};
use crate::metrics::MetricScores;

/// Scores of one ranked list for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryEvaluation {
    /// Benchmark query id.
    pub query_id: String,
    /// Variant label, e.g. `BM25` or `BM25 + letor`.
    pub label: String,
    /// Length of the evaluated list.
    pub depth: usize,
    /// Candidates the reranker dropped because their content failed to load.
    pub skipped: usize,
    /// Metric values for the list.
    pub scores: MetricScores,
}

/// Mean scores of one variant across all queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantSummary {
    /// Variant label.
    pub label: String,
    /// Queries that contributed.
    pub queries: usize,
    /// Candidates skipped across all queries.
    pub skipped: usize,
    /// Component-wise means.
    pub mean: MetricScores,
}

/// The outcome of an evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// One summary per variant, in evaluation order.
    pub variants: Vec<VariantSummary>,
    /// Every per-query score, in query order.
    pub per_query: Vec<QueryEvaluation>,
}

impl EvaluationReport {
    /// Aggregate per-query results under the given variant labels.
    ///
    /// Every label in `labels` gets a summary, in that order, even when no
    /// query contributed to it (all means are then 0.0). Labels that only
    /// occur in `per_query` follow in first-seen order.
    pub fn from_evaluations(
        labels: impl IntoIterator<Item = String>,
        per_query: Vec<QueryEvaluation>,
    ) -> Self {
        let mut grouped: Vec<(String, Vec<MetricScores>, usize)> =
            labels.into_iter().map(|label| (label, Vec::new(), 0)).collect();
        for evaluation in &per_query {
            match grouped.iter_mut().find(|(label, _, _)| *label == evaluation.label) {
                Some((_, scores, skipped)) => {
                    scores.push(evaluation.scores);
                    *skipped += evaluation.skipped;
                }
                None => grouped.push((
                    evaluation.label.clone(),
                    vec![evaluation.scores],
                    evaluation.skipped,
                )),
            }
        }
        let variants = grouped
            .into_iter()
            .map(|(label, scores, skipped)| VariantSummary {
                label,
                queries: scores.len(),
                skipped,
                mean: MetricScores::mean_of(&scores),
            })
            .collect();
        Self { variants, per_query }
    }

    /// Summary for one variant label.
    pub fn variant(&self, label: &str) -> Option<&VariantSummary> {
        self.variants.iter().find(|v| v.label == label)
    }

    /// Write the plain-text report to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Report`] if the file cannot be written.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_string())
            .map_err(|source| EvalError::Report { path: path.to_path_buf(), source })?;
        tracing::info!(path = %path.display(), variants = self.variants.len(), "wrote evaluation report");
        Ok(())
    }

    /// Write the report to `path` and echo it to standard output.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Report`] if the file cannot be written.
    pub fn publish(&self, path: impl AsRef<Path>) -> Result<()> {
        self.write_to(path)?;
        print!("{self}");
        Ok(())
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, variant) in self.variants.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "Evaluation of {} over {} queries", variant.label, variant.queries)?;
            writeln!(f, "RBP score = {}", variant.mean.rbp)?;
            writeln!(f, "DCG score = {}", variant.mean.dcg)?;
            writeln!(f, "AP score = {}", variant.mean.ap)?;
        }
        Ok(())
    }
}
