//! Baseline retrieval seam.
//!
//! The harness only needs ranked `(score, reference)` lists per query and
//! method. [`RunFileRetriever`] serves them from TREC run files produced by
//! an external index.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::benchmark::BenchmarkQuery;
use crate::error::{EvalError, Result};

/// Baseline retrieval method.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetrievalMethod {
    /// Term-frequency / inverse-document-frequency weighting.
    TfIdf,
    /// Okapi BM25 with its two tuning parameters.
    Bm25 {
        /// Term-frequency saturation.
        k1: f64,
        /// Length normalisation.
        b: f64,
    },
}

impl RetrievalMethod {
    /// BM25 with `k1 = 1.2` and `b = 0.5`.
    pub const fn bm25() -> Self {
        Self::Bm25 { k1: 1.2, b: 0.5 }
    }

    /// Short display name, also the key a run is registered under.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TfIdf => "TF-IDF",
            Self::Bm25 { .. } => "BM25",
        }
    }
}

impl fmt::Display for RetrievalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RetrievalMethod {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tfidf" | "tf-idf" | "tf_idf" => Ok(Self::TfIdf),
            "bm25" => Ok(Self::bm25()),
            other => Err(EvalError::ConfigError(format!(
                "unknown retrieval method {other:?} (expected tfidf or bm25)"
            ))),
        }
    }
}

/// One entry of a baseline ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    /// Retriever score.
    pub score: f64,
    /// Document reference, resolvable to content and to an integer id.
    pub reference: String,
}

impl ScoredDocument {
    /// Create an entry.
    pub fn new(score: f64, reference: impl Into<String>) -> Self {
        Self { score, reference: reference.into() }
    }
}

/// Produces the baseline ranking for a query.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return at most `k` documents, best first.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Retriever`] when the method cannot serve the query.
    async fn retrieve(
        &self,
        method: &RetrievalMethod,
        query: &BenchmarkQuery,
        k: usize,
    ) -> Result<Vec<ScoredDocument>>;
}

/// Serves rankings from pre-computed TREC run files, one per method.
///
/// Run lines have the form `qid Q0 docref rank score tag`. Lists are ordered
/// by rank; equal ranks keep their file order.
#[derive(Debug, Clone, Default)]
pub struct RunFileRetriever {
    runs: HashMap<&'static str, HashMap<String, Vec<ScoredDocument>>>,
}

impl RunFileRetriever {
    /// Create a retriever with no runs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the run file for `method`, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Io`] or [`EvalError::Parse`] if the file cannot
    /// be read or a line is malformed.
    pub fn with_run_file(mut self, method: RetrievalMethod, path: impl AsRef<Path>) -> Result<Self> {
        let run = read_run_file(path.as_ref())?;
        tracing::info!(method = %method, queries = run.len(), "loaded run file");
        self.runs.insert(method.name(), run);
        Ok(self)
    }

    /// Register an in-memory ranking for one query.
    pub fn with_ranking(
        mut self,
        method: RetrievalMethod,
        query_id: impl Into<String>,
        ranking: Vec<ScoredDocument>,
    ) -> Self {
        self.runs.entry(method.name()).or_default().insert(query_id.into(), ranking);
        self
    }
}

#[async_trait]
impl Retriever for RunFileRetriever {
    async fn retrieve(
        &self,
        method: &RetrievalMethod,
        query: &BenchmarkQuery,
        k: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let run = self.runs.get(method.name()).ok_or_else(|| EvalError::Retriever {
            method: method.to_string(),
            message: "no run registered for this method".to_string(),
        })?;
        Ok(run
            .get(&query.id)
            .map(|ranking| ranking.iter().take(k).cloned().collect())
            .unwrap_or_default())
    }
}

fn read_run_file(path: &Path) -> Result<HashMap<String, Vec<ScoredDocument>>> {
    let text = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
    let mut ranked: HashMap<String, Vec<(usize, ScoredDocument)>> = HashMap::new();
    for (idx, line) in text.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < 5 {
            return Err(EvalError::parse(path, idx + 1, "expected `qid Q0 docref rank score tag`"));
        }
        let rank = fields[3].parse::<usize>().map_err(|e| {
            EvalError::parse(path, idx + 1, format!("invalid rank {:?}: {e}", fields[3]))
        })?;
        let score = fields[4].parse::<f64>().map_err(|e| {
            EvalError::parse(path, idx + 1, format!("invalid score {:?}: {e}", fields[4]))
        })?;
        ranked
            .entry(fields[0].to_string())
            .or_default()
            .push((rank, ScoredDocument::new(score, fields[2])));
    }
    Ok(ranked
        .into_iter()
        .map(|(qid, mut entries)| {
            entries.sort_by_key(|(rank, _)| *rank);
            (qid, entries.into_iter().map(|(_, doc)| doc).collect())
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_method_names() {
        assert_eq!("bm25".parse::<RetrievalMethod>().unwrap(), RetrievalMethod::bm25());
        assert_eq!("TF-IDF".parse::<RetrievalMethod>().unwrap(), RetrievalMethod::TfIdf);
        assert!("dense".parse::<RetrievalMethod>().is_err());
    }

    #[tokio::test]
    async fn run_file_is_ordered_by_rank_and_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bm25.run");
        std::fs::write(
            &path,
            "Q1 Q0 c/9.txt 3 7.2 bm25\nQ1 Q0 c/3.txt 1 9.1 bm25\nQ1 Q0 c/5.txt 2 8.0 bm25\n\nQ2 Q0 c/1.txt 1 1.0 bm25\n",
        )
        .unwrap();
        let retriever = RunFileRetriever::new().with_run_file(RetrievalMethod::bm25(), &path).unwrap();
        let q1 = BenchmarkQuery::new("Q1", "text");

        let all = retriever.retrieve(&RetrievalMethod::bm25(), &q1, 10).await.unwrap();
        let refs: Vec<&str> = all.iter().map(|d| d.reference.as_str()).collect();
        assert_eq!(refs, ["c/3.txt", "c/5.txt", "c/9.txt"]);
        assert_eq!(all[0].score, 9.1);

        let top = retriever.retrieve(&RetrievalMethod::bm25(), &q1, 2).await.unwrap();
        assert_eq!(top.len(), 2);

        let unknown = BenchmarkQuery::new("Q7", "text");
        assert!(retriever.retrieve(&RetrievalMethod::bm25(), &unknown, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unregistered_method_is_an_error() {
        let retriever = RunFileRetriever::new();
        let err = retriever
            .retrieve(&RetrievalMethod::TfIdf, &BenchmarkQuery::new("Q1", ""), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::Retriever { .. }));
    }

    #[test]
    fn short_run_line_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tfidf.run");
        std::fs::write(&path, "Q1 Q0 c/9.txt\n").unwrap();
        let err = RunFileRetriever::new().with_run_file(RetrievalMethod::TfIdf, &path).unwrap_err();
        assert!(matches!(err, EvalError::Parse { line: 1, .. }));
    }
}
