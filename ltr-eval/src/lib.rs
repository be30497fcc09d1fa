//! Retrieval effectiveness evaluation for baseline and reranked runs.
//!
//! The harness compares each baseline [`RetrievalMethod`] with the same list
//! reordered by a [`ltr_rank::Reranker`], scoring both with rank-biased
//! precision, discounted cumulative gain and (legacy) average precision.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ltr_eval::{EvaluationConfig, EvaluationHarness, JudgmentTable, RunFileRetriever};
//!
//! let harness = EvaluationHarness::new(
//!     EvaluationConfig::default(),
//!     Arc::new(retriever),
//!     Arc::new(service),
//!     Arc::new(JudgmentTable::from_file("qrels.txt")?),
//! )?;
//! let report = harness.run(&read_benchmark_queries("queries.txt")?).await?;
//! report.publish("evaluation.txt")?;
//! ```

pub mod benchmark;
pub mod config;
pub mod error;
pub mod harness;
pub mod metrics;
pub mod qrels;
pub mod report;
pub mod retriever;

pub use benchmark::{BenchmarkQuery, read_benchmark_queries};
pub use config::{EvaluationConfig, EvaluationConfigBuilder};
pub use error::{EvalError, Result};
pub use harness::{EvaluationHarness, RERANKED_SUFFIX};
pub use metrics::{MetricScores, average_precision, dcg, mean, precision_at_k, rbp};
pub use qrels::{JudgmentTable, doc_id_from_reference};
pub use report::{EvaluationReport, QueryEvaluation, VariantSummary};
pub use retriever::{RetrievalMethod, Retriever, RunFileRetriever, ScoredDocument};
