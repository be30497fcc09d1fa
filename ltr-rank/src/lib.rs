//! Learning-to-rank reranking for retrieval candidates.
//!
//! This crate turns a baseline candidate list into a reranked one:
//!
//! - [`LsiModel`] projects token sequences into a fixed-length topic space
//! - [`FeatureExtractor`] builds `[query topics, doc topics, jaccard, cosine distance]` rows
//! - [`TrainingSetBuilder`] groups judged pairs per query and adds random negatives
//! - [`LambdaMart`] learns a listwise scoring function over those rows
//! - [`LetorService`] loads candidates through a [`DocumentSource`] and reorders them
//!
//! Training happens once, offline ([`train_from_files`]); the resulting
//! artifacts are persisted by [`ArtifactStore`] and are read-only afterwards.

pub mod artifact;
pub mod config;
pub mod corpus;
pub mod dataset;
pub mod dictionary;
pub mod document;
pub mod error;
pub mod features;
mod lambdarank;
mod linalg;
pub mod ranker;
pub mod reranker;
pub mod service;
pub mod source;
pub mod topic;
pub mod training;
mod tree;

pub use artifact::ArtifactStore;
pub use config::{LetorConfig, LetorConfigBuilder, RankerParams};
pub use corpus::{read_graded_judgments, read_token_table};
pub use dataset::{LabeledExample, TrainingSet, TrainingSetBuilder};
pub use dictionary::Dictionary;
pub use document::{Candidate, GradedJudgment, RankedDocument, TokenTable, tokenize};
pub use error::{LetorError, Result};
pub use features::{FeatureExtractor, cosine_distance, feature_dimensions, jaccard};
pub use lambdarank::{mean_ndcg, ndcg_at};
pub use ranker::{LambdaMart, ScoringModel};
pub use reranker::{NoOpReranker, RerankOutcome, Reranker};
pub use service::{LetorService, LetorServiceBuilder};
pub use source::{DocumentSource, FsDocumentSource, InMemoryDocumentSource};
pub use topic::{LsiModel, TopicProjection};
pub use training::{TrainedModels, TrainingSummary, train, train_from_files};
