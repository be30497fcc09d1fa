//! Offline training: topic model, grouped training set, then the ranker.

use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::config::LetorConfig;
use crate::corpus::{read_graded_judgments, read_token_table};
use crate::dataset::TrainingSetBuilder;
use crate::document::{GradedJudgment, TokenTable};
use crate::error::{LetorError, Result};
use crate::features::FeatureExtractor;
use crate::ranker::LambdaMart;
use crate::topic::LsiModel;

/// Counts describing one training run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingSummary {
    /// Query groups in the training set.
    pub groups: usize,
    /// Examples including synthetic negatives.
    pub examples: usize,
    /// Judgment rows dropped for unknown ids.
    pub dropped_rows: usize,
    /// Mean training NDCG@10 of the final ensemble.
    pub train_ndcg: f64,
}

/// The two artifacts produced by a training run.
#[derive(Debug, Clone)]
pub struct TrainedModels {
    /// Fitted topic model.
    pub topic_model: LsiModel,
    /// Trained ranker.
    pub ranker: LambdaMart,
    /// Run statistics.
    pub summary: TrainingSummary,
}

/// Train both artifacts from in-memory tables.
///
/// The topic model is fitted on the document table, then every judged pair
/// plus the synthetic negatives is featurised and fed to LambdaMART.
///
/// # Errors
///
/// Returns [`LetorError::TrainingError`] if the document table is empty or
/// no judgment row resolves, plus any error from fitting or validation.
pub fn train(
    config: &LetorConfig,
    queries: &TokenTable,
    documents: &TokenTable,
    judgments: &[GradedJudgment],
) -> Result<TrainedModels> {
    config.validate()?;
    if documents.is_empty() {
        return Err(LetorError::TrainingError("document table is empty".into()));
    }

    let topic_model =
        LsiModel::fit(documents.iter().map(|(_, tokens)| tokens), config.num_topics, config.seed)?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let builder = TrainingSetBuilder::new(FeatureExtractor::new(&topic_model), config.num_negatives);
    let set = builder.build(judgments, queries, documents, &mut rng);
    if set.group_sizes.is_empty() {
        return Err(LetorError::TrainingError(format!(
            "none of the {} judgment rows matched the query and document tables",
            judgments.len()
        )));
    }

    let ranker = LambdaMart::train(
        &set.feature_rows(),
        &set.labels(),
        &set.group_sizes,
        &config.ranker,
        config.seed,
    )?;

    let summary = TrainingSummary {
        groups: set.group_sizes.len(),
        examples: set.examples.len(),
        dropped_rows: set.dropped_rows,
        train_ndcg: ranker.train_ndcg(),
    };
    info!(?summary, "training finished");
    Ok(TrainedModels { topic_model, ranker, summary })
}

/// Read the three training files and [`train`].
///
/// # Errors
///
/// Any read or parse failure is fatal, as are the errors of [`train`].
pub fn train_from_files(
    config: &LetorConfig,
    queries: impl AsRef<Path>,
    documents: impl AsRef<Path>,
    judgments: impl AsRef<Path>,
) -> Result<TrainedModels> {
    let queries = read_token_table(queries)?;
    let documents = read_token_table(documents)?;
    let judgments = read_graded_judgments(judgments)?;
    info!(
        queries = queries.len(),
        documents = documents.len(),
        judgments = judgments.len(),
        "loaded training inputs"
    );
    train(config, &queries, &documents, &judgments)
}
