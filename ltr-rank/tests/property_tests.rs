//! Property tests for topic vectors, training-set grouping, and rerank ordering.

use std::sync::Arc;

use ltr_rank::{
    Candidate, FeatureExtractor, GradedJudgment, InMemoryDocumentSource, LetorService,
    LsiModel, Result, ScoringModel, TokenTable, TopicProjection, TrainingSetBuilder,
    feature_dimensions,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn arb_tokens(max: usize) -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-f]{1,2}", 0..max)
}

fn arb_table(prefix: &'static str, max: usize) -> impl Strategy<Value = TokenTable> {
    proptest::collection::vec(arb_tokens(8), 1..max).prop_map(move |docs| {
        docs.into_iter().enumerate().map(|(i, t)| (format!("{prefix}{i}"), t)).collect()
    })
}

/// **Property: topic vector length**
/// *For any* corpus and any input (empty, single token, long), `project`
/// SHALL return exactly `num_topics` values.
mod prop_topic_vector_length {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(40))]

        #[test]
        fn projection_length_is_fixed(
            corpus in proptest::collection::vec(arb_tokens(10), 0..12),
            input in arb_tokens(200),
            num_topics in 1usize..24,
        ) {
            let model = LsiModel::fit(corpus.iter().map(Vec::as_slice), num_topics, Some(9)).unwrap();
            prop_assert_eq!(model.project(&input).len(), num_topics);
            prop_assert_eq!(model.project(&[]).len(), num_topics);
            prop_assert_eq!(model.project(&input[..input.len().min(1)]).len(), num_topics);
            prop_assert!(model.project(&input).iter().all(|x| x.is_finite()));
        }
    }
}

/// **Property: group sizes line up with examples**
/// *For any* judgments and tables, the group sizes SHALL sum to the example
/// count and each group SHALL hold its resolvable judged rows plus one negative.
mod prop_training_set_grouping {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(60))]

        #[test]
        fn group_sizes_sum_to_examples(
            queries in arb_table("Q", 5),
            docs in arb_table("D", 8),
            rows in proptest::collection::vec((0usize..7, 0usize..10, 0u32..3), 0..30),
        ) {
            let judgments: Vec<GradedJudgment> = rows
                .iter()
                .map(|&(q, d, g)| GradedJudgment::new(format!("Q{q}"), format!("D{d}"), g))
                .collect();
            let corpus: Vec<&[String]> = docs.iter().map(|(_, t)| t).collect();
            let model = LsiModel::fit(corpus, 3, Some(1)).unwrap();
            let builder = TrainingSetBuilder::new(FeatureExtractor::new(&model), 1);
            let set = builder.build(&judgments, &queries, &docs, &mut StdRng::seed_from_u64(4));

            prop_assert_eq!(set.group_sizes.iter().sum::<usize>(), set.examples.len());

            let resolvable: Vec<&GradedJudgment> = judgments
                .iter()
                .filter(|j| queries.contains(&j.query_id) && docs.contains(&j.doc_id))
                .collect();
            prop_assert_eq!(set.dropped_rows, judgments.len() - resolvable.len());

            let mut first_seen: Vec<&str> = Vec::new();
            for j in &resolvable {
                if !first_seen.contains(&j.query_id.as_str()) {
                    first_seen.push(&j.query_id);
                }
            }
            let expected: Vec<usize> = first_seen
                .iter()
                .map(|q| resolvable.iter().filter(|j| j.query_id == *q).count() + 1)
                .collect();
            prop_assert_eq!(&set.group_sizes, &expected);
            prop_assert!(set.examples.iter().all(|e| e.features.len() == feature_dimensions(3)));
        }
    }
}

/// Topic projection and ranker that make scores a known function of the document.
struct CountTopics;

impl TopicProjection for CountTopics {
    fn topic_count(&self) -> usize {
        1
    }

    fn project(&self, tokens: &[String]) -> Vec<f32> {
        vec![tokens.len() as f32]
    }
}

/// Scores each row by the document topic, rounded down to make ties common.
struct DocLengthScorer;

impl ScoringModel for DocLengthScorer {
    fn num_features(&self) -> usize {
        feature_dimensions(1)
    }

    fn predict(&self, rows: &[Vec<f32>]) -> Result<Vec<f64>> {
        Ok(rows.iter().map(|r| f64::from((r[1] / 2.0).floor())).collect())
    }
}

/// **Property: rerank ordering**
/// *For any* candidate list, reranking SHALL return scores in non-increasing
/// order, keep tied candidates in input order, and be repeatable.
mod prop_rerank_ordering {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn descending_stable_and_repeatable(lengths in proptest::collection::vec(0usize..8, 0..15)) {
            let mut source = InMemoryDocumentSource::new();
            let mut candidates = Vec::new();
            for (i, len) in lengths.iter().enumerate() {
                let text = vec!["w"; *len].join(" ");
                source = source.with_text(format!("doc{i}"), &text);
                candidates.push(Candidate::new(format!("doc{i}"), 0.0));
            }
            let service = LetorService::builder()
                .topic_model(Arc::new(CountTopics))
                .ranker(Arc::new(DocLengthScorer))
                .document_source(Arc::new(source))
                .build()
                .unwrap();

            let rt = tokio::runtime::Runtime::new().unwrap();
            let query = vec!["w".to_string()];
            let first = rt.block_on(service.rerank_tokens(&query, candidates.clone())).unwrap();
            let second = rt.block_on(service.rerank_tokens(&query, candidates)).unwrap();

            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.ranked.len(), lengths.len());
            for pair in first.ranked.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
                if pair[0].score == pair[1].score {
                    let idx = |r: &str| r.trim_start_matches("doc").parse::<usize>().unwrap();
                    prop_assert!(idx(&pair[0].reference) < idx(&pair[1].reference));
                }
            }
        }
    }
}
