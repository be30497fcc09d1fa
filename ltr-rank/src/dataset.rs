//! Grouped, labelled training sets for listwise ranking.

use std::collections::HashMap;

use rand::Rng;
use tracing::{debug, warn};

use crate::document::{GradedJudgment, TokenTable};
use crate::features::FeatureExtractor;

/// A feature vector with its relevance label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledExample {
    /// Query-document features.
    pub features: Vec<f32>,
    /// Relevance grade; synthetic negatives are `0`.
    pub label: u32,
}

/// Examples laid out in contiguous per-query runs.
///
/// `group_sizes[i]` is the length of the `i`-th run, so the sizes always sum
/// to `examples.len()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    /// Run length for each query, in emission order.
    pub group_sizes: Vec<usize>,
    /// All examples, grouped by query.
    pub examples: Vec<LabeledExample>,
    /// Judgment rows dropped because their query or document was unknown.
    pub dropped_rows: usize,
}

impl TrainingSet {
    /// Feature rows, in example order.
    pub fn feature_rows(&self) -> Vec<&[f32]> {
        self.examples.iter().map(|e| e.features.as_slice()).collect()
    }

    /// Labels, in example order.
    pub fn labels(&self) -> Vec<u32> {
        self.examples.iter().map(|e| e.label).collect()
    }
}

/// Turns judgments plus query and document tables into a [`TrainingSet`].
pub struct TrainingSetBuilder<'a> {
    extractor: FeatureExtractor<'a>,
    num_negatives: usize,
}

impl<'a> TrainingSetBuilder<'a> {
    /// Create a builder that appends `num_negatives` random negatives per query.
    pub fn new(extractor: FeatureExtractor<'a>, num_negatives: usize) -> Self {
        Self { extractor, num_negatives }
    }

    /// Assemble the training set.
    ///
    /// Judgment rows whose query or document id is not in the tables are
    /// dropped and counted. Queries are emitted in the order they first
    /// appear in `judgments`; each group holds its judged documents in file
    /// order followed by the synthetic negatives, drawn uniformly from the
    /// whole document table. A draw may hit a judged document; that is
    /// accepted as label noise.
    pub fn build(
        &self,
        judgments: &[GradedJudgment],
        queries: &TokenTable,
        documents: &TokenTable,
        rng: &mut impl Rng,
    ) -> TrainingSet {
        let mut order: Vec<&str> = Vec::new();
        let mut groups: HashMap<&str, Vec<(&str, u32)>> = HashMap::new();
        let mut dropped_rows = 0;

        for row in judgments {
            if !queries.contains(&row.query_id) || !documents.contains(&row.doc_id) {
                debug!(query_id = %row.query_id, doc_id = %row.doc_id, "dropping unresolved judgment");
                dropped_rows += 1;
                continue;
            }
            groups
                .entry(row.query_id.as_str())
                .or_insert_with(|| {
                    order.push(row.query_id.as_str());
                    Vec::new()
                })
                .push((row.doc_id.as_str(), row.grade));
        }
        if dropped_rows > 0 {
            warn!(dropped_rows, "judgment rows referenced unknown queries or documents");
        }

        let mut set = TrainingSet { dropped_rows, ..TrainingSet::default() };
        for query_id in order {
            let Some(query) = queries.get(query_id) else { continue };
            let rows = &groups[query_id];

            for &(doc_id, grade) in rows {
                if let Some(doc) = documents.get(doc_id) {
                    set.examples.push(LabeledExample {
                        features: self.extractor.features(query, doc),
                        label: grade,
                    });
                }
            }
            for _ in 0..self.num_negatives {
                let pick = rng.random_range(0..documents.len());
                if let Some((_, doc)) = documents.nth(pick) {
                    set.examples.push(LabeledExample {
                        features: self.extractor.features(query, doc),
                        label: 0,
                    });
                }
            }
            set.group_sizes.push(rows.len() + self.num_negatives);
        }

        debug!(groups = set.group_sizes.len(), examples = set.examples.len(), "built training set");
        set
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::document::tokenize;
    use crate::topic::TopicProjection;

    struct Flat;

    impl TopicProjection for Flat {
        fn topic_count(&self) -> usize {
            1
        }

        fn project(&self, tokens: &[String]) -> Vec<f32> {
            vec![tokens.len() as f32]
        }
    }

    fn tables() -> (TokenTable, TokenTable) {
        let queries: TokenTable =
            [("Q1", tokenize("a b")), ("Q2", tokenize("c"))].into_iter().collect();
        let docs: TokenTable =
            [("D1", tokenize("a")), ("D2", tokenize("b c")), ("D3", tokenize("d"))]
                .into_iter()
                .collect();
        (queries, docs)
    }

    #[test]
    fn groups_follow_first_appearance_with_one_negative_each() {
        let (queries, docs) = tables();
        let judgments = vec![
            GradedJudgment::new("Q2", "D2", 1),
            GradedJudgment::new("Q1", "D1", 2),
            GradedJudgment::new("Q9", "D1", 1),
            GradedJudgment::new("Q1", "D9", 1),
            GradedJudgment::new("Q1", "D3", 0),
        ];
        let builder = TrainingSetBuilder::new(FeatureExtractor::new(&Flat), 1);
        let set = builder.build(&judgments, &queries, &docs, &mut StdRng::seed_from_u64(3));

        assert_eq!(set.group_sizes, vec![2, 3]);
        assert_eq!(set.dropped_rows, 2);
        assert_eq!(set.examples.len(), 5);
        assert_eq!(set.labels(), vec![1, 0, 2, 0, 0]);
        // Query topic feature carries the query length: Q2 first, then Q1.
        assert_eq!(set.examples[0].features[0], 1.0);
        assert_eq!(set.examples[2].features[0], 2.0);
    }

    #[test]
    fn no_resolvable_rows_means_empty_set() {
        let (queries, docs) = tables();
        let judgments = vec![GradedJudgment::new("Qx", "Dx", 1)];
        let builder = TrainingSetBuilder::new(FeatureExtractor::new(&Flat), 1);
        let set = builder.build(&judgments, &queries, &docs, &mut StdRng::seed_from_u64(0));
        assert!(set.group_sizes.is_empty());
        assert!(set.examples.is_empty());
        assert_eq!(set.dropped_rows, 1);
    }
}
