//! Data types for token tables, judgments, and reranked results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// An ordered table of token sequences keyed by identifier.
///
/// Used for both the query table and the document table of a training run.
/// Insertion order is kept; re-inserting an id replaces its tokens in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenTable {
    entries: Vec<(String, Vec<String>)>,
    index: HashMap<String, usize>,
}

impl TokenTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the tokens for `id`.
    pub fn insert(&mut self, id: impl Into<String>, tokens: Vec<String>) {
        let id = id.into();
        match self.index.get(&id) {
            Some(&pos) => self.entries[pos].1 = tokens,
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push((id, tokens));
            }
        }
    }

    /// Look up the tokens for `id`.
    pub fn get(&self, id: &str) -> Option<&[String]> {
        self.index.get(id).map(|&pos| self.entries[pos].1.as_slice())
    }

    /// Whether `id` is present.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// The entry at insertion position `pos`.
    pub fn nth(&self, pos: usize) -> Option<(&str, &[String])> {
        self.entries.get(pos).map(|(id, tokens)| (id.as_str(), tokens.as_slice()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(id, tokens)| (id.as_str(), tokens.as_slice()))
    }
}

impl<I: Into<String>> FromIterator<(I, Vec<String>)> for TokenTable {
    fn from_iter<T: IntoIterator<Item = (I, Vec<String>)>>(iter: T) -> Self {
        let mut table = Self::new();
        for (id, tokens) in iter {
            table.insert(id, tokens);
        }
        table
    }
}

/// One graded training judgment: `query_id` judged `doc_id` with `grade`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradedJudgment {
    /// Query identifier.
    pub query_id: String,
    /// Document identifier.
    pub doc_id: String,
    /// Relevance grade, used as the training label.
    pub grade: u32,
}

impl GradedJudgment {
    /// Create a judgment row.
    pub fn new(query_id: impl Into<String>, doc_id: impl Into<String>, grade: u32) -> Self {
        Self { query_id: query_id.into(), doc_id: doc_id.into(), grade }
    }
}

/// A candidate document handed to the reranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Opaque document reference, resolvable by a `DocumentSource`.
    pub reference: String,
    /// Score assigned by the baseline retriever.
    pub baseline_score: f64,
}

impl Candidate {
    /// Create a candidate.
    pub fn new(reference: impl Into<String>, baseline_score: f64) -> Self {
        Self { reference: reference.into(), baseline_score }
    }
}

/// A reranked document paired with the ranker's score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDocument {
    /// The document reference.
    pub reference: String,
    /// Predicted relevance (higher is more relevant).
    pub score: f64,
}

/// Split a text into whitespace tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}
