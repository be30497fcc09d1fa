//! Binary relevance judgments keyed by query id and integer document id.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{EvalError, Result};

/// Judged-relevant document ids per query.
///
/// Only relevant pairs are stored; any pair not present is non-relevant.
#[derive(Debug, Clone, Default)]
pub struct JudgmentTable {
    relevant: HashMap<String, HashSet<u64>>,
}

impl JudgmentTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `<query_id> <document_id> ...` lines. Trailing fields are ignored
    /// and the presence of a line marks the pair relevant.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Io`] if the file cannot be read and
    /// [`EvalError::Parse`] if a line has fewer than two fields or a
    /// non-integer document id.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
        let mut table = Self::new();
        for (idx, line) in text.lines().enumerate() {
            let mut fields = line.split_whitespace();
            let Some(query_id) = fields.next() else { continue };
            let doc_field = fields
                .next()
                .ok_or_else(|| EvalError::parse(path, idx + 1, "expected <query_id> <document_id>"))?;
            let doc_id = doc_field.parse::<u64>().map_err(|e| {
                EvalError::parse(path, idx + 1, format!("invalid document id {doc_field:?}: {e}"))
            })?;
            table.insert(query_id, doc_id);
        }
        tracing::debug!(path = %path.display(), queries = table.num_queries(), "loaded judgments");
        Ok(table)
    }

    /// Mark `doc_id` relevant for `query_id`.
    pub fn insert(&mut self, query_id: impl Into<String>, doc_id: u64) {
        self.relevant.entry(query_id.into()).or_default().insert(doc_id);
    }

    /// Whether the pair is judged relevant.
    pub fn is_relevant(&self, query_id: &str, doc_id: u64) -> bool {
        self.relevant.get(query_id).is_some_and(|docs| docs.contains(&doc_id))
    }

    /// Number of judged-relevant documents for a query.
    pub fn relevant_count(&self, query_id: &str) -> usize {
        self.relevant.get(query_id).map_or(0, HashSet::len)
    }

    /// Number of queries with at least one judgment.
    pub fn num_queries(&self) -> usize {
        self.relevant.len()
    }

    /// Map a ranked list of document references to a relevance vector.
    ///
    /// References whose id cannot be derived count as non-relevant.
    pub fn relevance_vector<'a>(
        &self,
        query_id: &str,
        references: impl IntoIterator<Item = &'a str>,
    ) -> Vec<u8> {
        references
            .into_iter()
            .map(|reference| {
                u8::from(
                    doc_id_from_reference(reference).is_some_and(|id| self.is_relevant(query_id, id)),
                )
            })
            .collect()
    }
}

impl<Q: Into<String>> FromIterator<(Q, u64)> for JudgmentTable {
    fn from_iter<T: IntoIterator<Item = (Q, u64)>>(iter: T) -> Self {
        let mut table = Self::new();
        for (query_id, doc_id) in iter {
            table.insert(query_id, doc_id);
        }
        table
    }
}

/// Stable integer id of a document reference: its file stem parsed as an
/// integer (`collection/12/5.txt` -> 5).
pub fn doc_id_from_reference(reference: &str) -> Option<u64> {
    Path::new(reference).file_stem()?.to_str()?.parse().ok()
}
