//! Benchmark query file reader.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

/// One benchmark query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkQuery {
    /// Query identifier used in the judgment file.
    pub id: String,
    /// Query text, tokens joined by single spaces.
    pub text: String,
}

impl BenchmarkQuery {
    /// Create a query.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into() }
    }
}

/// Read `<query_id> <token> <token> ...` lines in file order.
///
/// Blank lines are skipped. A line holding only an id yields empty text.
///
/// # Errors
///
/// Returns [`EvalError::Io`] if the file cannot be read.
pub fn read_benchmark_queries(path: impl AsRef<Path>) -> Result<Vec<BenchmarkQuery>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
    Ok(text
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let id = fields.next()?;
            Some(BenchmarkQuery::new(id, fields.collect::<Vec<_>>().join(" ")))
        })
        .collect())
}
