//! Readers for the training input files.
//!
//! Two line-oriented formats are supported:
//!
//! - extraction files (`<id> <token> ... <trailing>`), holding queries or
//!   document bodies; the last field is a trailer and is discarded
//! - graded judgment files (`<query_id> <doc_id> <grade> ...`)
//!
//! All three inputs are required, so any read failure is fatal.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::document::{GradedJudgment, TokenTable};
use crate::error::{LetorError, Result};

fn lines(path: &Path) -> Result<impl Iterator<Item = (usize, std::io::Result<String>)>> {
    let file = File::open(path).map_err(|e| LetorError::io(path, e))?;
    Ok(BufReader::new(file).lines().enumerate().map(|(i, line)| (i + 1, line)))
}

/// Read an extraction file into a [`TokenTable`].
///
/// Blank lines are skipped. A line holding only an id, or an id and a
/// trailer, yields an empty token sequence.
///
/// # Errors
///
/// Returns [`LetorError::Io`] if the file cannot be opened or read.
pub fn read_token_table(path: impl AsRef<Path>) -> Result<TokenTable> {
    let path = path.as_ref();
    let mut table = TokenTable::new();
    for (_, line) in lines(path)? {
        let line = line.map_err(|e| LetorError::io(path, e))?;
        let mut fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        let id = fields.remove(0);
        fields.pop();
        table.insert(id, fields.into_iter().map(str::to_string).collect());
    }
    debug!(path = %path.display(), entries = table.len(), "read token table");
    Ok(table)
}

/// Read a graded judgment file.
///
/// # Errors
///
/// Returns [`LetorError::Io`] on read failure and [`LetorError::Parse`] for
/// a line with fewer than three fields or a non-integer grade.
pub fn read_graded_judgments(path: impl AsRef<Path>) -> Result<Vec<GradedJudgment>> {
    let path = path.as_ref();
    let mut judgments = Vec::new();
    for (line_no, line) in lines(path)? {
        let line = line.map_err(|e| LetorError::io(path, e))?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [] => continue,
            [query_id, doc_id, grade, ..] => {
                let grade = grade.parse::<u32>().map_err(|e| LetorError::Parse {
                    path: path.to_path_buf(),
                    line: line_no,
                    message: format!("invalid grade '{grade}': {e}"),
                })?;
                judgments.push(GradedJudgment::new(*query_id, *doc_id, grade));
            }
            _ => {
                return Err(LetorError::Parse {
                    path: path.to_path_buf(),
                    line: line_no,
                    message: format!("expected '<query_id> <doc_id> <grade>', got '{line}'"),
                });
            }
        }
    }
    debug!(path = %path.display(), rows = judgments.len(), "read graded judgments");
    Ok(judgments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn extraction_file_drops_id_and_trailer() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "docs.txt", "D1 cancer cell growth 0\n\nD2 lone\nD3 tumor suppressor x\n");

        let table = read_token_table(&path).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("D1").unwrap(), ["cancer", "cell", "growth"]);
        assert!(table.get("D2").unwrap().is_empty());
        assert_eq!(table.get("D3").unwrap(), ["tumor", "suppressor"]);
    }

    #[test]
    fn judgments_keep_grade() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "qrels.txt", "Q1 D1 2\nQ1 D2 0 extra\n\nQ2 D1 1\n");

        let rows = read_graded_judgments(&path).unwrap();
        assert_eq!(
            rows,
            vec![
                GradedJudgment::new("Q1", "D1", 2),
                GradedJudgment::new("Q1", "D2", 0),
                GradedJudgment::new("Q2", "D1", 1),
            ]
        );
    }

    #[test]
    fn bad_grade_reports_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "qrels.txt", "Q1 D1 1\nQ1 D2 high\n");

        match read_graded_judgments(&path).unwrap_err() {
            LetorError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_token_table("/nonexistent/ltr/docs.txt").unwrap_err();
        assert!(matches!(err, LetorError::Io { .. }));
    }
}
