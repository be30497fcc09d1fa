//! Persistence for the trained topic model and ranker.
//!
//! Both artifacts are JSON files under one directory. Loading distinguishes
//! "absent" (`Ok(None)`) from "present but unusable" (`Err`), so a fresh
//! deployment starts without models while a corrupt file is still reported.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{LetorError, Result};
use crate::ranker::LambdaMart;
use crate::topic::LsiModel;

const TOPIC_MODEL_FILE: &str = "topic_model.json";
const RANKER_FILE: &str = "ranker.json";

/// Directory-backed store for the two trained artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `dir`. Nothing is touched until a save or load.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The artifact directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the topic-model artifact.
    pub fn topic_model_path(&self) -> PathBuf {
        self.dir.join(TOPIC_MODEL_FILE)
    }

    /// Path of the ranker artifact.
    pub fn ranker_path(&self) -> PathBuf {
        self.dir.join(RANKER_FILE)
    }

    /// Persist the topic model.
    ///
    /// # Errors
    ///
    /// Returns [`LetorError::Artifact`] if the directory or file cannot be written.
    pub fn save_topic_model(&self, model: &LsiModel) -> Result<()> {
        self.save(&self.topic_model_path(), model)
    }

    /// Persist the ranker.
    ///
    /// # Errors
    ///
    /// Returns [`LetorError::Artifact`] if the directory or file cannot be written.
    pub fn save_ranker(&self, ranker: &LambdaMart) -> Result<()> {
        self.save(&self.ranker_path(), ranker)
    }

    /// Load the topic model, or `None` if it was never saved.
    ///
    /// # Errors
    ///
    /// Returns [`LetorError::Artifact`] if the file exists but is unreadable
    /// or inconsistent.
    pub fn load_topic_model(&self) -> Result<Option<LsiModel>> {
        let path = self.topic_model_path();
        let model: Option<LsiModel> = load(&path)?;
        if let Some(model) = &model {
            model.check_shape().map_err(|m| LetorError::artifact(&path, m))?;
        }
        Ok(model)
    }

    /// Load the ranker, or `None` if it was never saved.
    ///
    /// # Errors
    ///
    /// Returns [`LetorError::Artifact`] if the file exists but is unreadable
    /// or inconsistent.
    pub fn load_ranker(&self) -> Result<Option<LambdaMart>> {
        let path = self.ranker_path();
        let ranker: Option<LambdaMart> = load(&path)?;
        if let Some(ranker) = &ranker {
            ranker.check_shape().map_err(|m| LetorError::artifact(&path, m))?;
        }
        Ok(ranker)
    }

    fn save<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| LetorError::artifact(&self.dir, e))?;
        let bytes = serde_json::to_vec(value).map_err(|e| LetorError::artifact(path, e))?;

        // Readers only ever see a complete file.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &bytes).map_err(|e| LetorError::artifact(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| LetorError::artifact(path, e))?;
        info!(path = %path.display(), bytes = bytes.len(), "saved artifact");
        Ok(())
    }
}

fn load<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "artifact not found");
            return Ok(None);
        }
        Err(e) => return Err(LetorError::artifact(path, e)),
    };
    serde_json::from_slice(&bytes).map(Some).map_err(|e| LetorError::artifact(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RankerParams;
    use crate::document::tokenize;
    use crate::ranker::ScoringModel;
    use crate::topic::TopicProjection;

    #[test]
    fn absent_artifacts_load_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("missing"));
        assert!(store.load_topic_model().unwrap().is_none());
        assert!(store.load_ranker().unwrap().is_none());
    }

    #[test]
    fn corrupt_artifact_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        std::fs::write(store.ranker_path(), b"{not json").unwrap();
        assert!(matches!(store.load_ranker(), Err(LetorError::Artifact { .. })));
    }

    #[test]
    fn saved_models_behave_identically_after_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("nested"));

        let docs: Vec<Vec<String>> =
            ["a b c", "b c d", "d e", "e f a"].iter().map(|s| tokenize(s)).collect();
        let topics = LsiModel::fit(docs.iter().map(Vec::as_slice), 3, Some(5)).unwrap();
        store.save_topic_model(&topics).unwrap();
        let reloaded = store.load_topic_model().unwrap().unwrap();
        assert_eq!(reloaded.project(&tokenize("a d")), topics.project(&tokenize("a d")));

        let rows = vec![vec![0.0f32, 1.0], vec![1.0, 0.0], vec![0.5, 0.5], vec![1.0, 1.0]];
        let params = RankerParams { n_estimators: 5, min_data_in_leaf: 1, ..RankerParams::default() };
        let ranker = LambdaMart::train(&rows, &[0, 1, 0, 1], &[2, 2], &params, Some(2)).unwrap();
        store.save_ranker(&ranker).unwrap();
        let back = store.load_ranker().unwrap().unwrap();
        assert_eq!(back.predict(&rows).unwrap(), ranker.predict(&rows).unwrap());
    }
}
