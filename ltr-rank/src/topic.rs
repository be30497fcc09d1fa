//! Latent-topic projection of token sequences.
//!
//! [`LsiModel`] fits a truncated SVD of the term-document count matrix of a
//! corpus and projects any token sequence onto the leading left singular
//! vectors. Only a fitted model can be constructed, so the "not trained"
//! state lives one level up, in the service that may or may not hold one.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dictionary::Dictionary;
use crate::error::{LetorError, Result};
use crate::linalg::{self, SparseColumns};

/// Extra random directions sampled beyond the target rank.
const OVERSAMPLES: usize = 10;
/// Subspace iterations; two is enough for the slowly decaying spectra of text.
const POWER_ITERATIONS: usize = 2;

/// Maps a token sequence to a fixed-length topic vector.
///
/// Implementations are read-only after construction and safe to share
/// across threads.
pub trait TopicProjection: Send + Sync {
    /// Length of every vector returned by [`project`](TopicProjection::project).
    fn topic_count(&self) -> usize;

    /// Project `tokens` into topic space.
    ///
    /// The result always has exactly [`topic_count`](TopicProjection::topic_count)
    /// entries. When a model has fewer real components than that, the real
    /// components are kept in the leading slots and only the trailing slots
    /// are zero; a short projection is never replaced by an all-zero vector.
    fn project(&self, tokens: &[String]) -> Vec<f32>;
}

/// Latent semantic indexing over raw term counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LsiModel {
    num_topics: usize,
    dictionary: Dictionary,
    /// Number of non-degenerate components actually found (`<= num_topics`).
    rank: usize,
    /// Term-major basis: entry `term * rank + topic`.
    basis: Vec<f32>,
    singular_values: Vec<f64>,
}

impl LsiModel {
    /// Fit the model on a corpus of token sequences.
    ///
    /// The vocabulary is built from the corpus itself. A corpus with fewer
    /// distinct terms or documents than `num_topics` yields a lower-rank
    /// model whose trailing topics are always zero.
    ///
    /// # Errors
    ///
    /// Returns [`LetorError::ConfigError`] if `num_topics == 0`.
    pub fn fit<'a, I>(corpus: I, num_topics: usize, seed: Option<u64>) -> Result<Self>
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        if num_topics == 0 {
            return Err(LetorError::ConfigError("num_topics must be greater than zero".into()));
        }

        let mut dictionary = Dictionary::new();
        let cols: Vec<Vec<(u32, f64)>> = corpus
            .into_iter()
            .map(|doc| {
                dictionary
                    .doc2bow_update(doc)
                    .into_iter()
                    .map(|(id, count)| (id, f64::from(count)))
                    .collect()
            })
            .collect();
        let matrix = SparseColumns { n_rows: dictionary.len(), cols };

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let (basis, singular_values) = truncated_svd(&matrix, num_topics, &mut rng);
        let rank = singular_values.len();

        info!(
            documents = matrix.cols.len(),
            vocabulary = dictionary.len(),
            num_topics,
            rank,
            "topic model fitted"
        );

        Ok(Self { num_topics, dictionary, rank, basis, singular_values })
    }

    /// The vocabulary the model was fitted with.
    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Number of non-degenerate topics.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Singular values of the retained topics, largest first.
    pub fn singular_values(&self) -> &[f64] {
        &self.singular_values
    }

    /// Check internal shape consistency, e.g. after deserialisation.
    pub(crate) fn check_shape(&self) -> std::result::Result<(), String> {
        if self.rank > self.num_topics || self.rank != self.singular_values.len() {
            return Err(format!(
                "rank {} inconsistent with {} topics / {} singular values",
                self.rank,
                self.num_topics,
                self.singular_values.len()
            ));
        }
        if self.basis.len() != self.dictionary.len() * self.rank {
            return Err(format!(
                "basis has {} entries, expected {}",
                self.basis.len(),
                self.dictionary.len() * self.rank
            ));
        }
        Ok(())
    }
}

impl TopicProjection for LsiModel {
    fn topic_count(&self) -> usize {
        self.num_topics
    }

    /// `U_kᵀ · bow`. Components `rank..num_topics` stay zero.
    fn project(&self, tokens: &[String]) -> Vec<f32> {
        let mut out = vec![0.0f32; self.num_topics];
        for (id, count) in self.dictionary.doc2bow(tokens) {
            let row = &self.basis[id as usize * self.rank..(id as usize + 1) * self.rank];
            for (slot, weight) in out.iter_mut().zip(row) {
                *slot += count as f32 * weight;
            }
        }
        out
    }
}

/// Randomised truncated SVD. Returns the term-major left singular basis and
/// the singular values, both truncated to non-degenerate components.
fn truncated_svd(matrix: &SparseColumns, k: usize, rng: &mut StdRng) -> (Vec<f32>, Vec<f64>) {
    let n_terms = matrix.n_rows;
    let n_docs = matrix.cols.len();
    let k = k.min(n_terms).min(n_docs);
    if k == 0 {
        return (Vec::new(), Vec::new());
    }
    let sketch = (k + OVERSAMPLES).min(n_terms).min(n_docs);

    let omega = linalg::random_columns(rng, n_docs, sketch);
    let mut q = linalg::orthonormalize(matrix.mul(&omega));
    for _ in 0..POWER_ITERATIONS {
        let z = linalg::orthonormalize(matrix.mul_transpose(&q));
        q = linalg::orthonormalize(matrix.mul(&z));
    }

    // Rows of B = Qᵀ A, and the small Gram matrix B Bᵀ.
    let b_rows = matrix.mul_transpose(&q);
    let l = b_rows.len();
    let mut gram = vec![0.0; l * l];
    for i in 0..l {
        for j in i..l {
            let value = linalg::dot(&b_rows[i], &b_rows[j]);
            gram[i * l + j] = value;
            gram[j * l + i] = value;
        }
    }
    let (eigenvalues, eigenvectors) = linalg::symmetric_eigen(gram, l);

    let mut order: Vec<usize> = (0..l).collect();
    order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]));
    let top = eigenvalues.iter().copied().fold(0.0f64, f64::max);
    let kept: Vec<usize> = order
        .into_iter()
        .filter(|&i| eigenvalues[i] > top * 1e-12 && eigenvalues[i] > 0.0)
        .take(k)
        .collect();
    let rank = kept.len();
    debug!(sketch = l, rank, "truncated svd finished");

    let mut basis = vec![0.0f32; n_terms * rank];
    for (topic, &i) in kept.iter().enumerate() {
        for (j, qj) in q.iter().enumerate() {
            let w = eigenvectors[j * l + i];
            if w == 0.0 {
                continue;
            }
            for (term, &value) in qj.iter().enumerate() {
                basis[term * rank + topic] += (w * value) as f32;
            }
        }
    }
    let singular_values = kept.iter().map(|&i| eigenvalues[i].sqrt()).collect();
    (basis, singular_values)
}
