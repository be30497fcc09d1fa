//! Retrieval effectiveness metrics over binary relevance vectors.
//!
//! A relevance vector marks, for each rank of a returned list, whether the
//! document at that rank is judged relevant (`1`) or not (`0`).

use serde::Serialize;

/// Rank-biased precision with persistence `p`.
///
/// `(1 - p) * Σ rel[i] * p^(i-1)` over 1-based ranks.
pub fn rbp(relevance: &[u8], p: f64) -> f64 {
    let mut weight = 1.0;
    let mut score = 0.0;
    for &rel in relevance {
        score += f64::from(rel) * weight;
        weight *= p;
    }
    (1.0 - p) * score
}

/// Discounted cumulative gain: `Σ rel[i] / log2(i + 1)` over 1-based ranks.
pub fn dcg(relevance: &[u8]) -> f64 {
    relevance
        .iter()
        .enumerate()
        .filter(|(_, rel)| **rel > 0)
        .map(|(i, &rel)| f64::from(rel) / ((i + 2) as f64).log2())
        .sum()
}

/// Relevant documents in the list divided by the caller's `k`.
///
/// `k` is taken as given and is not clamped to the list length, so a list
/// shorter than `k` is penalised for the missing ranks. Returns 0.0 for
/// `k == 0`.
pub fn precision_at_k(relevance: &[u8], k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    relevant_count(relevance) as f64 / k as f64
}

/// Average precision as computed by the legacy evaluation pipeline.
///
/// The total relevant count `R` is estimated from the list itself and every
/// relevant rank contributes the same precision over the full list length,
/// so the value reduces to `R / n`. This is not textbook AP and is kept for
/// comparability with earlier reports.
pub fn average_precision(relevance: &[u8]) -> f64 {
    let relevant = relevant_count(relevance);
    if relevant == 0 {
        return 0.0;
    }
    let precision = precision_at_k(relevance, relevance.len());
    relevance.iter().map(|&rel| f64::from(rel) * precision / relevant as f64).sum()
}

/// Arithmetic mean, 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn relevant_count(relevance: &[u8]) -> usize {
    relevance.iter().filter(|&&rel| rel > 0).count()
}

/// All metrics for one ranked list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricScores {
    /// Rank-biased precision.
    pub rbp: f64,
    /// Discounted cumulative gain.
    pub dcg: f64,
    /// Average precision (legacy formula).
    pub ap: f64,
    /// Precision with `K` equal to the list length.
    pub precision: f64,
}

impl MetricScores {
    /// Score one relevance vector.
    pub fn compute(relevance: &[u8], rbp_p: f64) -> Self {
        Self {
            rbp: rbp(relevance, rbp_p),
            dcg: dcg(relevance),
            ap: average_precision(relevance),
            precision: precision_at_k(relevance, relevance.len()),
        }
    }

    /// Component-wise mean of many score sets.
    pub fn mean_of(scores: &[MetricScores]) -> Self {
        let column = |f: fn(&MetricScores) -> f64| mean(&scores.iter().map(f).collect::<Vec<_>>());
        Self {
            rbp: column(|s| s.rbp),
            dcg: column(|s| s.dcg),
            ap: column(|s| s.ap),
            precision: column(|s| s.precision),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    #[test]
    fn all_zero_vector_scores_zero() {
        let zeros = [0u8; 7];
        assert_eq!(rbp(&zeros, 0.8), 0.0);
        assert_eq!(dcg(&zeros), 0.0);
        assert_eq!(average_precision(&zeros), 0.0);
        for k in [1, 7, 100] {
            assert_eq!(precision_at_k(&zeros, k), 0.0);
        }
    }

    #[test]
    fn single_relevant_document_rbp() {
        assert!((rbp(&[1], 0.8) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn dcg_of_mixed_vector() {
        let expected = 1.0 + 0.5 + 1.0 / 5f64.log2() + 1.0 / 6f64.log2();
        let got = dcg(&[1, 0, 1, 1, 1, 0]);
        assert!((got - expected).abs() < EPS);
        assert!((got - 2.3176).abs() < 1e-4);
    }

    #[test]
    fn precision_is_inverse_in_k() {
        let rel = [1, 0, 1, 0];
        let p4 = precision_at_k(&rel, 4);
        let p8 = precision_at_k(&rel, 8);
        assert!((p4 - 0.5).abs() < EPS);
        assert!((p8 - p4 / 2.0).abs() < EPS);
        assert_eq!(precision_at_k(&rel, 0), 0.0);
    }

    #[test]
    fn legacy_ap_reduces_to_relevant_fraction() {
        // Textbook AP would be (1/1 + 2/3) / 2 = 0.8333.
        let rel = [1, 0, 1, 0, 0, 0];
        assert!((average_precision(&rel) - 2.0 / 6.0).abs() < EPS);
    }

    #[test]
    fn empty_list_scores_zero() {
        assert_eq!(MetricScores::compute(&[], 0.8), MetricScores::default());
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn second_rank_hit() {
        let scores = MetricScores::compute(&[0, 1, 0], 0.8);
        assert!((scores.rbp - 0.16).abs() < EPS);
        assert!((scores.dcg - 0.630_929_8).abs() < EPS);
        assert!((scores.precision - 1.0 / 3.0).abs() < EPS);
    }

    #[test]
    fn mean_of_is_component_wise() {
        let a = MetricScores { rbp: 1.0, dcg: 2.0, ap: 0.0, precision: 0.5 };
        let b = MetricScores { rbp: 0.0, dcg: 4.0, ap: 1.0, precision: 0.5 };
        let m = MetricScores::mean_of(&[a, b]);
        assert_eq!(m, MetricScores { rbp: 0.5, dcg: 3.0, ap: 0.5, precision: 0.5 });
    }
}
