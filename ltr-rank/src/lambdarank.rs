//! LambdaRank gradients: ΔNDCG-weighted pairwise logistic loss per query group.

use std::ops::Range;

fn gain(label: u32) -> f64 {
    // Labels beyond 31 would overflow the shift; grades are tiny in practice.
    ((1u64 << label.min(31)) - 1) as f64
}

fn discount(rank: usize) -> f64 {
    1.0 / ((rank + 2) as f64).log2()
}

/// Ranges of consecutive rows, one per group.
pub(crate) fn group_ranges(group_sizes: &[usize]) -> Vec<Range<usize>> {
    let mut start = 0;
    group_sizes
        .iter()
        .map(|&size| {
            let range = start..start + size;
            start += size;
            range
        })
        .collect()
}

/// Positions of `scores` sorted by descending score, ties by position.
fn ranked(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
    order
}

fn max_dcg(labels: &[u32], k: usize) -> f64 {
    let mut sorted = labels.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted.iter().take(k).enumerate().map(|(r, &l)| gain(l) * discount(r)).sum()
}

/// NDCG@k of one group's scores. Groups without any positive label score `0`.
pub fn ndcg_at(scores: &[f64], labels: &[u32], k: usize) -> f64 {
    let ideal = max_dcg(labels, k);
    if ideal <= 0.0 {
        return 0.0;
    }
    let dcg: f64 =
        ranked(scores).iter().take(k).enumerate().map(|(r, &i)| gain(labels[i]) * discount(r)).sum();
    dcg / ideal
}

/// Mean NDCG@k over all groups.
pub fn mean_ndcg(scores: &[f64], labels: &[u32], group_sizes: &[usize], k: usize) -> f64 {
    let ranges = group_ranges(group_sizes);
    if ranges.is_empty() {
        return 0.0;
    }
    let total: f64 = ranges.iter().map(|r| ndcg_at(&scores[r.clone()], &labels[r.clone()], k)).sum();
    total / ranges.len() as f64
}

/// First and second derivatives of the LambdaRank loss with respect to each score.
///
/// Only pairs whose higher-ranked member sits within the top `truncation`
/// positions (by current score) contribute.
pub(crate) fn gradients(
    scores: &[f64],
    labels: &[u32],
    group_sizes: &[usize],
    sigmoid: f64,
    truncation: usize,
) -> (Vec<f64>, Vec<f64>) {
    let mut grad = vec![0.0; scores.len()];
    let mut hess = vec![0.0; scores.len()];

    for range in group_ranges(group_sizes) {
        let offset = range.start;
        let s = &scores[range.clone()];
        let y = &labels[range];
        if s.len() < 2 {
            continue;
        }
        let ideal = max_dcg(y, truncation);
        if ideal <= 0.0 {
            continue;
        }
        let order = ranked(s);

        for i in 0..order.len().min(truncation) {
            for j in (i + 1)..order.len() {
                let (a, b) = (order[i], order[j]);
                if y[a] == y[b] {
                    continue;
                }
                let (high, low, high_rank, low_rank) =
                    if y[a] > y[b] { (a, b, i, j) } else { (b, a, j, i) };

                let delta_ndcg = (gain(y[high]) - gain(y[low])).abs()
                    * (discount(high_rank) - discount(low_rank)).abs()
                    / ideal;
                let p = 1.0 / (1.0 + (sigmoid * (s[high] - s[low])).exp());
                let lambda = -sigmoid * p * delta_ndcg;
                let h = sigmoid * sigmoid * p * (1.0 - p) * delta_ndcg;

                grad[offset + high] += lambda;
                grad[offset + low] -= lambda;
                hess[offset + high] += h;
                hess[offset + low] += h;
            }
        }
    }
    (grad, hess)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_order_has_unit_ndcg() {
        assert!((ndcg_at(&[3.0, 2.0, 1.0], &[2, 1, 0], 10) - 1.0).abs() < 1e-12);
        assert!(ndcg_at(&[1.0, 2.0, 3.0], &[2, 1, 0], 10) < 1.0);
        assert_eq!(ndcg_at(&[1.0, 2.0], &[0, 0], 10), 0.0);
    }

    #[test]
    fn gradients_push_relevant_up_and_sum_to_zero() {
        let scores = [0.0, 0.0, 0.0, 0.0, 0.0];
        let labels = [0, 1, 0, 2, 0];
        let (grad, hess) = gradients(&scores, &labels, &[3, 2], 1.0, 30);

        assert!(grad[1] < 0.0);
        assert!(grad[0] > 0.0 && grad[2] > 0.0);
        assert!(grad[3] < 0.0 && grad[4] > 0.0);
        assert!(grad[..3].iter().sum::<f64>().abs() < 1e-12);
        assert!(grad[3..].iter().sum::<f64>().abs() < 1e-12);
        assert!(hess.iter().all(|&h| h >= 0.0));
    }

    #[test]
    fn groups_without_positives_get_no_gradient() {
        let (grad, hess) = gradients(&[0.3, 0.1], &[0, 0], &[2], 1.0, 30);
        assert_eq!(grad, vec![0.0, 0.0]);
        assert_eq!(hess, vec![0.0, 0.0]);
    }

    #[test]
    fn group_ranges_are_contiguous() {
        assert_eq!(group_ranges(&[2, 0, 3]), vec![0..2, 2..2, 2..5]);
    }
}
