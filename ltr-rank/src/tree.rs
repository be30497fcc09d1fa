//! Histogram-binned regression trees grown leaf-wise on gradient statistics.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A leaf is not split further unless both children carry this much hessian.
const MIN_SUM_HESSIAN: f64 = 1e-3;

/// Per-feature bin boundaries learned from the training matrix.
///
/// A value `x` falls in bin `b` where `b` is the number of thresholds
/// strictly below `x`; so `bin(x) <= b` exactly when `x <= thresholds[b]`.
#[derive(Debug, Clone)]
pub(crate) struct FeatureBins {
    thresholds: Vec<Vec<f32>>,
}

impl FeatureBins {
    /// Learn at most `max_bin` bins per feature.
    pub fn fit<R: AsRef<[f32]> + Sync>(rows: &[R], num_features: usize, max_bin: usize) -> Self {
        let thresholds = (0..num_features)
            .into_par_iter()
            .map(|f| {
                let mut values: Vec<f32> = rows.iter().map(|r| r.as_ref()[f]).collect();
                values.sort_by(f32::total_cmp);
                let mut distinct = values.clone();
                distinct.dedup();

                if distinct.len() <= max_bin {
                    distinct.windows(2).map(|w| w[0] + (w[1] - w[0]) / 2.0).collect()
                } else {
                    let n = values.len();
                    let mut cuts: Vec<f32> =
                        (1..max_bin).map(|i| values[(i * n / max_bin).min(n - 1)]).collect();
                    cuts.dedup();
                    // A cut equal to the maximum would leave an empty last bin.
                    if cuts.last() == values.last() {
                        cuts.pop();
                    }
                    cuts
                }
            })
            .collect();
        Self { thresholds }
    }

    pub fn bin(&self, feature: usize, value: f32) -> u8 {
        self.thresholds[feature].partition_point(|&t| t < value) as u8
    }

    pub fn num_bins(&self, feature: usize) -> usize {
        self.thresholds[feature].len() + 1
    }

    pub fn threshold(&self, feature: usize, bin: u8) -> f32 {
        self.thresholds[feature][bin as usize]
    }

    /// Column-major binned copy of `rows`.
    pub fn transform<R: AsRef<[f32]> + Sync>(&self, rows: &[R]) -> Vec<Vec<u8>> {
        (0..self.thresholds.len())
            .into_par_iter()
            .map(|f| rows.iter().map(|r| self.bin(f, r.as_ref()[f])).collect())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf { value: f64 },
    Split { feature: usize, threshold: f32, bin: u8, left: usize, right: usize },
}

/// A single regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Output for a raw feature row.
    pub fn predict(&self, row: &[f32]) -> f64 {
        let mut at = 0;
        loop {
            match self.nodes[at] {
                Node::Leaf { value } => return value,
                Node::Split { feature, threshold, left, right, .. } => {
                    at = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    /// Output for row `i` of a binned column-major matrix.
    pub fn predict_binned(&self, binned: &[Vec<u8>], i: usize) -> f64 {
        let mut at = 0;
        loop {
            match self.nodes[at] {
                Node::Leaf { value } => return value,
                Node::Split { feature, bin, left, right, .. } => {
                    at = if binned[feature][i] <= bin { left } else { right };
                }
            }
        }
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }

    /// Largest feature index referenced by a split.
    pub fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Split { feature, .. } => Some(*feature),
                Node::Leaf { .. } => None,
            })
            .max()
    }

    /// Whether every child index points inside the node table and past its parent.
    pub fn is_well_formed(&self) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(i, n)| match *n {
                Node::Leaf { .. } => true,
                Node::Split { left, right, .. } => {
                    left > i && right > i && left < self.nodes.len() && right < self.nodes.len()
                }
            })
    }
}

/// Limits applied while growing one tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GrowthLimits {
    pub num_leaves: usize,
    pub max_depth: usize,
    pub min_data_in_leaf: usize,
    pub lambda_l2: f64,
    pub shrinkage: f64,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    bin: u8,
    gain: f64,
}

struct OpenLeaf {
    node: usize,
    rows: Vec<u32>,
    depth: usize,
    sum_grad: f64,
    sum_hess: f64,
    best: Option<SplitCandidate>,
}

fn leaf_score(g: f64, h: f64, lambda: f64) -> f64 {
    let denom = h + lambda;
    if denom <= f64::EPSILON { 0.0 } else { g * g / denom }
}

/// Grows trees for one training matrix.
pub(crate) struct TreeGrower<'a> {
    pub bins: &'a FeatureBins,
    pub binned: &'a [Vec<u8>],
    pub limits: GrowthLimits,
}

impl TreeGrower<'_> {
    /// Grow a tree over `rows` considering only `features`.
    pub fn grow(&self, grad: &[f64], hess: &[f64], rows: Vec<u32>, features: &[usize]) -> RegressionTree {
        let mut nodes = vec![Node::Leaf { value: 0.0 }];
        let mut open = vec![self.open_leaf(0, rows, 0, grad, hess, features)];

        while open.len() < self.limits.num_leaves {
            let Some(pos) = open
                .iter()
                .enumerate()
                .filter_map(|(i, leaf)| leaf.best.map(|b| (i, b.gain)))
                .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
                .map(|(i, _)| i)
            else {
                break;
            };

            let leaf = open.swap_remove(pos);
            let Some(split) = leaf.best else { break };
            let column = &self.binned[split.feature];
            let (left_rows, right_rows): (Vec<u32>, Vec<u32>) =
                leaf.rows.iter().copied().partition(|&r| column[r as usize] <= split.bin);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf { value: 0.0 });
            nodes.push(Node::Leaf { value: 0.0 });
            nodes[leaf.node] = Node::Split {
                feature: split.feature,
                threshold: self.bins.threshold(split.feature, split.bin),
                bin: split.bin,
                left,
                right,
            };
            open.push(self.open_leaf(left, left_rows, leaf.depth + 1, grad, hess, features));
            open.push(self.open_leaf(right, right_rows, leaf.depth + 1, grad, hess, features));
        }

        for leaf in open {
            let denom = leaf.sum_hess + self.limits.lambda_l2;
            let value = if denom <= f64::EPSILON {
                0.0
            } else {
                -leaf.sum_grad / denom * self.limits.shrinkage
            };
            nodes[leaf.node] = Node::Leaf { value };
        }
        RegressionTree { nodes }
    }

    fn open_leaf(
        &self,
        node: usize,
        rows: Vec<u32>,
        depth: usize,
        grad: &[f64],
        hess: &[f64],
        features: &[usize],
    ) -> OpenLeaf {
        let sum_grad = rows.iter().map(|&r| grad[r as usize]).sum();
        let sum_hess = rows.iter().map(|&r| hess[r as usize]).sum();
        let can_split = (self.limits.max_depth == 0 || depth < self.limits.max_depth)
            && rows.len() >= 2 * self.limits.min_data_in_leaf.max(1);
        let best = if can_split {
            self.best_split(&rows, grad, hess, sum_grad, sum_hess, features)
        } else {
            None
        };
        OpenLeaf { node, rows, depth, sum_grad, sum_hess, best }
    }

    fn best_split(
        &self,
        rows: &[u32],
        grad: &[f64],
        hess: &[f64],
        sum_grad: f64,
        sum_hess: f64,
        features: &[usize],
    ) -> Option<SplitCandidate> {
        let lambda = self.limits.lambda_l2;
        let min_data = self.limits.min_data_in_leaf.max(1);
        let parent = leaf_score(sum_grad, sum_hess, lambda);

        features
            .par_iter()
            .filter_map(|&feature| {
                let n_bins = self.bins.num_bins(feature);
                if n_bins < 2 {
                    return None;
                }
                let column = &self.binned[feature];
                let mut hist = vec![(0.0f64, 0.0f64, 0usize); n_bins];
                for &r in rows {
                    let slot = &mut hist[column[r as usize] as usize];
                    slot.0 += grad[r as usize];
                    slot.1 += hess[r as usize];
                    slot.2 += 1;
                }

                let (mut gl, mut hl, mut cl) = (0.0, 0.0, 0usize);
                let mut best: Option<SplitCandidate> = None;
                for (bin, &(g, h, c)) in hist.iter().enumerate().take(n_bins - 1) {
                    gl += g;
                    hl += h;
                    cl += c;
                    let (gr, hr, cr) = (sum_grad - gl, sum_hess - hl, rows.len() - cl);
                    if cl < min_data || cr < min_data {
                        continue;
                    }
                    if hl < MIN_SUM_HESSIAN || hr < MIN_SUM_HESSIAN {
                        continue;
                    }
                    let gain = leaf_score(gl, hl, lambda) + leaf_score(gr, hr, lambda) - parent;
                    if gain > 1e-12 && best.is_none_or(|b| gain > b.gain) {
                        best = Some(SplitCandidate { feature, bin: bin as u8, gain });
                    }
                }
                best
            })
            .max_by(|a, b| a.gain.total_cmp(&b.gain).then(b.feature.cmp(&a.feature)))
    }
}
