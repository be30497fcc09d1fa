//! Dense and sparse kernels for the truncated SVD behind the topic model.
//!
//! Dense matrices are stored as a `Vec` of columns. The sparse term-document
//! matrix is stored column-wise (one bag-of-words per document).

use rand::Rng;
use rayon::prelude::*;

/// Columns whose norm falls below this after orthogonalisation are dropped.
const RANK_TOLERANCE: f64 = 1e-10;

/// Sparse `n_rows x cols.len()` matrix stored by column.
#[derive(Debug, Clone)]
pub(crate) struct SparseColumns {
    pub n_rows: usize,
    pub cols: Vec<Vec<(u32, f64)>>,
}

impl SparseColumns {
    /// `A * x` for each dense column `x` (each of length `cols.len()`).
    pub fn mul(&self, xs: &[Vec<f64>]) -> Vec<Vec<f64>> {
        xs.par_iter()
            .map(|x| {
                let mut y = vec![0.0; self.n_rows];
                for (col, &weight) in self.cols.iter().zip(x) {
                    if weight == 0.0 {
                        continue;
                    }
                    for &(row, value) in col {
                        y[row as usize] += value * weight;
                    }
                }
                y
            })
            .collect()
    }

    /// `Aᵀ * q` for each dense column `q` (each of length `n_rows`).
    pub fn mul_transpose(&self, qs: &[Vec<f64>]) -> Vec<Vec<f64>> {
        qs.par_iter()
            .map(|q| {
                self.cols
                    .iter()
                    .map(|col| col.iter().map(|&(row, value)| value * q[row as usize]).sum())
                    .collect()
            })
            .collect()
    }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// `cols` uniform random columns of the given length.
pub(crate) fn random_columns(rng: &mut impl Rng, len: usize, cols: usize) -> Vec<Vec<f64>> {
    (0..cols).map(|_| (0..len).map(|_| rng.random_range(-1.0..1.0)).collect()).collect()
}

/// Modified Gram-Schmidt, run twice for stability. Linearly dependent
/// columns are removed, so the result may have fewer columns.
pub(crate) fn orthonormalize(cols: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    let mut basis: Vec<Vec<f64>> = Vec::with_capacity(cols.len());
    for mut col in cols {
        let original = dot(&col, &col).sqrt();
        for _ in 0..2 {
            for q in &basis {
                let proj = dot(&col, q);
                for (c, qv) in col.iter_mut().zip(q) {
                    *c -= proj * qv;
                }
            }
        }
        let norm = dot(&col, &col).sqrt();
        if norm <= RANK_TOLERANCE * original.max(1.0) {
            continue;
        }
        for c in &mut col {
            *c /= norm;
        }
        basis.push(col);
    }
    basis
}

/// Eigen-decomposition of a symmetric `n x n` row-major matrix by cyclic
/// Jacobi rotations.
///
/// Returns `(eigenvalues, eigenvectors)` where eigenvector `i` is column `i`
/// of the row-major `n x n` result.
pub(crate) fn symmetric_eigen(mut a: Vec<f64>, n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut v = vec![0.0; n * n];
    for i in 0..n {
        v[i * n + i] = 1.0;
    }

    let scale: f64 = a.iter().map(|x| x * x).sum::<f64>().max(f64::MIN_POSITIVE);
    for _sweep in 0..100 {
        let mut off = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                off += a[p * n + q] * a[p * n + q];
            }
        }
        if off <= 1e-24 * scale {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[p * n + q];
                if apq.abs() <= f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[q * n + q] - a[p * n + p]) / (2.0 * apq);
                let sign = if theta >= 0.0 { 1.0 } else { -1.0 };
                let t = sign / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[k * n + p];
                    let akq = a[k * n + q];
                    a[k * n + p] = c * akp - s * akq;
                    a[k * n + q] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[p * n + k];
                    let aqk = a[q * n + k];
                    a[p * n + k] = c * apk - s * aqk;
                    a[q * n + k] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[k * n + p];
                    let vkq = v[k * n + q];
                    v[k * n + p] = c * vkp - s * vkq;
                    v[k * n + q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let eigenvalues = (0..n).map(|i| a[i * n + i]).collect();
    (eigenvalues, v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jacobi_recovers_known_spectrum() {
        // [[2, 1], [1, 2]] has eigenvalues 1 and 3.
        let (mut values, _) = symmetric_eigen(vec![2.0, 1.0, 1.0, 2.0], 2);
        values.sort_by(f64::total_cmp);
        assert!((values[0] - 1.0).abs() < 1e-9);
        assert!((values[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn jacobi_eigenvectors_satisfy_definition() {
        let m = vec![4.0, 1.0, 0.5, 1.0, 3.0, 0.2, 0.5, 0.2, 1.0];
        let (values, vectors) = symmetric_eigen(m.clone(), 3);
        for i in 0..3 {
            let vec_i: Vec<f64> = (0..3).map(|r| vectors[r * 3 + i]).collect();
            for r in 0..3 {
                let mv: f64 = (0..3).map(|c| m[r * 3 + c] * vec_i[c]).sum();
                assert!((mv - values[i] * vec_i[r]).abs() < 1e-8);
            }
        }
    }

    #[test]
    fn orthonormalize_drops_dependent_columns() {
        let cols = vec![vec![1.0, 0.0, 0.0], vec![2.0, 0.0, 0.0], vec![1.0, 1.0, 0.0]];
        let basis = orthonormalize(cols);
        assert_eq!(basis.len(), 2);
        assert!(dot(&basis[0], &basis[1]).abs() < 1e-12);
        assert!((dot(&basis[1], &basis[1]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sparse_products_agree_with_dense() {
        // A = [[1, 0], [2, 3]] stored by column.
        let a = SparseColumns { n_rows: 2, cols: vec![vec![(0, 1.0), (1, 2.0)], vec![(1, 3.0)]] };
        assert_eq!(a.mul(&[vec![1.0, 1.0]]), vec![vec![1.0, 5.0]]);
        assert_eq!(a.mul_transpose(&[vec![1.0, 1.0]]), vec![vec![3.0, 3.0]]);
    }
}
