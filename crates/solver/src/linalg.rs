//! Dense linear algebra helpers on top of nalgebra.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Result of a QR rank probe on one matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankInfo {
    pub rows: usize,
    pub cols: usize,
    pub rank: usize,
    /// `min(rows, cols) - rank`.
    pub deficiency: usize,
}

/// Largest absolute entry, 0.0 for an empty vector.
pub fn max_abs(v: &DVector<f64>) -> f64 {
    v.iter().fold(0.0_f64, |m, x| m.max(x.abs()))
}

pub fn all_finite(v: &DVector<f64>) -> bool {
    v.iter().all(|x| x.is_finite())
}

/// Solve a square system `A x = b` with partial-pivot LU.
/// Returns `None` when `A` is singular or the solution is not finite.
pub fn solve_linear(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    if a.nrows() != a.ncols() || a.nrows() != b.len() {
        return None;
    }
    let x = a.clone().lu().solve(b)?;
    all_finite(&x).then_some(x)
}

/// Minimum-norm least-squares solution of `A x = b` through the SVD.
/// Singular values below `rel_eps` times the largest one are treated as zero.
pub fn solve_least_squares(
    a: &DMatrix<f64>,
    b: &DVector<f64>,
    rel_eps: f64,
) -> Option<DVector<f64>> {
    if a.nrows() != b.len() || a.ncols() == 0 || a.nrows() == 0 {
        return None;
    }
    let svd = a.clone().svd(true, true);
    let largest = svd.singular_values.max();
    if largest <= 0.0 {
        return Some(DVector::zeros(a.ncols()));
    }
    let x = svd.solve(b, rel_eps * largest).ok()?;
    all_finite(&x).then_some(x)
}

/// Numerical rank from column-pivoted QR: diagonal entries of R whose
/// magnitude is at most `threshold` times the largest one count as zero.
pub fn qr_rank(m: &DMatrix<f64>, threshold: f64) -> RankInfo {
    let rows = m.nrows();
    let cols = m.ncols();
    let expected = rows.min(cols);
    if expected == 0 {
        return RankInfo {
            rows,
            cols,
            rank: 0,
            deficiency: 0,
        };
    }

    if m.iter().all(|x| *x == 0.0) {
        return RankInfo {
            rows,
            cols,
            rank: 0,
            deficiency: expected,
        };
    }

    let r = m.clone().col_piv_qr().r();
    let diag: Vec<f64> = (0..expected).map(|i| r[(i, i)].abs()).collect();
    let largest = diag.iter().cloned().fold(0.0_f64, f64::max);
    let rank = if largest == 0.0 {
        0
    } else {
        diag.iter().filter(|&&d| d > threshold * largest).count()
    };

    RankInfo {
        rows,
        cols,
        rank,
        deficiency: expected - rank,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solve_linear_2x2() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
        let b = DVector::from_vec(vec![3.0, 5.0]);
        let x = solve_linear(&a, &b).unwrap();
        assert_relative_eq!(x[0], 0.8, epsilon = 1e-12);
        assert_relative_eq!(x[1], 1.4, epsilon = 1e-12);
    }

    #[test]
    fn test_solve_linear_singular() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let b = DVector::from_vec(vec![1.0, 1.0]);
        assert!(solve_linear(&a, &b).is_none());
    }

    #[test]
    fn test_least_squares_underdetermined_is_min_norm() {
        // x + y = 2 -> minimum norm solution (1, 1)
        let a = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        let b = DVector::from_vec(vec![2.0]);
        let x = solve_least_squares(&a, &b, 1e-12).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_qr_rank_full_and_deficient() {
        let full = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let info = qr_rank(&full, 1e-13);
        assert_eq!(info.rank, 2);
        assert_eq!(info.deficiency, 0);

        let dup = DMatrix::from_row_slice(2, 2, &[1.0, -1.0, 1.0, -1.0]);
        let info = qr_rank(&dup, 1e-13);
        assert_eq!(info.rank, 1);
        assert_eq!(info.deficiency, 1);
    }

    #[test]
    fn test_qr_rank_zero_matrix() {
        let z = DMatrix::<f64>::zeros(3, 2);
        assert_eq!(qr_rank(&z, 1e-13).rank, 0);
        assert_eq!(qr_rank(&z, 1e-13).deficiency, 2);
    }
}
