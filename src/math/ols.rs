//! Least squares solver.
//!
//! We solve small-to-medium regression problems of the form:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - SVD, so the solve works for tall, square and wide design matrices.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - Singular values below a relative tolerance are treated as zero. For a
//!   rank-deficient matrix this yields the minimum-norm solution instead of
//!   exploding coefficients, and the numerical rank is reported so the caller
//!   can warn about it.

use nalgebra::{DMatrix, DVector};

/// Solution of a least squares problem plus the conditioning facts behind it.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    pub beta: DVector<f64>,
    /// Number of singular values above `tolerance`.
    pub rank: usize,
    /// Singular values in decreasing order.
    pub singular_values: Vec<f64>,
    pub tolerance: f64,
}

impl LeastSquares {
    pub fn is_full_rank(&self) -> bool {
        self.rank == self.beta.len()
    }
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the matrix is empty or the solution is not finite.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<LeastSquares> {
    let (n, p) = x.shape();
    if n == 0 || p == 0 || y.len() != n {
        return None;
    }

    let svd = x.clone().svd(true, true);

    let mut singular_values: Vec<f64> = svd.singular_values.iter().copied().collect();
    singular_values.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    // Same cutoff LAPACK-style rank estimates use: max_sv * max(n, p) * eps.
    let max_sv = singular_values.first().copied().unwrap_or(0.0);
    let tolerance = max_sv * n.max(p) as f64 * f64::EPSILON;
    let rank = singular_values.iter().filter(|&&s| s > tolerance).count();

    let beta = svd.solve(y, tolerance).ok()?;
    if !beta.iter().all(|v| v.is_finite()) {
        return None;
    }

    Some(LeastSquares {
        beta,
        rank,
        singular_values,
        tolerance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let sol = solve_least_squares(&x, &y).unwrap();
        assert!((sol.beta[0] - 2.0).abs() < 1e-10);
        assert!((sol.beta[1] - 3.0).abs() < 1e-10);
        assert!(sol.is_full_rank());
    }

    #[test]
    fn collinear_columns_report_rank_and_stay_finite() {
        // Second column is exactly twice the first.
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0]);
        let y = DVector::from_row_slice(&[5.0, 10.0, 15.0]);

        let sol = solve_least_squares(&x, &y).unwrap();
        assert_eq!(sol.rank, 1);
        assert!(!sol.is_full_rank());
        // Minimum-norm solution: beta proportional to (1, 2) with x·beta = y.
        assert!((sol.beta[0] - 1.0).abs() < 1e-9);
        assert!((sol.beta[1] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn wide_system_is_solvable() {
        let x = DMatrix::from_row_slice(1, 3, &[1.0, 1.0, 1.0]);
        let y = DVector::from_row_slice(&[3.0]);
        let sol = solve_least_squares(&x, &y).unwrap();
        assert_eq!(sol.rank, 1);
        assert!((sol.beta.sum() - 3.0).abs() < 1e-10);
    }

    #[test]
    fn empty_system_is_rejected() {
        let x = DMatrix::<f64>::zeros(0, 2);
        let y = DVector::<f64>::zeros(0);
        assert!(solve_least_squares(&x, &y).is_none());
    }
}
