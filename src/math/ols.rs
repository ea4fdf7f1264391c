//! Linear least squares solver.
//!
//! Each Levenberg–Marquardt step solves a small damped linear problem
//!
//! ```text
//! minimize ‖J δ − r‖² + Σ_j d_j² δ_j²
//! ```
//!
//! which we express as one tall augmented system `[J; D] δ = [r; 0]` and solve
//! by SVD. This avoids forming `JᵀJ` explicitly (its condition number is the
//! square of `J`'s), and SVD stays well-behaved when columns are nearly
//! collinear (e.g. A and λ on a curve that has not reached its plateau).

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve the damped step `[J; diag(damping)] δ = [r; 0]`.
///
/// `jacobian` is `n × p`, `residuals` has length `n`, `damping` length `p`.
pub fn solve_damped_step(
    jacobian: &DMatrix<f64>,
    residuals: &DVector<f64>,
    damping: &[f64],
) -> Option<DVector<f64>> {
    let (n, p) = jacobian.shape();
    if residuals.len() != n || damping.len() != p {
        return None;
    }
    let mut a = DMatrix::<f64>::zeros(n + p, p);
    a.view_mut((0, 0), (n, p)).copy_from(jacobian);
    for (j, d) in damping.iter().enumerate() {
        a[(n + j, j)] = *d;
    }
    let mut b = DVector::<f64>::zeros(n + p);
    b.rows_mut(0, n).copy_from(residuals);
    solve_least_squares(&a, &b)
}
