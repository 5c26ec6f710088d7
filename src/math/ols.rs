//! Least squares solver for straight-line calibration fits.
//!
//! We solve
//!
//! ```text
//! minimize Σ (y_i - (b0 + b1 x_i))^2
//! ```
//!
//! by building the `n × 2` design matrix `[1, x_i]` and solving it with SVD,
//! which handles tall systems and reports near-singular designs instead of
//! producing garbage coefficients.

use nalgebra::{DMatrix, DVector};

/// Build the `[1, x]` design matrix for a straight-line fit.
pub fn line_design(x: &[f64]) -> DMatrix<f64> {
    DMatrix::from_fn(x.len(), 2, |r, c| if c == 0 { 1.0 } else { x[r] })
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() < x.ncols() || x.nrows() != y.len() {
        return None;
    }
    let svd = x.clone().svd(true, true);

    // A rank-deficient design (e.g. all x identical) shows up as a vanishing
    // singular value relative to the largest one.
    let s_max = svd.singular_values.max();
    let s_min = svd.singular_values.min();
    if !(s_max.is_finite() && s_max > 0.0) || s_min <= s_max * 1e-12 {
        return None;
    }

    let beta = svd.solve(y, s_max * 1e-12).ok()?;
    beta.iter().all(|v| v.is_finite()).then_some(beta)
}

/// Fit `y = intercept + slope * x`, returning `(intercept, slope)`.
///
/// The design is built on `x - mean(x)` so a large common offset in `x` does
/// not make the `[1, x]` columns nearly collinear; the intercept is shifted
/// back afterwards.
pub fn fit_line(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let x_mean = x.iter().sum::<f64>() / x.len() as f64;
    let centered: Vec<f64> = x.iter().map(|v| v - x_mean).collect();

    let design = line_design(&centered);
    let rhs = DVector::from_column_slice(y);
    let beta = solve_least_squares(&design, &rhs)?;
    let slope = beta[1];
    Some((beta[0] - slope * x_mean, slope))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn fit_line_through_two_points() {
        let (intercept, slope) = fit_line(&[10.0, 20.0], &[1.0, 2.0]).unwrap();
        assert!(intercept.abs() < 1e-10);
        assert!((slope - 0.1).abs() < 1e-12);
    }

    #[test]
    fn fit_line_handles_large_x_offset() {
        let x = [1e6, 1e6 + 1.0, 1e6 + 2.0];
        let (intercept, slope) = fit_line(&x, &[1.0, 2.0, 3.0]).unwrap();
        assert!((slope - 1.0).abs() < 1e-9);
        assert!((intercept + 999_999.0).abs() < 1e-6);
    }

    #[test]
    fn fit_line_rejects_constant_x() {
        assert!(fit_line(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0]).is_none());
    }
}
