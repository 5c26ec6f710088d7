//! Simple linear regression with the usual summary statistics.
//!
//! Coefficients come from the SVD least squares solver; correlation, standard
//! errors and the p-value come from centered sums:
//!
//! ```text
//! r      = Sxy / sqrt(Sxx * Syy)
//! se(b1) = sqrt((1 - r^2) * Syy / Sxx / (n - 2))
//! t      = r * sqrt((n - 2) / ((1 - r) (1 + r)))
//! ```
//!
//! Degenerate inputs:
//! - `n == 2`: standard errors are 0, p is 0 (or 1 if both y are equal)
//! - `Syy == 0`: r is 0
//! - r is clipped to `[-1, 1]`

use crate::math::dist::student_t_two_sided;
use crate::math::ols::fit_line;

/// Output of [`linregress`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinregressResult {
    pub slope: f64,
    pub intercept: f64,
    pub r: f64,
    pub p_value: f64,
    pub stderr: f64,
    pub intercept_stderr: f64,
}

/// Regress `y` on `x`.
///
/// Returns `None` when fewer than two points are given, the lengths differ,
/// or all `x` are identical (slope undefined).
pub fn linregress(x: &[f64], y: &[f64]) -> Option<LinregressResult> {
    let n = x.len();
    if n < 2 || y.len() != n {
        return None;
    }

    let nf = n as f64;
    let x_mean = x.iter().sum::<f64>() / nf;
    let y_mean = y.iter().sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - x_mean;
        let dy = yi - y_mean;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    if sxx == 0.0 {
        return None;
    }

    let (intercept, slope) = fit_line(x, y)?;

    let r = if syy == 0.0 {
        0.0
    } else {
        (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
    };

    let (p_value, stderr) = if n == 2 {
        let p = if y[0] == y[1] { 1.0 } else { 0.0 };
        (p, 0.0)
    } else {
        let df = nf - 2.0;
        let one_minus_r2 = ((1.0 - r) * (1.0 + r)).max(0.0);
        let p = if one_minus_r2 == 0.0 {
            0.0
        } else {
            let t = r * (df / one_minus_r2).sqrt();
            student_t_two_sided(t, df)
        };
        let stderr = (one_minus_r2 * syy / sxx / df).sqrt();
        (p, stderr)
    };

    // se(b0) = se(b1) * sqrt(Sxx / n + x_mean^2)
    let intercept_stderr = stderr * (sxx / nf + x_mean * x_mean).sqrt();

    Some(LinregressResult {
        slope,
        intercept,
        r,
        p_value,
        stderr,
        intercept_stderr,
    })
}
