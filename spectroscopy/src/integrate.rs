//! Numerical integration over tabulated samples

use thiserror::Error;

/// Errors that can occur during numerical integration
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IntegrationError {
    #[error("Insufficient points for integration, need at least 2 points")]
    InsufficientPoints,

    #[error("Points must be in ascending order")]
    NotAscending,

    #[error("Abscissa and ordinate lengths differ ({x} vs {y})")]
    LengthMismatch { x: usize, y: usize },
}

fn check_abscissa(x: &[f64]) -> Result<(), IntegrationError> {
    if x.len() < 2 {
        return Err(IntegrationError::InsufficientPoints);
    }
    if x.windows(2).any(|w| w[1] <= w[0]) {
        return Err(IntegrationError::NotAscending);
    }
    Ok(())
}

fn check_samples(x: &[f64], y: &[f64]) -> Result<(), IntegrationError> {
    if x.len() != y.len() {
        return Err(IntegrationError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    check_abscissa(x)
}

/// Composite trapezoidal rule over sampled values `y(x)`.
pub fn trapezoid(x: &[f64], y: &[f64]) -> Result<f64, IntegrationError> {
    check_samples(x, y)?;

    // ∫[x₁,x₂] f(x)dx ≈ (x₂-x₁) × (f(x₁)+f(x₂))/2
    Ok(x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum())
}

/// Simpson's rule over consecutive sample pairs starting at `start`,
/// for irregularly spaced abscissae. Covers samples `start..=start + 2 * pairs`.
fn simpson_pairs(x: &[f64], y: &[f64], start: usize, pairs: usize) -> f64 {
    (0..pairs)
        .map(|k| {
            let i = start + 2 * k;
            let h0 = x[i + 1] - x[i];
            let h1 = x[i + 2] - x[i + 1];
            let hsum = h0 + h1;
            let hprod = h0 * h1;
            let h0_div_h1 = h0 / h1;

            hsum / 6.0
                * (y[i] * (2.0 - 1.0 / h0_div_h1)
                    + y[i + 1] * (hsum * hsum / hprod)
                    + y[i + 2] * (2.0 - h0_div_h1))
        })
        .sum()
}

/// Composite Simpson's rule over sampled values `y(x)`.
///
/// Works on irregular spacing. With an odd number of samples the parabolic
/// rule is applied to consecutive pairs of intervals. With an even number the
/// first `n - 1` samples use Simpson's rule and the final interval gets a
/// three-point correction that is exact for quadratics. Two samples fall
/// back to the trapezoidal rule.
pub fn simpson(x: &[f64], y: &[f64]) -> Result<f64, IntegrationError> {
    check_samples(x, y)?;

    let n = x.len();
    if n == 2 {
        return trapezoid(x, y);
    }

    if n % 2 == 1 {
        return Ok(simpson_pairs(x, y, 0, (n - 1) / 2));
    }

    let mut result = simpson_pairs(x, y, 0, (n - 2) / 2);

    let h0 = x[n - 2] - x[n - 3];
    let h1 = x[n - 1] - x[n - 2];
    let alpha = (2.0 * h1 * h1 + 3.0 * h0 * h1) / (6.0 * (h0 + h1));
    let beta = (h1 * h1 + 3.0 * h0 * h1) / (6.0 * h0);
    let eta = h1 * h1 * h1 / (6.0 * h0 * (h0 + h1));
    result += alpha * y[n - 1] + beta * y[n - 2] - eta * y[n - 3];

    Ok(result)
}
