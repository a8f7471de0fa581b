//! Prediction and simulation from known coefficients.
//!
//! Used to generate reproducible synthetic datasets: the random source is
//! always passed in, so a seeded `StdRng` yields the same response every run.
//!
//! ```rust,ignore
//! use elastic_glm::{simulate, Distribution};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let y = simulate(&Distribution::Poisson, 0.5, &beta, &x, &mut rng)?;
//! ```

use crate::core::Distribution;
use crate::solvers::GlmError;
use crate::utils::linear_predictor;
use faer::{Col, Mat};
use rand::Rng;

/// Means μ = g⁻¹(β₀ + Xβ) for known coefficients.
pub fn predict_mean(
    distribution: &Distribution,
    intercept: f64,
    beta: &Col<f64>,
    x: &Mat<f64>,
) -> Result<Col<f64>, GlmError> {
    if x.ncols() != beta.nrows() {
        return Err(GlmError::FeatureMismatch {
            expected: beta.nrows(),
            got: x.ncols(),
        });
    }
    let z = linear_predictor(x, intercept, beta);
    Ok(Col::from_fn(z.nrows(), |i| distribution.mu(z[i])))
}

/// Draw one response per row of `x` from the family at μ(β₀ + Xβ).
pub fn simulate<R: Rng>(
    distribution: &Distribution,
    intercept: f64,
    beta: &Col<f64>,
    x: &Mat<f64>,
    rng: &mut R,
) -> Result<Col<f64>, GlmError> {
    distribution.validate()?;
    let mu = predict_mean(distribution, intercept, beta, x)?;

    let mut y = Col::zeros(mu.nrows());
    for i in 0..mu.nrows() {
        y[i] = distribution.sample(mu[i], rng).ok_or_else(|| {
            GlmError::NumericalError(format!(
                "cannot sample the {} family at mean {} (row {})",
                distribution, mu[i], i
            ))
        })?;
    }
    Ok(y)
}
