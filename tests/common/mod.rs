//! Common test utilities and data generators.

#![allow(dead_code)]

use elastic_glm::{simulate, Distribution};
use faer::linalg::solvers::{Qr, Solve};
use faer::{Col, Mat};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution as _, StandardNormal};

/// Design matrix with independent standard normal entries.
pub fn normal_design(n_samples: usize, n_features: usize, seed: u64) -> Mat<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut x = Mat::zeros(n_samples, n_features);
    for i in 0..n_samples {
        for j in 0..n_features {
            x[(i, j)] = StandardNormal.sample(&mut rng);
        }
    }
    x
}

/// Weight vector that is zero except at the given (index, value) pairs.
pub fn sparse_coefficients(n_features: usize, nonzero: &[(usize, f64)]) -> Col<f64> {
    let mut beta = Col::zeros(n_features);
    for &(j, v) in nonzero {
        beta[j] = v;
    }
    beta
}

/// Standard normal design with a response simulated from the family.
pub fn simulated_data(
    distribution: Distribution,
    intercept: f64,
    beta: &Col<f64>,
    n_samples: usize,
    seed: u64,
) -> (Mat<f64>, Col<f64>) {
    let x = normal_design(n_samples, beta.nrows(), seed);
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    let y = simulate(&distribution, intercept, beta, &x, &mut rng)
        .expect("simulation should succeed");
    (x, y)
}

/// Ordinary least squares with intercept via the normal equations.
///
/// Returns (intercept, weights).
pub fn ols_with_intercept(x: &Mat<f64>, y: &Col<f64>) -> (f64, Col<f64>) {
    let n = x.nrows();
    let p = x.ncols() + 1;

    // Design with a leading intercept column
    let design = Mat::from_fn(n, p, |i, j| if j == 0 { 1.0 } else { x[(i, j - 1)] });
    let rhs = Mat::from_fn(n, 1, |i, _| y[i]);
    let xtx = design.transpose() * &design;
    let xty = design.transpose() * &rhs;

    let qr: Qr<f64> = xtx.qr();
    let solution = qr.solve(xty.as_ref());

    (solution[(0, 0)], Col::from_fn(p - 1, |j| solution[(j + 1, 0)]))
}

/// Largest absolute difference between two vectors.
pub fn max_abs_diff(a: &Col<f64>, b: &Col<f64>) -> f64 {
    (0..a.nrows())
        .map(|i| (a[i] - b[i]).abs())
        .fold(0.0, f64::max)
}
