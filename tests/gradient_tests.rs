//! Batch gradient checks against finite differences of the log-likelihood.

mod common;

use approx::assert_relative_eq;
use common::{normal_design, sparse_coefficients};
use elastic_glm::utils::{linear_predictor, scaled_transpose_product};
use elastic_glm::{simulate, Distribution};
use faer::Col;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn families() -> Vec<Distribution> {
    vec![
        Distribution::Gaussian,
        Distribution::Binomial,
        Distribution::Probit,
        Distribution::Poisson,
        Distribution::poisson_exp(),
        Distribution::gamma(3.0),
        Distribution::negative_binomial(2.0),
    ]
}

/// Mean negative log-likelihood at (β₀, β).
fn loss(distr: &Distribution, x: &faer::Mat<f64>, y: &Col<f64>, b0: f64, beta: &Col<f64>) -> f64 {
    let z = linear_predictor(x, b0, beta);
    -distr.log_likelihood(y, &z) / y.nrows() as f64
}

#[test]
fn test_batch_gradient_matches_finite_difference() {
    let n = 60;
    let p = 4;
    let x = normal_design(n, p, 21);
    let truth = sparse_coefficients(p, &[(0, 0.4), (2, -0.3)]);
    let mut rng = StdRng::seed_from_u64(99);
    let h = 1e-6;

    for distr in families() {
        let y = simulate(&distr, 0.2, &truth, &x, &mut rng).unwrap();

        for _ in 0..3 {
            // Randomized evaluation point
            let b0: f64 = rng.random_range(-0.5..0.5);
            let beta = Col::from_fn(p, |_| rng.random_range(-0.5..0.5));

            let z = linear_predictor(&x, b0, &beta);
            let d = distr.gradient(&y, &z);
            let analytic = scaled_transpose_product(&x, &d);
            let analytic_b0 = d.iter().sum::<f64>() / n as f64;

            for j in 0..p {
                let mut up = beta.clone();
                let mut down = beta.clone();
                up[j] += h;
                down[j] -= h;
                let numeric =
                    (loss(&distr, &x, &y, b0, &up) - loss(&distr, &x, &y, b0, &down)) / (2.0 * h);
                assert_relative_eq!(analytic[j], numeric, epsilon = 1e-5, max_relative = 1e-4);
            }

            let numeric_b0 =
                (loss(&distr, &x, &y, b0 + h, &beta) - loss(&distr, &x, &y, b0 - h, &beta))
                    / (2.0 * h);
            assert_relative_eq!(analytic_b0, numeric_b0, epsilon = 1e-5, max_relative = 1e-4);
        }
    }
}

#[test]
fn test_gradient_finite_far_from_origin() {
    // Large linear predictors must not overflow any family
    let y = Col::from_fn(3, |i| [0.0, 1.0, 1.0][i]);
    let z = Col::from_fn(3, |i| [-800.0, 0.0, 800.0][i]);
    for distr in families() {
        let response = if distr == Distribution::gamma(3.0) {
            Col::from_fn(3, |_| 1.0)
        } else {
            y.clone()
        };
        let g = distr.gradient(&response, &z);
        assert!(g.iter().all(|v| v.is_finite()), "{} gradient overflowed", distr);
        assert!(distr.log_likelihood(&response, &z).is_finite() || distr == Distribution::Gaussian);
    }
}
