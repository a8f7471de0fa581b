//! Regularization path tests.

mod common;

use common::{max_abs_diff, simulated_data, sparse_coefficients};
use elastic_glm::prelude::*;
use elastic_glm::solvers::{lambda_max, Penalty};

fn gaussian_data() -> (faer::Mat<f64>, faer::Col<f64>) {
    let beta = sparse_coefficients(6, &[(0, 1.5), (2, -1.0), (5, 0.5)]);
    simulated_data(Distribution::Gaussian, 0.2, &beta, 300, 31)
}

#[test]
fn test_auto_path_descends_from_lambda_max() {
    let (x, y) = gaussian_data();
    let regressor = GlmRegressor::builder()
        .distribution(Distribution::Gaussian)
        .alpha(1.0)
        .build();

    let path = regressor
        .fit_path(
            &x,
            &y,
            &LambdaPath::Auto {
                n_lambdas: 8,
                min_ratio: 0.01,
            },
        )
        .unwrap();

    assert_eq!(path.len(), 8);
    assert!(!path.is_empty());
    let lambdas = path.reg_lambdas();
    assert!(lambdas.windows(2).all(|w| w[0] > w[1]));

    let options = GlmOptions::lasso(Distribution::Gaussian, 1.0);
    let penalty = Penalty::from_options(&options, 6).unwrap();
    let boundary = lambda_max(&x, &y, &options, &penalty);
    assert!((lambdas[0] - boundary).abs() < 1e-12 * boundary.max(1.0));
    assert!((lambdas[7] - 0.01 * boundary).abs() < 1e-12 * boundary.max(1.0));

    // Sparsity loosens along the path
    let first = &path[0];
    let last = path.get(7).unwrap();
    assert!(first.n_nonzero() <= 1);
    assert!(last.n_nonzero() >= 3);
}

#[test]
fn test_explicit_path_above_lambda_max_is_empty_model() {
    let (x, y) = gaussian_data();
    let options = GlmOptions::lasso(Distribution::Gaussian, 1.0);
    let penalty = Penalty::from_options(&options, 6).unwrap();
    let boundary = lambda_max(&x, &y, &options, &penalty);

    let path = GlmRegressor::new(options)
        .fit_path(
            &x,
            &y,
            &LambdaPath::Explicit(vec![0.01 * boundary, 2.0 * boundary]),
        )
        .unwrap();

    // Resolved in descending order regardless of input order
    assert!(path[0].reg_lambda() > path[1].reg_lambda());
    assert_eq!(path[0].n_nonzero(), 0);
    assert!(path[1].n_nonzero() > 0);
    for model in &path {
        assert!(model.converged());
    }
}

#[test]
fn test_warm_path_matches_independent_fits() {
    let (x, y) = gaussian_data();
    let lambdas = vec![0.5, 0.2, 0.05];
    let regressor = GlmRegressor::builder()
        .distribution(Distribution::Gaussian)
        .alpha(0.5)
        .tolerance(1e-9)
        .max_iterations(20_000)
        .build();

    let path = regressor
        .fit_path(&x, &y, &LambdaPath::Explicit(lambdas.clone()))
        .unwrap();

    for (k, &reg_lambda) in lambdas.iter().enumerate() {
        let cold = GlmRegressor::builder()
            .distribution(Distribution::Gaussian)
            .alpha(0.5)
            .reg_lambda(reg_lambda)
            .tolerance(1e-9)
            .max_iterations(20_000)
            .build()
            .fit(&x, &y)
            .unwrap();
        assert!(max_abs_diff(path[k].coefficients(), cold.coefficients()) < 1e-6);
        assert!((path[k].intercept() - cold.intercept()).abs() < 1e-6);
    }
}

#[test]
fn test_best_by_score_prefers_less_regularized_for_strong_signal() {
    let (x, y) = gaussian_data();
    let path = GlmRegressor::builder()
        .distribution(Distribution::Gaussian)
        .build()
        .fit_path(&x, &y, &LambdaPath::classic())
        .unwrap();

    let scores = path.scores(&x, &y).unwrap();
    assert_eq!(scores.len(), 10);
    // Training deviance falls as the penalty relaxes
    assert!(scores[9] < scores[0]);

    let best = path.best_by_score(&x, &y).unwrap();
    assert!(best.reg_lambda() < path[0].reg_lambda());
}

#[test]
fn test_invalid_path_is_rejected() {
    let (x, y) = gaussian_data();
    let result = GlmRegressor::builder()
        .distribution(Distribution::Gaussian)
        .build()
        .fit_path(&x, &y, &LambdaPath::Explicit(vec![]));
    assert!(matches!(
        result,
        Err(GlmError::InvalidParameter(OptionsError::EmptyLambdaPath))
    ));
}
