//! Estimator options and configuration.

use super::distribution::Distribution;
use crate::diagnostics::ScoreMetric;
use faer::Mat;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Cooperative cancellation flag shared between a caller and running fits.
///
/// The solver checks the flag once per iteration; clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every fit holding a clone of this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Configuration options for a regularized GLM fit.
#[derive(Debug, Clone)]
pub struct GlmOptions {
    /// Distribution family of the response (default: softplus Poisson).
    pub distribution: Distribution,
    /// Elastic-net mixing parameter, 0 = ridge, 1 = lasso (default: 0.5).
    pub alpha: f64,
    /// Penalty strength λ (default: 0.1).
    pub reg_lambda: f64,
    /// Group id per feature for group lasso; id 0 means ungrouped.
    pub group: Option<Vec<usize>>,
    /// Tikhonov matrix Γ (n_features × n_features) of the L2 term ‖Γβ‖².
    pub tikhonov: Option<Mat<f64>>,
    /// Whether to fit an unpenalized intercept (default: true).
    pub fit_intercept: bool,
    /// Iteration budget of the proximal gradient loop (default: 1000).
    pub max_iterations: usize,
    /// Threshold on the gradient norm that declares convergence (default: 1e-6).
    pub tolerance: f64,
    /// Gradient step size (default: 0.2).
    pub learning_rate: f64,
    /// Metric used by `score` (default: deviance).
    pub score_metric: ScoreMetric,
    /// Record the penalized objective at every iteration (default: false).
    pub track_objective: bool,
    /// Emit per-iteration diagnostics through `log` (default: false).
    pub verbose: bool,
    /// Optional cooperative cancellation.
    pub cancel: Option<CancellationToken>,
}

impl Default for GlmOptions {
    fn default() -> Self {
        Self {
            distribution: Distribution::default(),
            alpha: 0.5,
            reg_lambda: 0.1,
            group: None,
            tikhonov: None,
            fit_intercept: true,
            max_iterations: 1000,
            tolerance: 1e-6,
            learning_rate: 0.2,
            score_metric: ScoreMetric::default(),
            track_objective: false,
            verbose: false,
            cancel: None,
        }
    }
}

/// Errors that can occur when validating options.
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("alpha must be in [0, 1], got {0}")]
    InvalidAlpha(f64),
    #[error("reg_lambda must be finite and non-negative, got {0}")]
    InvalidLambda(f64),
    #[error("lambda path must contain strictly positive values, got {0}")]
    NonPositivePathLambda(f64),
    #[error("lambda path is empty")]
    EmptyLambdaPath,
    #[error("number of lambdas must be at least 1, got {0}")]
    InvalidLambdaCount(usize),
    #[error("min_ratio must be in (0, 1), got {0}")]
    InvalidMinRatio(f64),
    #[error("unknown distribution '{0}'")]
    UnknownDistribution(String),
    #[error("invalid group specification: {0}")]
    InvalidGroup(String),
    #[error("tikhonov matrix must be {expected}x{expected}, got {rows}x{cols}")]
    InvalidTikhonov {
        expected: usize,
        rows: usize,
        cols: usize,
    },
    #[error("tolerance must be positive, got {0}")]
    InvalidTolerance(f64),
    #[error("max_iterations must be at least 1, got {0}")]
    InvalidMaxIterations(usize),
    #[error("learning_rate must be positive and finite, got {0}")]
    InvalidLearningRate(f64),
    #[error("gamma shape must be positive, got {0}")]
    InvalidShape(f64),
    #[error("negative binomial theta must be positive, got {0}")]
    InvalidTheta(f64),
    #[error("linearization threshold eta must be finite and at most 700, got {0}")]
    InvalidEta(f64),
    #[error("score metric '{metric}' is not defined for the {distribution} family")]
    InvalidScoreMetric {
        metric: &'static str,
        distribution: &'static str,
    },
    #[error("n_folds must be in [2, n_samples = {n_samples}], got {n_folds}")]
    InvalidFolds { n_folds: usize, n_samples: usize },
    #[error("n_jobs must be at least 1")]
    InvalidJobs,
}

impl GlmOptions {
    /// Create a new builder for GLM options.
    pub fn builder() -> GlmOptionsBuilder {
        GlmOptionsBuilder::default()
    }

    /// Options for a lasso fit of the given family.
    pub fn lasso(distribution: Distribution, reg_lambda: f64) -> Self {
        Self {
            distribution,
            alpha: 1.0,
            reg_lambda,
            ..Default::default()
        }
    }

    /// Options for a ridge fit of the given family.
    pub fn ridge(distribution: Distribution, reg_lambda: f64) -> Self {
        Self {
            distribution,
            alpha: 0.0,
            reg_lambda,
            ..Default::default()
        }
    }

    /// Validate the options that do not depend on the data.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(OptionsError::InvalidAlpha(self.alpha));
        }
        if !(self.reg_lambda >= 0.0 && self.reg_lambda.is_finite()) {
            return Err(OptionsError::InvalidLambda(self.reg_lambda));
        }
        if !(self.tolerance > 0.0) {
            return Err(OptionsError::InvalidTolerance(self.tolerance));
        }
        if self.max_iterations < 1 {
            return Err(OptionsError::InvalidMaxIterations(self.max_iterations));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(OptionsError::InvalidLearningRate(self.learning_rate));
        }
        self.distribution.validate()?;
        self.score_metric.check_distribution(&self.distribution)?;
        if let Some(ref group) = self.group {
            if group.is_empty() {
                return Err(OptionsError::InvalidGroup(
                    "group assignment is empty".to_string(),
                ));
            }
        }
        if let Some(ref tikhonov) = self.tikhonov {
            if tikhonov.nrows() != tikhonov.ncols() {
                return Err(OptionsError::InvalidTikhonov {
                    expected: tikhonov.nrows(),
                    rows: tikhonov.nrows(),
                    cols: tikhonov.ncols(),
                });
            }
        }
        Ok(())
    }

    /// Validate the options against the number of features of a design matrix.
    pub fn validate_for_features(&self, n_features: usize) -> Result<(), OptionsError> {
        self.validate()?;
        if let Some(ref group) = self.group {
            if group.len() != n_features {
                return Err(OptionsError::InvalidGroup(format!(
                    "expected one group id per feature ({}), got {}",
                    n_features,
                    group.len()
                )));
            }
        }
        if let Some(ref tikhonov) = self.tikhonov {
            if tikhonov.nrows() != n_features || tikhonov.ncols() != n_features {
                return Err(OptionsError::InvalidTikhonov {
                    expected: n_features,
                    rows: tikhonov.nrows(),
                    cols: tikhonov.ncols(),
                });
            }
        }
        Ok(())
    }

    /// Whether cancellation was requested through the configured token.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|token| token.is_cancelled())
    }
}

/// Builder for `GlmOptions`.
#[derive(Debug, Clone, Default)]
pub struct GlmOptionsBuilder {
    options: GlmOptions,
}

impl GlmOptionsBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the distribution family.
    pub fn distribution(mut self, distribution: Distribution) -> Self {
        self.options.distribution = distribution;
        self
    }

    /// Set the elastic-net mixing parameter (alpha).
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.options.alpha = alpha;
        self
    }

    /// Set the penalty strength (lambda).
    pub fn reg_lambda(mut self, reg_lambda: f64) -> Self {
        self.options.reg_lambda = reg_lambda;
        self
    }

    /// Set the group id of every feature (0 = ungrouped).
    pub fn group(mut self, group: Vec<usize>) -> Self {
        self.options.group = Some(group);
        self
    }

    /// Set the Tikhonov matrix of the L2 penalty.
    pub fn tikhonov(mut self, tikhonov: Mat<f64>) -> Self {
        self.options.tikhonov = Some(tikhonov);
        self
    }

    /// Set whether to fit an intercept.
    pub fn fit_intercept(mut self, fit: bool) -> Self {
        self.options.fit_intercept = fit;
        self
    }

    /// Set the iteration budget.
    pub fn max_iterations(mut self, max_iter: usize) -> Self {
        self.options.max_iterations = max_iter;
        self
    }

    /// Set the convergence tolerance.
    pub fn tolerance(mut self, tol: f64) -> Self {
        self.options.tolerance = tol;
        self
    }

    /// Set the gradient step size.
    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.options.learning_rate = rate;
        self
    }

    /// Set the metric used by `score`.
    pub fn score_metric(mut self, metric: ScoreMetric) -> Self {
        self.options.score_metric = metric;
        self
    }

    /// Record the objective value at every iteration.
    pub fn track_objective(mut self, track: bool) -> Self {
        self.options.track_objective = track;
        self
    }

    /// Emit per-iteration diagnostics.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.options.verbose = verbose;
        self
    }

    /// Attach a cancellation token.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.options.cancel = Some(token);
        self
    }

    /// Build and validate the options.
    pub fn build(self) -> Result<GlmOptions, OptionsError> {
        self.options.validate()?;
        Ok(self.options)
    }

    /// Build the options without validation.
    pub fn build_unchecked(self) -> GlmOptions {
        self.options
    }
}
