//! Elastic-net regularized GLM fit by proximal batch gradient descent.

use crate::core::{
    CancellationToken, Distribution, FitDiagnostics, FitStatus, GlmOptions, GlmOptionsBuilder,
    GlmResult,
};
use crate::diagnostics::ScoreMetric;
use crate::simulate;
use crate::solvers::proximal::Penalty;
use crate::solvers::traits::{FittedRegressor, GlmError, Regressor};
use crate::utils::{distance, linear_predictor, mean, scaled_transpose_product};
use faer::{Col, Mat};
use rand::Rng;

/// Elastic-net regularized GLM estimator.
///
/// Minimizes the penalized negative log-likelihood
///
/// ```text
/// -(1/n) Σ log p(y_i | β₀ + x_iᵀβ) + λ [½(1-α)‖Γβ‖² + α P₁(β)]
/// ```
///
/// by proximal gradient descent with a fixed step size. The intercept is
/// never penalized. `P₁` is the elementwise L1 norm, or the sum of group
/// L2 norms for features assigned to a group.
///
/// # Example
///
/// ```rust,ignore
/// use elastic_glm::prelude::*;
///
/// let fitted = GlmRegressor::builder()
///     .distribution(Distribution::Poisson)
///     .alpha(0.5)
///     .reg_lambda(0.05)
///     .build()
///     .fit(&x, &y)?;
///
/// let mu = fitted.predict(&x_new)?;
/// if !fitted.converged() {
///     // retry with more iterations
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct GlmRegressor {
    options: GlmOptions,
}

impl GlmRegressor {
    /// Create a new GLM estimator with the given options.
    pub fn new(options: GlmOptions) -> Self {
        Self { options }
    }

    /// Create a builder for configuring the estimator.
    pub fn builder() -> GlmRegressorBuilder {
        GlmRegressorBuilder::default()
    }

    /// Get the options of this estimator.
    pub fn options(&self) -> &GlmOptions {
        &self.options
    }

    /// Fit starting from the given coefficients instead of zero.
    pub fn fit_from(
        &self,
        x: &Mat<f64>,
        y: &Col<f64>,
        intercept: f64,
        coefficients: &Col<f64>,
    ) -> Result<FittedGlm, GlmError> {
        self.validate_data(x, y)?;
        let penalty = Penalty::from_options(&self.options, x.ncols())?;
        self.fit_with_penalty(
            x,
            y,
            &penalty,
            self.options.reg_lambda,
            Some((intercept, coefficients)),
        )
    }

    /// Check the data against the options before any iteration.
    pub(crate) fn validate_data(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<(), GlmError> {
        if x.nrows() != y.nrows() {
            return Err(GlmError::DimensionMismatch {
                x_rows: x.nrows(),
                y_len: y.nrows(),
            });
        }
        if x.nrows() == 0 {
            return Err(GlmError::InsufficientObservations { needed: 1, got: 0 });
        }
        self.options.validate_for_features(x.ncols())?;

        let distribution = self.options.distribution;
        if let Some(i) = (0..y.nrows()).find(|&i| !distribution.supports_response(y[i])) {
            return Err(GlmError::InvalidResponse(format!(
                "y[{}] = {} is outside the support of the {} family",
                i, y[i], distribution
            )));
        }
        Ok(())
    }

    /// Fit at `reg_lambda` with a prebuilt penalty; the data must be validated.
    pub(crate) fn fit_with_penalty(
        &self,
        x: &Mat<f64>,
        y: &Col<f64>,
        penalty: &Penalty,
        reg_lambda: f64,
        warm_start: Option<(f64, &Col<f64>)>,
    ) -> Result<FittedGlm, GlmError> {
        let solver = ProximalGradient {
            x,
            y,
            distribution: self.options.distribution,
            penalty,
            reg_lambda,
            options: &self.options,
        };
        let result = solver.run(warm_start)?;

        let mut options = self.options.clone();
        options.reg_lambda = reg_lambda;
        Ok(FittedGlm {
            options,
            result,
            null_mean: mean(y),
        })
    }
}

impl Regressor for GlmRegressor {
    type Fitted = FittedGlm;

    fn fit(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Self::Fitted, GlmError> {
        self.validate_data(x, y)?;
        let penalty = Penalty::from_options(&self.options, x.ncols())?;
        self.fit_with_penalty(x, y, &penalty, self.options.reg_lambda, None)
    }
}

// ========== Solver ==========

/// States of the proximal gradient loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SolverState {
    Initializing,
    Iterating { iteration: usize },
    Converged { iterations: usize },
    MaxIterReached { iterations: usize },
}

/// A point visited by the solver with its objective and gradient norm.
struct Iterate {
    intercept: f64,
    beta: Col<f64>,
    objective: f64,
    grad_norm: f64,
}

struct ProximalGradient<'a> {
    x: &'a Mat<f64>,
    y: &'a Col<f64>,
    distribution: Distribution,
    penalty: &'a Penalty,
    reg_lambda: f64,
    options: &'a GlmOptions,
}

impl ProximalGradient<'_> {
    /// Penalized objective at linear predictor `z` and weights `beta`.
    fn objective(&self, z: &Col<f64>, beta: &Col<f64>) -> f64 {
        let n = self.y.nrows() as f64;
        -self.distribution.log_likelihood(self.y, z) / n + self.reg_lambda * self.penalty.value(beta)
    }

    fn run(&self, warm_start: Option<(f64, &Col<f64>)>) -> Result<GlmResult, GlmError> {
        let p = self.x.ncols();
        let step = self.options.learning_rate;
        let fit_intercept = self.options.fit_intercept;

        let mut intercept = 0.0;
        let mut beta = Col::zeros(p);
        let mut best: Option<Iterate> = None;
        let mut history = self.options.track_objective.then(Vec::new);
        let mut state = SolverState::Initializing;

        let (status, iterations) = loop {
            state = match state {
                SolverState::Initializing => {
                    if let Some((b0, b)) = warm_start {
                        if b.nrows() != p {
                            return Err(GlmError::FeatureMismatch {
                                expected: p,
                                got: b.nrows(),
                            });
                        }
                        intercept = if fit_intercept { b0 } else { 0.0 };
                        beta = b.clone();
                    }
                    SolverState::Iterating { iteration: 0 }
                }
                SolverState::Iterating { iteration } if iteration >= self.options.max_iterations => {
                    SolverState::MaxIterReached {
                        iterations: iteration,
                    }
                }
                SolverState::Iterating { iteration } => {
                    if self.options.is_cancelled() {
                        return Err(GlmError::Cancelled {
                            iterations: iteration,
                        });
                    }

                    let z = linear_predictor(self.x, intercept, &beta);
                    let objective = self.objective(&z, &beta);
                    let d = self.distribution.gradient(self.y, &z);

                    let mut grad = scaled_transpose_product(self.x, &d);
                    if let Some(l2) = self.penalty.smooth_gradient(&beta) {
                        for j in 0..p {
                            grad[j] += self.reg_lambda * l2[j];
                        }
                    }
                    let grad0 = if fit_intercept { mean(&d) } else { 0.0 };

                    let candidate = Col::from_fn(p, |j| beta[j] - step * grad[j]);
                    let beta_next = self.penalty.prox(&candidate, step, self.reg_lambda);
                    let intercept_next = intercept - step * grad0;

                    // Norm of the proximal gradient mapping (β - β⁺)/t
                    let moved = distance(&beta, &beta_next);
                    let grad_norm = (moved * moved + (step * grad0).powi(2)).sqrt() / step;

                    if let Some(ref mut h) = history {
                        h.push(objective);
                    }
                    if self.options.verbose {
                        log::debug!(
                            "iter {:>4}: objective {:.6e}, grad norm {:.3e}",
                            iteration,
                            objective,
                            grad_norm
                        );
                    }

                    if !objective.is_finite() || !grad_norm.is_finite() {
                        log::warn!(
                            "{} fit diverged at iteration {} (lambda = {:.4e}); reduce learning_rate",
                            self.distribution,
                            iteration,
                            self.reg_lambda
                        );
                        if best.is_none() {
                            return Err(GlmError::NumericalError(format!(
                                "non-finite objective at the starting point of the {} fit",
                                self.distribution
                            )));
                        }
                        SolverState::MaxIterReached {
                            iterations: iteration,
                        }
                    } else if grad_norm < self.options.tolerance {
                        // Return the proximal point, which carries exact zeros
                        let z_next = linear_predictor(self.x, intercept_next, &beta_next);
                        best = Some(Iterate {
                            intercept: intercept_next,
                            objective: self.objective(&z_next, &beta_next),
                            beta: beta_next,
                            grad_norm,
                        });
                        SolverState::Converged {
                            iterations: iteration + 1,
                        }
                    } else {
                        if best.as_ref().map_or(true, |b| objective < b.objective) {
                            best = Some(Iterate {
                                intercept,
                                beta: beta.clone(),
                                objective,
                                grad_norm,
                            });
                        }
                        beta = beta_next;
                        intercept = intercept_next;
                        SolverState::Iterating {
                            iteration: iteration + 1,
                        }
                    }
                }
                SolverState::Converged { iterations } => break (FitStatus::Converged, iterations),
                SolverState::MaxIterReached { iterations } => {
                    break (FitStatus::MaxIterReached, iterations)
                }
            };
        };

        let Some(best) = best else {
            // Only reachable with a zero iteration budget, which validation rejects
            return Err(GlmError::NumericalError(
                "solver finished without evaluating any iterate".to_string(),
            ));
        };

        if status == FitStatus::MaxIterReached {
            log::warn!(
                "{} fit at lambda = {:.4e} did not converge in {} iterations (grad norm {:.3e} > tol {:.1e})",
                self.distribution,
                self.reg_lambda,
                iterations,
                best.grad_norm,
                self.options.tolerance
            );
        }

        Ok(GlmResult {
            intercept: best.intercept,
            coefficients: best.beta,
            reg_lambda: self.reg_lambda,
            n_observations: self.y.nrows(),
            diagnostics: FitDiagnostics {
                iterations,
                grad_norm: best.grad_norm,
                status,
                final_objective: best.objective,
                objective_history: history,
            },
        })
    }
}

// ========== Fitted model ==========

/// A fitted elastic-net GLM.
#[derive(Debug, Clone)]
pub struct FittedGlm {
    options: GlmOptions,
    result: GlmResult,
    null_mean: f64,
}

impl FittedGlm {
    /// Get the options used to fit this model.
    pub fn options(&self) -> &GlmOptions {
        &self.options
    }

    /// Distribution family of the model.
    pub fn distribution(&self) -> Distribution {
        self.options.distribution
    }

    /// Get the lambda (regularization) parameter.
    pub fn reg_lambda(&self) -> f64 {
        self.result.reg_lambda
    }

    /// Get the alpha (L1/L2 mixing) parameter.
    pub fn alpha(&self) -> f64 {
        self.options.alpha
    }

    /// Mean response of the training data, the prediction of the null model.
    pub fn null_mean(&self) -> f64 {
        self.null_mean
    }

    /// Count non-zero coefficients (sparsity).
    pub fn n_nonzero(&self) -> usize {
        self.result.n_nonzero()
    }

    /// Fit diagnostics.
    pub fn diagnostics(&self) -> &FitDiagnostics {
        &self.result.diagnostics
    }

    fn check_features(&self, x: &Mat<f64>) -> Result<(), GlmError> {
        let expected = self.result.coefficients.nrows();
        if x.ncols() != expected {
            return Err(GlmError::FeatureMismatch {
                expected,
                got: x.ncols(),
            });
        }
        Ok(())
    }

    /// Linear predictor β₀ + Xβ for new data.
    pub fn predict_linear(&self, x: &Mat<f64>) -> Result<Col<f64>, GlmError> {
        self.check_features(x)?;
        Ok(linear_predictor(
            x,
            self.result.intercept,
            &self.result.coefficients,
        ))
    }

    /// Class probabilities P(y = 1); binary families only.
    pub fn predict_proba(&self, x: &Mat<f64>) -> Result<Col<f64>, GlmError> {
        self.require_binary("predict_proba")?;
        self.predict(x)
    }

    /// Predicted labels (1 when P(y = 1) > 0.5); binary families only.
    pub fn predict_class(&self, x: &Mat<f64>) -> Result<Col<f64>, GlmError> {
        self.require_binary("predict_class")?;
        let proba = self.predict(x)?;
        Ok(Col::from_fn(proba.nrows(), |i| {
            if proba[i] > 0.5 {
                1.0
            } else {
                0.0
            }
        }))
    }

    /// Score on data with an explicit metric instead of the configured one.
    pub fn score_with(
        &self,
        x: &Mat<f64>,
        y: &Col<f64>,
        metric: ScoreMetric,
    ) -> Result<f64, GlmError> {
        if x.nrows() != y.nrows() {
            return Err(GlmError::DimensionMismatch {
                x_rows: x.nrows(),
                y_len: y.nrows(),
            });
        }
        metric.check_distribution(&self.options.distribution)?;
        let mu = self.predict(x)?;
        Ok(metric.evaluate(&self.options.distribution, y, &mu, self.null_mean))
    }

    /// Draw a synthetic response from the fitted model at the rows of `x`.
    pub fn simulate<R: Rng>(&self, x: &Mat<f64>, rng: &mut R) -> Result<Col<f64>, GlmError> {
        self.check_features(x)?;
        simulate::simulate(
            &self.options.distribution,
            self.result.intercept,
            &self.result.coefficients,
            x,
            rng,
        )
    }

    fn require_binary(&self, operation: &'static str) -> Result<(), GlmError> {
        if self.options.distribution.is_binary() {
            Ok(())
        } else {
            Err(GlmError::UnsupportedOperation {
                operation,
                distribution: self.options.distribution.name(),
            })
        }
    }
}

impl FittedRegressor for FittedGlm {
    fn predict(&self, x: &Mat<f64>) -> Result<Col<f64>, GlmError> {
        let z = self.predict_linear(x)?;
        let distribution = self.options.distribution;
        Ok(Col::from_fn(z.nrows(), |i| distribution.mu(z[i])))
    }

    fn result(&self) -> &GlmResult {
        &self.result
    }

    fn score(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<f64, GlmError> {
        self.score_with(x, y, self.options.score_metric)
    }
}

/// Builder for `GlmRegressor`.
#[derive(Debug, Clone, Default)]
pub struct GlmRegressorBuilder {
    builder: GlmOptionsBuilder,
}

impl GlmRegressorBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the distribution family.
    pub fn distribution(mut self, distribution: Distribution) -> Self {
        self.builder = self.builder.distribution(distribution);
        self
    }

    /// Set the L1/L2 mixing parameter (alpha).
    /// - alpha = 1: pure Lasso (L1)
    /// - alpha = 0: pure Ridge (L2)
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.builder = self.builder.alpha(alpha);
        self
    }

    /// Set the regularization strength (lambda).
    pub fn reg_lambda(mut self, reg_lambda: f64) -> Self {
        self.builder = self.builder.reg_lambda(reg_lambda);
        self
    }

    /// Assign a group id to every feature (0 = ungrouped).
    pub fn group(mut self, group: Vec<usize>) -> Self {
        self.builder = self.builder.group(group);
        self
    }

    /// Set the Tikhonov matrix of the L2 penalty.
    pub fn tikhonov(mut self, tikhonov: Mat<f64>) -> Self {
        self.builder = self.builder.tikhonov(tikhonov);
        self
    }

    /// Set whether to fit an intercept.
    pub fn fit_intercept(mut self, fit: bool) -> Self {
        self.builder = self.builder.fit_intercept(fit);
        self
    }

    /// Set maximum iterations.
    pub fn max_iterations(mut self, max_iter: usize) -> Self {
        self.builder = self.builder.max_iterations(max_iter);
        self
    }

    /// Set convergence tolerance.
    pub fn tolerance(mut self, tol: f64) -> Self {
        self.builder = self.builder.tolerance(tol);
        self
    }

    /// Set the gradient step size.
    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.builder = self.builder.learning_rate(rate);
        self
    }

    /// Set the metric used by `score`.
    pub fn score_metric(mut self, metric: ScoreMetric) -> Self {
        self.builder = self.builder.score_metric(metric);
        self
    }

    /// Record the objective at every iteration.
    pub fn track_objective(mut self, track: bool) -> Self {
        self.builder = self.builder.track_objective(track);
        self
    }

    /// Log per-iteration diagnostics at debug level.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.builder = self.builder.verbose(verbose);
        self
    }

    /// Attach a cancellation token checked once per iteration.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.builder = self.builder.cancel_token(token);
        self
    }

    /// Build the GLM estimator; options are validated at fit time.
    pub fn build(self) -> GlmRegressor {
        GlmRegressor::new(self.builder.build_unchecked())
    }
}
