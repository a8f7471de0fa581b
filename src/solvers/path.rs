//! Regularization paths: λ sequences and warm-started path fits.

use crate::core::{GlmOptions, OptionsError};
use crate::solvers::glm::{FittedGlm, GlmRegressor};
use crate::solvers::proximal::Penalty;
use crate::solvers::traits::{FittedRegressor, GlmError};
use crate::utils::{mean, scaled_transpose_product};
use faer::{Col, Mat};
use std::ops::Index;

/// Smallest α used when converting the L1 threshold into λ_max.
const MIN_ALPHA_FOR_LAMBDA_MAX: f64 = 1e-3;

/// Sequence of penalty strengths to fit.
///
/// Every variant resolves to strictly positive values sorted in descending
/// order, so paths always run from the most to the least regularized model.
#[derive(Debug, Clone, PartialEq)]
pub enum LambdaPath {
    /// User-supplied values.
    Explicit(Vec<f64>),
    /// `n` log-spaced values from `max` down to `min`.
    LogSpaced { max: f64, min: f64, n: usize },
    /// `n_lambdas` log-spaced values from λ_max down to `min_ratio · λ_max`,
    /// where λ_max is the smallest penalty that zeroes every weight.
    Auto { n_lambdas: usize, min_ratio: f64 },
}

impl Default for LambdaPath {
    fn default() -> Self {
        LambdaPath::Auto {
            n_lambdas: 10,
            min_ratio: 0.01,
        }
    }
}

impl LambdaPath {
    /// Fixed path of 10 values from 10^0.5 down to 10^-2.
    pub fn classic() -> Self {
        LambdaPath::LogSpaced {
            max: 10f64.powf(0.5),
            min: 0.01,
            n: 10,
        }
    }

    /// Check the path parameters that do not depend on data.
    pub fn validate(&self) -> Result<(), OptionsError> {
        match self {
            LambdaPath::Explicit(values) => {
                if values.is_empty() {
                    return Err(OptionsError::EmptyLambdaPath);
                }
                if let Some(&bad) = values.iter().find(|v| !(**v > 0.0 && v.is_finite())) {
                    return Err(OptionsError::NonPositivePathLambda(bad));
                }
            }
            LambdaPath::LogSpaced { max, min, n } => {
                if *n == 0 {
                    return Err(OptionsError::InvalidLambdaCount(*n));
                }
                for v in [*max, *min] {
                    if !(v > 0.0 && v.is_finite()) {
                        return Err(OptionsError::NonPositivePathLambda(v));
                    }
                }
            }
            LambdaPath::Auto {
                n_lambdas,
                min_ratio,
            } => {
                if *n_lambdas == 0 {
                    return Err(OptionsError::InvalidLambdaCount(*n_lambdas));
                }
                if !(*min_ratio > 0.0 && *min_ratio < 1.0) {
                    return Err(OptionsError::InvalidMinRatio(*min_ratio));
                }
            }
        }
        Ok(())
    }

    /// Resolve to concrete λ values, descending.
    pub fn resolve(
        &self,
        x: &Mat<f64>,
        y: &Col<f64>,
        options: &GlmOptions,
    ) -> Result<Vec<f64>, GlmError> {
        self.validate()?;
        let mut values = match self {
            LambdaPath::Explicit(values) => values.clone(),
            LambdaPath::LogSpaced { max, min, n } => logspace(*max, *min, *n),
            LambdaPath::Auto {
                n_lambdas,
                min_ratio,
            } => {
                let penalty = Penalty::from_options(options, x.ncols())?;
                let max = lambda_max(x, y, options, &penalty);
                logspace(max, max * min_ratio, *n_lambdas)
            }
        };
        values.sort_by(|a, b| b.total_cmp(a));
        Ok(values)
    }
}

/// `n` values evenly spaced in log scale from `start` to `end` inclusive.
pub fn logspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }
    let (log_start, log_end) = (start.ln(), end.ln());
    let step = (log_end - log_start) / (n - 1) as f64;
    (0..n)
        .map(|k| (log_start + step * k as f64).exp())
        .collect()
}

/// Smallest λ at which the penalized fit has all weights exactly zero.
///
/// Evaluated at the intercept-only model: the intercept solves its own
/// score equation at μ = mean(y), and the weights stay at zero as long as
/// the dual norm of the smooth gradient does not exceed λα. For α = 0 no
/// finite λ zeroes the weights, so α is floored at 1e-3.
pub fn lambda_max(x: &Mat<f64>, y: &Col<f64>, options: &GlmOptions, penalty: &Penalty) -> f64 {
    let distribution = options.distribution;
    let z0 = if options.fit_intercept {
        distribution.link().link(mean(y))
    } else {
        0.0
    };
    let z = Col::from_fn(y.nrows(), |_| z0);
    let grad = scaled_transpose_product(x, &distribution.gradient(y, &z));
    let value = penalty.groups().dual_norm(&grad) / options.alpha.max(MIN_ALPHA_FOR_LAMBDA_MAX);

    if value > 0.0 && value.is_finite() {
        value
    } else {
        log::debug!("degenerate lambda_max {:.3e}, falling back to 1.0", value);
        1.0
    }
}

/// Models fit along a regularization path, ordered by decreasing λ.
#[derive(Debug, Clone)]
pub struct FittedGlmPath {
    models: Vec<FittedGlm>,
}

impl FittedGlmPath {
    /// Number of models on the path.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the path is empty.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Model at position `index`.
    pub fn get(&self, index: usize) -> Option<&FittedGlm> {
        self.models.get(index)
    }

    /// Iterate over the models from most to least regularized.
    pub fn iter(&self) -> std::slice::Iter<'_, FittedGlm> {
        self.models.iter()
    }

    /// Penalty strengths of the path.
    pub fn reg_lambdas(&self) -> Vec<f64> {
        self.models.iter().map(|m| m.reg_lambda()).collect()
    }

    /// Score every model on data with its configured metric.
    pub fn scores(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Vec<f64>, GlmError> {
        self.models.iter().map(|m| m.score(x, y)).collect()
    }

    /// The best-scoring model on data; ties go to the larger λ.
    pub fn best_by_score(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<&FittedGlm, GlmError> {
        let scores = self.scores(x, y)?;
        let mut best = 0;
        for (k, model) in self.models.iter().enumerate().skip(1) {
            if model.options().score_metric.is_better(scores[k], scores[best]) {
                best = k;
            }
        }
        self.models.get(best).ok_or(GlmError::InvalidParameter(OptionsError::EmptyLambdaPath))
    }

    /// Consume the path, returning its models.
    pub fn into_models(self) -> Vec<FittedGlm> {
        self.models
    }
}

impl Index<usize> for FittedGlmPath {
    type Output = FittedGlm;

    fn index(&self, index: usize) -> &FittedGlm {
        &self.models[index]
    }
}

impl<'a> IntoIterator for &'a FittedGlmPath {
    type Item = &'a FittedGlm;
    type IntoIter = std::slice::Iter<'a, FittedGlm>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.iter()
    }
}

impl GlmRegressor {
    /// Fit one model per λ of `path`, warm-starting each from the previous.
    ///
    /// The `reg_lambda` of the options is ignored. A model that does not
    /// converge is kept on the path with its diagnostic flag set.
    pub fn fit_path(
        &self,
        x: &Mat<f64>,
        y: &Col<f64>,
        path: &LambdaPath,
    ) -> Result<FittedGlmPath, GlmError> {
        self.validate_data(x, y)?;
        let lambdas = path.resolve(x, y, self.options())?;
        let penalty = Penalty::from_options(self.options(), x.ncols())?;
        let models = self.fit_sequence(x, y, &penalty, &lambdas)?;
        Ok(FittedGlmPath { models })
    }

    /// Warm-started fits over `lambdas` in the given order.
    pub(crate) fn fit_sequence(
        &self,
        x: &Mat<f64>,
        y: &Col<f64>,
        penalty: &Penalty,
        lambdas: &[f64],
    ) -> Result<Vec<FittedGlm>, GlmError> {
        let mut models: Vec<FittedGlm> = Vec::with_capacity(lambdas.len());
        for (k, &reg_lambda) in lambdas.iter().enumerate() {
            let warm = models
                .last()
                .map(|prev| (prev.intercept(), prev.coefficients()));
            let fitted = self.fit_with_penalty(x, y, penalty, reg_lambda, warm)?;
            log::info!(
                "lambda {}/{} = {:.4e}: {} nonzero, {} iterations{}",
                k + 1,
                lambdas.len(),
                reg_lambda,
                fitted.n_nonzero(),
                fitted.diagnostics().iterations,
                if fitted.converged() { "" } else { " (not converged)" }
            );
            models.push(fitted);
        }
        Ok(models)
    }
}
