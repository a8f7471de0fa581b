//! Cross-validated selection of the penalty strength (GLMCV).
//!
//! Every λ of the path is scored by plain K-fold cross-validation. The
//! (λ, fold) fits are independent and dispatched in parallel with rayon;
//! results are collected in path order, so the outcome does not depend on
//! thread scheduling. The selected λ is refit on the full data.

use crate::core::{
    CancellationToken, Distribution, FitDiagnostics, GlmOptions, GlmOptionsBuilder, GlmResult,
    OptionsError,
};
use crate::diagnostics::ScoreMetric;
use crate::solvers::glm::{FittedGlm, GlmRegressor};
use crate::solvers::path::LambdaPath;
use crate::solvers::proximal::Penalty;
use crate::solvers::traits::{FittedRegressor, GlmError, Regressor};
use crate::utils::{select_elems, select_rows, KFold};
use faer::{Col, Mat};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

/// Rule used to pick λ from the cross-validated scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionRule {
    /// The λ with the best mean score; exact ties go to the larger λ.
    #[default]
    Best,
    /// The largest λ whose mean score is within one standard error of the best.
    OneStandardError,
}

/// Cross-validation settings.
#[derive(Debug, Clone)]
pub struct CvOptions {
    /// Penalty strengths to evaluate.
    pub lambda_path: LambdaPath,
    /// Number of folds K (default: 3).
    pub n_folds: usize,
    /// Shuffle samples before assigning folds (default: true).
    pub shuffle: bool,
    /// Seed of the fold shuffle (default: 0).
    pub seed: u64,
    /// Selection rule (default: best mean score).
    pub selection: SelectionRule,
    /// Walk the path per fold with warm starts instead of independent fits.
    pub warm_start: bool,
    /// Worker threads; `None` uses the global rayon pool.
    pub n_jobs: Option<usize>,
}

impl Default for CvOptions {
    fn default() -> Self {
        Self {
            lambda_path: LambdaPath::default(),
            n_folds: 3,
            shuffle: true,
            seed: 0,
            selection: SelectionRule::default(),
            warm_start: false,
            n_jobs: None,
        }
    }
}

impl CvOptions {
    /// Validate against the number of samples.
    pub fn validate(&self, n_samples: usize) -> Result<(), OptionsError> {
        if self.n_folds < 2 || self.n_folds > n_samples {
            return Err(OptionsError::InvalidFolds {
                n_folds: self.n_folds,
                n_samples,
            });
        }
        if self.n_jobs == Some(0) {
            return Err(OptionsError::InvalidJobs);
        }
        self.lambda_path.validate()
    }
}

/// Held-out outcome of one (λ, fold) fit.
#[derive(Debug, Clone)]
pub struct FoldFit {
    /// Fold index.
    pub fold: usize,
    /// Score on the held-out fold.
    pub score: f64,
    /// Diagnostics of the training fit; non-convergence is recorded here.
    pub diagnostics: FitDiagnostics,
}

/// Cross-validated scores along the path.
#[derive(Debug, Clone)]
pub struct CvResult {
    /// Metric the scores are expressed in.
    pub metric: ScoreMetric,
    /// Penalty strengths, descending.
    pub reg_lambdas: Vec<f64>,
    /// Mean held-out score per λ.
    pub mean_scores: Vec<f64>,
    /// Standard error of the mean score per λ.
    pub std_errors: Vec<f64>,
    /// Per-fold outcomes, indexed `[λ][fold]`.
    pub folds: Vec<Vec<FoldFit>>,
    /// Index of the selected λ.
    pub selected: usize,
}

impl CvResult {
    /// The selected penalty strength.
    pub fn selected_lambda(&self) -> f64 {
        self.reg_lambdas[self.selected]
    }

    /// Mean held-out score at the selected λ.
    pub fn selected_score(&self) -> f64 {
        self.mean_scores[self.selected]
    }

    /// Number of (λ, fold) fits that exhausted their iteration budget.
    pub fn n_not_converged(&self) -> usize {
        self.folds
            .iter()
            .flatten()
            .filter(|f| !f.diagnostics.converged())
            .count()
    }
}

/// Index of the best mean score; the first wins ties.
fn best_index(metric: ScoreMetric, means: &[f64]) -> usize {
    let mut best = 0;
    for k in 1..means.len() {
        if metric.is_better(means[k], means[best]) {
            best = k;
        }
    }
    best
}

/// Apply a selection rule to mean scores ordered by decreasing λ.
pub fn select_lambda(
    rule: SelectionRule,
    metric: ScoreMetric,
    means: &[f64],
    std_errors: &[f64],
) -> usize {
    let best = best_index(metric, means);
    match rule {
        SelectionRule::Best => best,
        SelectionRule::OneStandardError => {
            let se = if std_errors[best].is_finite() {
                std_errors[best]
            } else {
                0.0
            };
            let within = |m: f64| {
                if metric.higher_is_better() {
                    m >= means[best] - se
                } else {
                    m <= means[best] + se
                }
            };
            (0..=best).find(|&k| within(means[k])).unwrap_or(best)
        }
    }
}

fn mean_and_std_error(scores: &[f64]) -> (f64, f64) {
    let k = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / k;
    if scores.len() < 2 {
        return (mean, f64::NAN);
    }
    let var = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (k - 1.0);
    (mean, (var / k).sqrt())
}

/// Training and held-out data of one fold.
struct FoldData {
    x_train: Mat<f64>,
    y_train: Col<f64>,
    x_test: Mat<f64>,
    y_test: Col<f64>,
}

/// Elastic-net GLM with the penalty strength chosen by cross-validation.
///
/// # Example
///
/// ```rust,ignore
/// use elastic_glm::prelude::*;
///
/// let fitted = GlmCv::builder()
///     .distribution(Distribution::Binomial)
///     .alpha(1.0)
///     .n_folds(5)
///     .seed(42)
///     .build()
///     .fit(&x, &y)?;
///
/// println!("selected lambda = {}", fitted.reg_lambda());
/// for (l, s) in fitted.cv_result().reg_lambdas.iter().zip(&fitted.cv_result().mean_scores) {
///     println!("{l:.4} -> {s:.4}");
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct GlmCv {
    options: GlmOptions,
    cv: CvOptions,
}

impl GlmCv {
    /// Create a cross-validated estimator; `options.reg_lambda` is ignored.
    pub fn new(options: GlmOptions, cv: CvOptions) -> Self {
        Self { options, cv }
    }

    /// Create a builder for configuring the estimator.
    pub fn builder() -> GlmCvBuilder {
        GlmCvBuilder::default()
    }

    /// Model options shared by every fit.
    pub fn options(&self) -> &GlmOptions {
        &self.options
    }

    /// Cross-validation settings.
    pub fn cv_options(&self) -> &CvOptions {
        &self.cv
    }

    /// Score every (λ, fold) pair, returning outcomes indexed `[λ][fold]`.
    fn cross_validate(
        &self,
        regressor: &GlmRegressor,
        penalty: &Penalty,
        folds: &[FoldData],
        lambdas: &[f64],
    ) -> Result<Vec<Vec<FoldFit>>, GlmError> {
        let n_folds = folds.len();

        if self.cv.warm_start {
            let per_fold: Vec<Vec<FoldFit>> = (0..n_folds)
                .into_par_iter()
                .map(|f| {
                    let data = &folds[f];
                    let models =
                        regressor.fit_sequence(&data.x_train, &data.y_train, penalty, lambdas)?;
                    models
                        .iter()
                        .map(|m| fold_fit(f, m, data))
                        .collect::<Result<Vec<_>, GlmError>>()
                })
                .collect::<Result<_, GlmError>>()?;

            Ok((0..lambdas.len())
                .map(|l| per_fold.iter().map(|fits| fits[l].clone()).collect())
                .collect())
        } else {
            let flat: Vec<FoldFit> = (0..lambdas.len() * n_folds)
                .into_par_iter()
                .map(|t| {
                    let (l, f) = (t / n_folds, t % n_folds);
                    let data = &folds[f];
                    let model = regressor.fit_with_penalty(
                        &data.x_train,
                        &data.y_train,
                        penalty,
                        lambdas[l],
                        None,
                    )?;
                    fold_fit(f, &model, data)
                })
                .collect::<Result<_, GlmError>>()?;

            Ok(flat.chunks(n_folds).map(|c| c.to_vec()).collect())
        }
    }

    fn fit_inner(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<FittedGlmCv, GlmError> {
        let regressor = GlmRegressor::new(self.options.clone());
        regressor.validate_data(x, y)?;
        self.cv.validate(x.nrows())?;

        let lambdas = self.cv.lambda_path.resolve(x, y, &self.options)?;
        let penalty = Penalty::from_options(&self.options, x.ncols())?;

        let mut splitter = KFold::new(self.cv.n_folds);
        if self.cv.shuffle {
            splitter = splitter.with_shuffle(self.cv.seed);
        }
        let folds: Vec<FoldData> = splitter
            .split(x.nrows())
            .into_iter()
            .map(|(train, test)| FoldData {
                x_train: select_rows(x, &train),
                y_train: select_elems(y, &train),
                x_test: select_rows(x, &test),
                y_test: select_elems(y, &test),
            })
            .collect();

        log::info!(
            "cross-validating {} lambdas over {} folds ({} fits)",
            lambdas.len(),
            folds.len(),
            lambdas.len() * folds.len()
        );
        let outcomes = self.cross_validate(&regressor, &penalty, &folds, &lambdas)?;

        let metric = self.options.score_metric;
        let mut mean_scores = Vec::with_capacity(lambdas.len());
        let mut std_errors = Vec::with_capacity(lambdas.len());
        for (l, fits) in outcomes.iter().enumerate() {
            let scores: Vec<f64> = fits.iter().map(|f| f.score).collect();
            let (m, se) = mean_and_std_error(&scores);
            log::info!(
                "lambda {:.4e}: mean {} {:.6} (se {:.3e})",
                lambdas[l],
                metric,
                m,
                se
            );
            for fit in fits.iter().filter(|f| !f.diagnostics.converged()) {
                log::warn!(
                    "fold {} at lambda {:.4e} did not converge after {} iterations",
                    fit.fold,
                    lambdas[l],
                    fit.diagnostics.iterations
                );
            }
            mean_scores.push(m);
            std_errors.push(se);
        }

        let selected = select_lambda(self.cv.selection, metric, &mean_scores, &std_errors);
        let cv_result = CvResult {
            metric,
            reg_lambdas: lambdas,
            mean_scores,
            std_errors,
            folds: outcomes,
            selected,
        };
        log::info!(
            "selected lambda {:.4e} ({:?} rule, mean {} {:.6})",
            cv_result.selected_lambda(),
            self.cv.selection,
            metric,
            cv_result.selected_score()
        );

        let model =
            regressor.fit_with_penalty(x, y, &penalty, cv_result.selected_lambda(), None)?;

        Ok(FittedGlmCv {
            cv: self.cv.clone(),
            cv_result,
            model,
        })
    }
}

fn fold_fit(fold: usize, model: &FittedGlm, data: &FoldData) -> Result<FoldFit, GlmError> {
    Ok(FoldFit {
        fold,
        score: model.score(&data.x_test, &data.y_test)?,
        diagnostics: model.diagnostics().clone(),
    })
}

impl Regressor for GlmCv {
    type Fitted = FittedGlmCv;

    fn fit(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Self::Fitted, GlmError> {
        match self.cv.n_jobs {
            Some(n_jobs) => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(n_jobs)
                    .build()
                    .map_err(|e| GlmError::NumericalError(e.to_string()))?;
                pool.install(|| self.fit_inner(x, y))
            }
            None => self.fit_inner(x, y),
        }
    }
}

/// A GLM refit at the cross-validated penalty strength.
#[derive(Debug, Clone)]
pub struct FittedGlmCv {
    cv: CvOptions,
    cv_result: CvResult,
    model: FittedGlm,
}

impl FittedGlmCv {
    /// The selected penalty strength.
    pub fn reg_lambda(&self) -> f64 {
        self.cv_result.selected_lambda()
    }

    /// Per-λ cross-validated scores and fold diagnostics.
    pub fn cv_result(&self) -> &CvResult {
        &self.cv_result
    }

    /// Cross-validation settings used for the fit.
    pub fn cv_options(&self) -> &CvOptions {
        &self.cv
    }

    /// The model refit on the full data at the selected λ.
    pub fn best_model(&self) -> &FittedGlm {
        &self.model
    }

    /// Consume the result, keeping only the refit model.
    pub fn into_best_model(self) -> FittedGlm {
        self.model
    }

    /// Linear predictor of the refit model.
    pub fn predict_linear(&self, x: &Mat<f64>) -> Result<Col<f64>, GlmError> {
        self.model.predict_linear(x)
    }

    /// Class probabilities of the refit model; binary families only.
    pub fn predict_proba(&self, x: &Mat<f64>) -> Result<Col<f64>, GlmError> {
        self.model.predict_proba(x)
    }

    /// Predicted labels of the refit model; binary families only.
    pub fn predict_class(&self, x: &Mat<f64>) -> Result<Col<f64>, GlmError> {
        self.model.predict_class(x)
    }
}

impl FittedRegressor for FittedGlmCv {
    fn predict(&self, x: &Mat<f64>) -> Result<Col<f64>, GlmError> {
        self.model.predict(x)
    }

    fn result(&self) -> &GlmResult {
        self.model.result()
    }

    fn score(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<f64, GlmError> {
        self.model.score(x, y)
    }
}

/// Builder for `GlmCv`.
#[derive(Debug, Clone, Default)]
pub struct GlmCvBuilder {
    builder: GlmOptionsBuilder,
    cv: CvOptions,
}

impl GlmCvBuilder {
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
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.builder = self.builder.alpha(alpha);
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

    /// Set maximum iterations of every fit.
    pub fn max_iterations(mut self, max_iter: usize) -> Self {
        self.builder = self.builder.max_iterations(max_iter);
        self
    }

    /// Set convergence tolerance of every fit.
    pub fn tolerance(mut self, tol: f64) -> Self {
        self.builder = self.builder.tolerance(tol);
        self
    }

    /// Set the gradient step size.
    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.builder = self.builder.learning_rate(rate);
        self
    }

    /// Set the metric used to score held-out folds.
    pub fn score_metric(mut self, metric: ScoreMetric) -> Self {
        self.builder = self.builder.score_metric(metric);
        self
    }

    /// Log per-iteration diagnostics at debug level.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.builder = self.builder.verbose(verbose);
        self
    }

    /// Attach a cancellation token shared by every fit.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.builder = self.builder.cancel_token(token);
        self
    }

    /// Set the λ path.
    pub fn lambda_path(mut self, path: LambdaPath) -> Self {
        self.cv.lambda_path = path;
        self
    }

    /// Evaluate an explicit list of λ values.
    pub fn reg_lambdas(mut self, lambdas: Vec<f64>) -> Self {
        self.cv.lambda_path = LambdaPath::Explicit(lambdas);
        self
    }

    /// Set the number of folds.
    pub fn n_folds(mut self, n_folds: usize) -> Self {
        self.cv.n_folds = n_folds;
        self
    }

    /// Set whether to shuffle before assigning folds.
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.cv.shuffle = shuffle;
        self
    }

    /// Set the seed of the fold shuffle.
    pub fn seed(mut self, seed: u64) -> Self {
        self.cv.seed = seed;
        self
    }

    /// Set the selection rule.
    pub fn selection(mut self, rule: SelectionRule) -> Self {
        self.cv.selection = rule;
        self
    }

    /// Walk the path per fold with warm starts.
    pub fn warm_start(mut self, warm: bool) -> Self {
        self.cv.warm_start = warm;
        self
    }

    /// Run on a dedicated pool with `n_jobs` threads.
    pub fn n_jobs(mut self, n_jobs: usize) -> Self {
        self.cv.n_jobs = Some(n_jobs);
        self
    }

    /// Build the estimator; options are validated at fit time.
    pub fn build(self) -> GlmCv {
        GlmCv::new(self.builder.build_unchecked(), self.cv)
    }
}
