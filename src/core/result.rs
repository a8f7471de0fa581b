//! Fit result structures.

use faer::Col;

/// Terminal state of the proximal gradient loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStatus {
    /// The gradient norm fell below the tolerance.
    Converged,
    /// The iteration budget was exhausted; coefficients are the best seen.
    MaxIterReached,
}

/// Diagnostics of a single fit.
#[derive(Debug, Clone)]
pub struct FitDiagnostics {
    /// Number of proximal gradient iterations performed.
    pub iterations: usize,
    /// Gradient norm at the returned coefficients.
    pub grad_norm: f64,
    /// Whether the fit converged.
    pub status: FitStatus,
    /// Penalized objective at the returned coefficients.
    pub final_objective: f64,
    /// Penalized objective after every iteration, if tracking was requested.
    pub objective_history: Option<Vec<f64>>,
}

impl FitDiagnostics {
    /// Whether the solver met its tolerance.
    pub fn converged(&self) -> bool {
        self.status == FitStatus::Converged
    }
}

/// Coefficients and diagnostics of a regularized GLM fit.
#[derive(Debug, Clone)]
pub struct GlmResult {
    /// Unpenalized intercept β₀ (0 when fit without intercept).
    pub intercept: f64,

    /// Feature weights β.
    pub coefficients: Col<f64>,

    /// Penalty strength the model was fit at.
    pub reg_lambda: f64,

    /// Number of observations used in the fit.
    pub n_observations: usize,

    /// Convergence diagnostics.
    pub diagnostics: FitDiagnostics,
}

impl GlmResult {
    /// Number of features.
    pub fn n_features(&self) -> usize {
        self.coefficients.nrows()
    }

    /// Indices of the nonzero weights.
    pub fn active_set(&self) -> Vec<usize> {
        (0..self.coefficients.nrows())
            .filter(|&j| self.coefficients[j] != 0.0)
            .collect()
    }

    /// Number of nonzero weights.
    pub fn n_nonzero(&self) -> usize {
        self.active_set().len()
    }
}
