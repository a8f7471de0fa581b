//! Core traits for GLM estimators.

use crate::core::{GlmResult, OptionsError};
use faer::{Col, Mat};
use thiserror::Error;

/// Errors that can occur while fitting or applying a GLM.
#[derive(Debug, Error)]
pub enum GlmError {
    #[error("dimension mismatch: X has {x_rows} rows but y has {y_len} elements")]
    DimensionMismatch { x_rows: usize, y_len: usize },

    #[error("feature mismatch: model was fit with {expected} features, X has {got}")]
    FeatureMismatch { expected: usize, got: usize },

    #[error("insufficient observations: need at least {needed}, got {got}")]
    InsufficientObservations { needed: usize, got: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(#[from] OptionsError),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("{operation} is not defined for the {distribution} family")]
    UnsupportedOperation {
        operation: &'static str,
        distribution: &'static str,
    },

    #[error("fit cancelled after {iterations} iterations")]
    Cancelled { iterations: usize },

    #[error("numerical error: {0}")]
    NumericalError(String),
}

/// A GLM estimator that can be fit to data.
///
/// Fitting returns a separate fitted type, so an unfitted estimator can never
/// be asked for predictions.
pub trait Regressor {
    /// The type of the fitted model.
    type Fitted: FittedRegressor;

    /// Fit the model to the data.
    ///
    /// # Arguments
    /// * `x` - Design matrix of shape (n_samples, n_features)
    /// * `y` - Response vector of length n_samples
    fn fit(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Self::Fitted, GlmError>;
}

/// A fitted GLM that can make predictions.
pub trait FittedRegressor {
    /// Predicted means μ = g⁻¹(β₀ + Xβ) for new data.
    fn predict(&self, x: &Mat<f64>) -> Result<Col<f64>, GlmError>;

    /// Access the fitted coefficients and diagnostics.
    fn result(&self) -> &GlmResult;

    /// Score the model on data with its configured metric.
    fn score(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<f64, GlmError>;

    /// Get the weights (convenience method).
    fn coefficients(&self) -> &Col<f64> {
        &self.result().coefficients
    }

    /// Get the intercept (convenience method).
    fn intercept(&self) -> f64 {
        self.result().intercept
    }

    /// Whether the underlying fit converged (convenience method).
    fn converged(&self) -> bool {
        self.result().diagnostics.converged()
    }
}
