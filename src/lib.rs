//! Elastic-net regularized generalized linear models.
//!
//! GLMs are fit by proximal batch gradient descent over a family of
//! response distributions (Gaussian, Binomial, Probit, Poisson with softplus
//! or exponential link, Gamma, negative binomial), with elastic-net, group
//! lasso and Tikhonov penalties. `GlmCv` selects the penalty strength by
//! K-fold cross-validation over a regularization path.
//!
//! # Example
//!
//! ```rust,ignore
//! use elastic_glm::prelude::*;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! // Simulate a Poisson response from known coefficients
//! let mut rng = StdRng::seed_from_u64(0);
//! let y = simulate(&Distribution::Poisson, 0.3, &beta, &x, &mut rng)?;
//!
//! // Fit a single model
//! let fitted = GlmRegressor::builder()
//!     .distribution(Distribution::Poisson)
//!     .alpha(0.5)
//!     .reg_lambda(0.05)
//!     .build()
//!     .fit(&x, &y)?;
//! println!("converged: {}", fitted.converged());
//!
//! // Or let cross-validation choose lambda
//! let cv = GlmCv::builder()
//!     .distribution(Distribution::Poisson)
//!     .n_folds(5)
//!     .seed(1)
//!     .build()
//!     .fit(&x, &y)?;
//! println!("lambda = {}", cv.reg_lambda());
//! ```

pub mod core;
pub mod diagnostics;
pub mod simulate;
pub mod solvers;
pub mod utils;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::{
        CancellationToken, Distribution, FitDiagnostics, FitStatus, GlmOptions,
        GlmOptionsBuilder, GlmResult, OptionsError,
    };
    pub use crate::diagnostics::{accuracy, deviance, pseudo_r2, ScoreMetric};
    pub use crate::simulate::{predict_mean, simulate};
    pub use crate::solvers::{
        CvOptions, CvResult, FittedGlm, FittedGlmCv, FittedGlmPath, FittedRegressor, GlmCv,
        GlmError, GlmRegressor, LambdaPath, Regressor, SelectionRule,
    };
}

pub use crate::core::{
    CancellationToken, Distribution, FitDiagnostics, FitStatus, GlmOptions, GlmOptionsBuilder,
    GlmResult, OptionsError,
};
pub use crate::diagnostics::ScoreMetric;
pub use crate::simulate::simulate;
pub use crate::solvers::{
    FittedGlm, FittedGlmCv, FittedGlmPath, FittedRegressor, GlmCv, GlmError, GlmRegressor,
    LambdaPath, Regressor, SelectionRule,
};
