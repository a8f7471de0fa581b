//! Proximal gradient solvers for regularized GLMs.

mod cv;
mod glm;
mod path;
mod proximal;
mod traits;

pub use cv::{
    select_lambda, CvOptions, CvResult, FittedGlmCv, FoldFit, GlmCv, GlmCvBuilder, SelectionRule,
};
pub use glm::{FittedGlm, GlmRegressor, GlmRegressorBuilder};
pub use path::{lambda_max, logspace, FittedGlmPath, LambdaPath};
pub use proximal::{soft_threshold, GroupStructure, Penalty};
pub use traits::{FittedRegressor, GlmError, Regressor};
