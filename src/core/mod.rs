//! Core types for regularized GLMs.

mod distribution;
mod link;
mod options;
mod result;

pub use distribution::{Distribution, DEFAULT_EXP_THRESHOLD};
pub use link::{
    expit, inverse_mills_ratio, log_standard_normal_cdf, softplus, standard_normal_cdf,
    standard_normal_pdf, Link, MAX_EXP_ARG,
};
pub use options::{CancellationToken, GlmOptions, GlmOptionsBuilder, OptionsError};
pub use result::{FitDiagnostics, FitStatus, GlmResult};
