//! Model scoring (deviance, pseudo-R², accuracy).
//!
//! # Example
//!
//! ```rust,ignore
//! use elastic_glm::diagnostics::{deviance, pseudo_r2};
//!
//! let mu = fitted.predict(&x_test)?;
//! let d = deviance(&Distribution::Poisson, &y_test, &mu);
//! let r2 = pseudo_r2(&Distribution::Poisson, &y_test, &mu, fitted.null_mean());
//! ```

mod scores;

pub use scores::{accuracy, deviance, pseudo_r2, ScoreMetric};
