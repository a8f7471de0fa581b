//! Goodness-of-fit scores for fitted GLMs.
//!
//! - **Deviance**: `2(log L_sat - log L)` averaged over samples, lower is better
//! - **Pseudo-R²**: `1 - D / D_null`, higher is better
//! - **Accuracy**: fraction of correctly classified labels (binary families)

use crate::core::{Distribution, OptionsError};
use faer::Col;
use std::fmt;
use std::str::FromStr;

/// Metric used to score a model on held-out data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreMetric {
    /// Mean deviance.
    #[default]
    Deviance,
    /// McFadden-style pseudo-R² against an intercept-only model.
    PseudoR2,
    /// Classification accuracy at the 0.5 threshold.
    Accuracy,
}

impl ScoreMetric {
    /// Tag of the metric.
    pub fn name(&self) -> &'static str {
        match self {
            ScoreMetric::Deviance => "deviance",
            ScoreMetric::PseudoR2 => "pseudo_r2",
            ScoreMetric::Accuracy => "accuracy",
        }
    }

    /// Whether larger values indicate a better model.
    pub fn higher_is_better(&self) -> bool {
        !matches!(self, ScoreMetric::Deviance)
    }

    /// Whether `a` is strictly better than `b` under this metric.
    pub fn is_better(&self, a: f64, b: f64) -> bool {
        if self.higher_is_better() {
            a > b
        } else {
            a < b
        }
    }

    /// Reject metric/family combinations that have no meaning.
    pub fn check_distribution(&self, distribution: &Distribution) -> Result<(), OptionsError> {
        if *self == ScoreMetric::Accuracy && !distribution.is_binary() {
            return Err(OptionsError::InvalidScoreMetric {
                metric: self.name(),
                distribution: distribution.name(),
            });
        }
        Ok(())
    }

    /// Evaluate the metric.
    ///
    /// `null_mean` is the mean prediction of the intercept-only model, used
    /// by pseudo-R² only.
    pub fn evaluate(
        &self,
        distribution: &Distribution,
        y: &Col<f64>,
        mu: &Col<f64>,
        null_mean: f64,
    ) -> f64 {
        match self {
            ScoreMetric::Deviance => deviance(distribution, y, mu),
            ScoreMetric::PseudoR2 => pseudo_r2(distribution, y, mu, null_mean),
            ScoreMetric::Accuracy => accuracy(y, mu),
        }
    }
}

impl FromStr for ScoreMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deviance" => Ok(ScoreMetric::Deviance),
            "pseudo_r2" | "pseudo-r2" => Ok(ScoreMetric::PseudoR2),
            "accuracy" => Ok(ScoreMetric::Accuracy),
            other => Err(format!("unknown score metric '{}'", other)),
        }
    }
}

impl fmt::Display for ScoreMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mean deviance `2/n · Σ (ℓ(y_i; y_i) - ℓ(y_i; μ_i))`.
pub fn deviance(distribution: &Distribution, y: &Col<f64>, mu: &Col<f64>) -> f64 {
    let n = y.nrows();
    let total: f64 = (0..n)
        .map(|i| {
            let saturated = distribution.log_likelihood_mu(y[i], y[i]);
            let model = distribution.log_likelihood_mu(y[i], mu[i]);
            saturated - model
        })
        .sum();
    2.0 * total / n as f64
}

/// Pseudo-R² `1 - D(μ) / D(null_mean)`.
///
/// A constant response with a perfect fit scores 1, any other fit of a
/// constant response scores 0.
pub fn pseudo_r2(distribution: &Distribution, y: &Col<f64>, mu: &Col<f64>, null_mean: f64) -> f64 {
    let null = Col::from_fn(y.nrows(), |_| null_mean);
    let d_model = deviance(distribution, y, mu);
    let d_null = deviance(distribution, y, &null);

    if d_null <= 0.0 {
        if d_model <= 1e-12 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - d_model / d_null
    }
}

/// Fraction of samples where `μ > 0.5` agrees with `y > 0.5`.
pub fn accuracy(y: &Col<f64>, mu: &Col<f64>) -> f64 {
    let n = y.nrows();
    let correct = (0..n).filter(|&i| (mu[i] > 0.5) == (y[i] > 0.5)).count();
    correct as f64 / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gaussian_deviance_is_mse() {
        let y = Col::from_fn(4, |i| i as f64);
        let mu = Col::from_fn(4, |i| i as f64 + 0.5);
        assert_relative_eq!(deviance(&Distribution::Gaussian, &y, &mu), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_deviance_zero_at_saturation() {
        let y = Col::from_fn(5, |i| [0.0, 1.0, 3.0, 0.0, 7.0][i]);
        for distr in [Distribution::Poisson, Distribution::negative_binomial(2.0)] {
            assert!(deviance(&distr, &y, &y).abs() < 1e-10);
        }
        let labels = Col::from_fn(3, |i| [0.0, 1.0, 1.0][i]);
        assert!(deviance(&Distribution::Binomial, &labels, &labels).abs() < 1e-10);
    }

    #[test]
    fn test_pseudo_r2_bounds() {
        let distr = Distribution::Poisson;
        let y = Col::from_fn(6, |i| [1.0, 4.0, 2.0, 6.0, 0.0, 3.0][i]);
        let null_mean = y.iter().sum::<f64>() / 6.0;
        let null = Col::from_fn(6, |_| null_mean);

        assert_relative_eq!(pseudo_r2(&distr, &y, &null, null_mean), 0.0, epsilon = 1e-12);
        assert_relative_eq!(pseudo_r2(&distr, &y, &y, null_mean), 1.0, epsilon = 1e-12);

        let partial = Col::from_fn(6, |i| 0.5 * (y[i] + null_mean));
        let r2 = pseudo_r2(&distr, &y, &partial, null_mean);
        assert!(r2 > 0.0 && r2 < 1.0);
    }

    #[test]
    fn test_pseudo_r2_constant_response() {
        let y = Col::from_fn(3, |_| 2.0);
        assert_eq!(pseudo_r2(&Distribution::Gaussian, &y, &y, 2.0), 1.0);
        let off = Col::from_fn(3, |_| 3.0);
        assert_eq!(pseudo_r2(&Distribution::Gaussian, &y, &off, 2.0), 0.0);
    }

    #[test]
    fn test_accuracy() {
        let y = Col::from_fn(4, |i| [0.0, 1.0, 1.0, 0.0][i]);
        let mu = Col::from_fn(4, |i| [0.2, 0.9, 0.4, 0.6][i]);
        assert_relative_eq!(accuracy(&y, &mu), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_metric_orientation() {
        assert!(ScoreMetric::Deviance.is_better(0.1, 0.2));
        assert!(ScoreMetric::PseudoR2.is_better(0.3, 0.2));
        assert!(!ScoreMetric::Accuracy.is_better(0.5, 0.5));
        assert_eq!("pseudo_r2".parse::<ScoreMetric>().unwrap(), ScoreMetric::PseudoR2);
    }
}
