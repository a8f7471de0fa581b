//! Distribution families for elastic-net regularized GLMs.
//!
//! A [`Distribution`] bundles an inverse link with the matching
//! log-likelihood. All per-sample quantities are expressed in terms of the
//! linear predictor `z = β₀ + xᵀβ`, which keeps the gradient exactly
//! consistent with the likelihood it differentiates.
//!
//! # Example
//!
//! ```rust,ignore
//! use elastic_glm::Distribution;
//!
//! let poisson: Distribution = "poisson".parse()?;
//! let mu = poisson.mu(0.3);
//! let d = poisson.gradient_unit(2.0, 0.3); // d(-log L)/dz for y = 2
//! ```

use super::link::{
    expit, inverse_mills_ratio, log_softplus, log_standard_normal_cdf, softplus, softplus_ratio,
    Link, MAX_EXP_ARG,
};
use super::options::OptionsError;
use faer::Col;
use rand::Rng;
use rand_distr::{Bernoulli, Distribution as _, Gamma, Poisson, StandardNormal};
use statrs::function::gamma::ln_gamma;
use std::fmt;
use std::str::FromStr;

/// Default linearization threshold for the canonical Poisson link.
pub const DEFAULT_EXP_THRESHOLD: f64 = 2.0;

/// Probabilities are kept this far away from 0 and 1 when scoring.
const PROB_EPS: f64 = 1e-15;

/// Distribution family of the response.
///
/// | tag            | inverse link                  | response      |
/// |----------------|-------------------------------|---------------|
/// | `gaussian`     | identity                      | real          |
/// | `binomial`     | logistic                      | {0, 1}        |
/// | `probit`       | standard normal CDF           | {0, 1}        |
/// | `poisson`      | softplus (default family)     | counts        |
/// | `poissonexp`   | exp, linear above `eta`       | counts        |
/// | `gamma`        | exp (log link)                | positive real |
/// | `neg-binomial` | softplus                      | counts        |
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distribution {
    /// Normal responses with unit variance.
    Gaussian,
    /// Bernoulli responses with logistic link.
    Binomial,
    /// Bernoulli responses with probit link.
    Probit,
    /// Poisson counts with softplus link.
    ///
    /// Grows linearly for large z, so gradient descent cannot overflow.
    Poisson,
    /// Poisson counts with the canonical exponential link.
    PoissonExp {
        /// Linear predictor above which exp(z) is continued linearly.
        eta: f64,
    },
    /// Gamma responses with log link.
    Gamma {
        /// Shape parameter ν; Var[Y] = μ²/ν.
        shape: f64,
    },
    /// Negative binomial counts with softplus link.
    NegativeBinomial {
        /// Dispersion θ; Var[Y] = μ + μ²/θ.
        theta: f64,
    },
}

impl Default for Distribution {
    fn default() -> Self {
        Distribution::Poisson
    }
}

impl FromStr for Distribution {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gaussian" => Ok(Distribution::Gaussian),
            "binomial" => Ok(Distribution::Binomial),
            "probit" => Ok(Distribution::Probit),
            "poisson" | "softplus" => Ok(Distribution::Poisson),
            "poissonexp" => Ok(Distribution::PoissonExp {
                eta: DEFAULT_EXP_THRESHOLD,
            }),
            "gamma" => Ok(Distribution::Gamma { shape: 1.0 }),
            "neg-binomial" | "negbinomial" => Ok(Distribution::NegativeBinomial { theta: 1.0 }),
            _ => Err(OptionsError::UnknownDistribution(s.to_string())),
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Distribution {
    /// Canonical Poisson with the default linearization threshold.
    pub fn poisson_exp() -> Self {
        Distribution::PoissonExp {
            eta: DEFAULT_EXP_THRESHOLD,
        }
    }

    /// Gamma with the given shape.
    pub fn gamma(shape: f64) -> Self {
        Distribution::Gamma { shape }
    }

    /// Negative binomial with the given dispersion.
    pub fn negative_binomial(theta: f64) -> Self {
        Distribution::NegativeBinomial { theta }
    }

    /// The tag this family parses from.
    pub fn name(&self) -> &'static str {
        match self {
            Distribution::Gaussian => "gaussian",
            Distribution::Binomial => "binomial",
            Distribution::Probit => "probit",
            Distribution::Poisson => "poisson",
            Distribution::PoissonExp { .. } => "poissonexp",
            Distribution::Gamma { .. } => "gamma",
            Distribution::NegativeBinomial { .. } => "neg-binomial",
        }
    }

    /// Check the family-specific parameters.
    pub fn validate(&self) -> Result<(), OptionsError> {
        match *self {
            Distribution::PoissonExp { eta } if !eta.is_finite() || eta.abs() > MAX_EXP_ARG => {
                Err(OptionsError::InvalidEta(eta))
            }
            Distribution::Gamma { shape } if !(shape > 0.0 && shape.is_finite()) => {
                Err(OptionsError::InvalidShape(shape))
            }
            Distribution::NegativeBinomial { theta } if !(theta > 0.0 && theta.is_finite()) => {
                Err(OptionsError::InvalidTheta(theta))
            }
            _ => Ok(()),
        }
    }

    /// The inverse link used by this family.
    pub fn link(&self) -> Link {
        match *self {
            Distribution::Gaussian => Link::Identity,
            Distribution::Binomial => Link::Logit,
            Distribution::Probit => Link::Probit,
            Distribution::Poisson | Distribution::NegativeBinomial { .. } => Link::Softplus,
            Distribution::PoissonExp { eta } => Link::LinearizedExp { eta },
            Distribution::Gamma { .. } => Link::Log,
        }
    }

    /// Whether responses are binary labels.
    pub fn is_binary(&self) -> bool {
        matches!(self, Distribution::Binomial | Distribution::Probit)
    }

    /// Whether a single response value lies in the support of the family.
    pub fn supports_response(&self, y: f64) -> bool {
        if !y.is_finite() {
            return false;
        }
        match self {
            Distribution::Gaussian => true,
            Distribution::Binomial | Distribution::Probit => (0.0..=1.0).contains(&y),
            Distribution::Poisson
            | Distribution::PoissonExp { .. }
            | Distribution::NegativeBinomial { .. } => y >= 0.0,
            Distribution::Gamma { .. } => y > 0.0,
        }
    }

    // ========== Link ==========

    /// Mean μ = g⁻¹(z).
    #[inline]
    pub fn mu(&self, z: f64) -> f64 {
        self.link().inverse(z)
    }

    /// Derivative dμ/dz.
    #[inline]
    pub fn grad_mu(&self, z: f64) -> f64 {
        self.link().inverse_derivative(z)
    }

    // ========== Likelihood ==========

    /// Log-likelihood of one observation as a function of the linear predictor.
    ///
    /// Constant terms (log y!, Gamma normalizers) are included, so values are
    /// comparable across models on the same data.
    pub fn log_likelihood_unit(&self, y: f64, z: f64) -> f64 {
        match *self {
            Distribution::Gaussian => -0.5 * (y - z) * (y - z),
            Distribution::Binomial => y * z - softplus(z),
            Distribution::Probit => {
                let mut ll = 0.0;
                if y > 0.0 {
                    ll += y * log_standard_normal_cdf(z);
                }
                if y < 1.0 {
                    ll += (1.0 - y) * log_standard_normal_cdf(-z);
                }
                ll
            }
            Distribution::Poisson => y * log_softplus(z) - softplus(z) - ln_gamma(y + 1.0),
            Distribution::PoissonExp { eta } => {
                let mu = self.mu(z);
                let log_mu = if z > eta { mu.ln() } else { z };
                y * log_mu - mu - ln_gamma(y + 1.0)
            }
            Distribution::Gamma { shape } => {
                let zc = z.clamp(-MAX_EXP_ARG, MAX_EXP_ARG);
                shape * shape.ln() - ln_gamma(shape) + (shape - 1.0) * y.ln()
                    - shape * zc
                    - shape * y * (-zc).exp()
            }
            Distribution::NegativeBinomial { theta } => {
                let mu = softplus(z);
                ln_gamma(y + theta) - ln_gamma(theta) - ln_gamma(y + 1.0) + theta * theta.ln()
                    + y * log_softplus(z)
                    - (theta + y) * (mu + theta).ln()
            }
        }
    }

    /// Derivative of the negative log-likelihood of one observation w.r.t. z.
    ///
    /// The batch gradient is Xᵀd/n for the weights and Σd/n for the intercept.
    pub fn gradient_unit(&self, y: f64, z: f64) -> f64 {
        match *self {
            Distribution::Gaussian => z - y,
            Distribution::Binomial => expit(z) - y,
            Distribution::Probit => {
                let mut g = 0.0;
                if y > 0.0 {
                    g -= y * inverse_mills_ratio(z);
                }
                if y < 1.0 {
                    g += (1.0 - y) * inverse_mills_ratio(-z);
                }
                g
            }
            Distribution::Poisson => expit(z) - y * softplus_ratio(z),
            Distribution::PoissonExp { eta } => {
                if z > eta {
                    eta.exp() * (1.0 - y / self.mu(z))
                } else {
                    z.exp() - y
                }
            }
            Distribution::Gamma { shape } => {
                if z.abs() > MAX_EXP_ARG {
                    0.0
                } else {
                    shape * (1.0 - y * (-z).exp())
                }
            }
            Distribution::NegativeBinomial { theta } => {
                let mu = softplus(z);
                expit(z) * (theta + y) / (mu + theta) - y * softplus_ratio(z)
            }
        }
    }

    /// Total log-likelihood over paired responses and linear predictors.
    pub fn log_likelihood(&self, y: &Col<f64>, z: &Col<f64>) -> f64 {
        (0..y.nrows())
            .map(|i| self.log_likelihood_unit(y[i], z[i]))
            .sum()
    }

    /// Per-sample gradient contributions d(-log L)/dz.
    pub fn gradient(&self, y: &Col<f64>, z: &Col<f64>) -> Col<f64> {
        Col::from_fn(y.nrows(), |i| self.gradient_unit(y[i], z[i]))
    }

    /// Log-likelihood of one observation given a predicted mean.
    ///
    /// Used for scoring, where the saturated model evaluates μ = y; terms of
    /// the form 0·log 0 are taken as 0.
    pub fn log_likelihood_mu(&self, y: f64, mu: f64) -> f64 {
        match *self {
            Distribution::Gaussian => -0.5 * (y - mu) * (y - mu),
            Distribution::Binomial | Distribution::Probit => {
                let m = mu.clamp(PROB_EPS, 1.0 - PROB_EPS);
                xlogy(y, m) + xlogy(1.0 - y, 1.0 - m)
            }
            Distribution::Poisson | Distribution::PoissonExp { .. } => {
                let m = mu.max(0.0);
                xlogy(y, m) - m - ln_gamma(y + 1.0)
            }
            Distribution::Gamma { shape } => {
                let m = mu.max(f64::MIN_POSITIVE);
                shape * shape.ln() - ln_gamma(shape) + (shape - 1.0) * y.ln()
                    - shape * m.ln()
                    - shape * y / m
            }
            Distribution::NegativeBinomial { theta } => {
                let m = mu.max(0.0);
                ln_gamma(y + theta) - ln_gamma(theta) - ln_gamma(y + 1.0) + theta * theta.ln()
                    + xlogy(y, m)
                    - (theta + y) * (m + theta).ln()
            }
        }
    }

    // ========== Simulation ==========

    /// Draw one response from the family at mean `mu`.
    ///
    /// Returns `None` when `mu` lies outside the parameter space of the
    /// sampling distribution.
    pub fn sample<R: Rng>(&self, mu: f64, rng: &mut R) -> Option<f64> {
        if !mu.is_finite() {
            return None;
        }
        match *self {
            Distribution::Gaussian => {
                let noise: f64 = rng.sample(StandardNormal);
                Some(mu + noise)
            }
            Distribution::Binomial | Distribution::Probit => {
                let draw = Bernoulli::new(mu).ok()?.sample(rng);
                Some(if draw { 1.0 } else { 0.0 })
            }
            Distribution::Poisson | Distribution::PoissonExp { .. } => sample_poisson(mu, rng),
            Distribution::Gamma { shape } => {
                let gamma = Gamma::new(shape, mu / shape).ok()?;
                Some(gamma.sample(rng))
            }
            Distribution::NegativeBinomial { theta } => {
                // Gamma-Poisson mixture
                if mu <= 0.0 {
                    return Some(0.0);
                }
                let gamma = Gamma::new(theta, mu / theta).ok()?;
                let rate = gamma.sample(rng);
                sample_poisson(rate, rng)
            }
        }
    }
}

fn sample_poisson<R: Rng>(mu: f64, rng: &mut R) -> Option<f64> {
    if mu <= 0.0 {
        return Some(0.0);
    }
    let poisson = Poisson::new(mu).ok()?;
    Some(poisson.sample(rng))
}

/// x·log(y) with 0·log(y) = 0.
#[inline]
fn xlogy(x: f64, y: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        x * y.ln()
    }
}
