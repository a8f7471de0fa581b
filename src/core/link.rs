//! Inverse link functions and the scalar special functions behind them.
//!
//! Every distribution family maps its linear predictor `z` to a mean through
//! one of the links below. The functions are written to stay finite for any
//! finite `z`, so callers never see overflow from the exponential links.

use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::{FRAC_1_SQRT_2, PI, SQRT_2};

/// Largest linear predictor passed to `exp` by the log link.
pub const MAX_EXP_ARG: f64 = 700.0;

/// Below this value `log Φ(z)` switches to its asymptotic expansion.
const LOG_CDF_TAIL: f64 = -20.0;

/// Inverse link function g⁻¹ mapping the linear predictor to the mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Link {
    /// μ = z
    Identity,
    /// μ = 1 / (1 + exp(-z))
    Logit,
    /// μ = Φ(z), the standard normal CDF
    Probit,
    /// μ = log(1 + exp(z))
    Softplus,
    /// μ = exp(z) for z ≤ eta, continued linearly with slope exp(eta) above.
    LinearizedExp {
        /// Threshold above which the exponential is replaced by its tangent.
        eta: f64,
    },
    /// μ = exp(z), with z clamped at [`MAX_EXP_ARG`]
    Log,
}

impl Link {
    /// Compute the inverse link μ = g⁻¹(z).
    #[inline]
    pub fn inverse(&self, z: f64) -> f64 {
        match self {
            Link::Identity => z,
            Link::Logit => expit(z),
            Link::Probit => standard_normal_cdf(z),
            Link::Softplus => softplus(z),
            Link::LinearizedExp { eta } => {
                if z > *eta {
                    eta.exp() * (z - eta + 1.0)
                } else {
                    z.exp()
                }
            }
            Link::Log => z.clamp(-MAX_EXP_ARG, MAX_EXP_ARG).exp(),
        }
    }

    /// Compute the derivative dμ/dz of the inverse link.
    #[inline]
    pub fn inverse_derivative(&self, z: f64) -> f64 {
        match self {
            Link::Identity => 1.0,
            Link::Logit => {
                let s = expit(z);
                s * (1.0 - s)
            }
            Link::Probit => standard_normal_pdf(z),
            Link::Softplus => expit(z),
            Link::LinearizedExp { eta } => {
                if z > *eta {
                    eta.exp()
                } else {
                    z.exp()
                }
            }
            Link::Log => {
                if z.abs() > MAX_EXP_ARG {
                    0.0
                } else {
                    z.exp()
                }
            }
        }
    }

    /// Compute the link z = g(μ).
    ///
    /// Only used to place the intercept-only model on the linear predictor
    /// scale, so μ is clamped into the open range of the inverse link.
    pub fn link(&self, mu: f64) -> f64 {
        match self {
            Link::Identity => mu,
            Link::Logit => {
                let m = mu.clamp(1e-10, 1.0 - 1e-10);
                (m / (1.0 - m)).ln()
            }
            Link::Probit => {
                let m = mu.clamp(1e-10, 1.0 - 1e-10);
                -SQRT_2 * erfc_inv(2.0 * m)
            }
            Link::Softplus => {
                let m = mu.max(1e-10);
                if m > 35.0 {
                    m
                } else {
                    m.exp_m1().ln()
                }
            }
            Link::LinearizedExp { eta } => {
                let m = mu.max(1e-10);
                let knot = eta.exp();
                if m > knot {
                    m / knot + eta - 1.0
                } else {
                    m.ln()
                }
            }
            Link::Log => mu.max(1e-10).ln(),
        }
    }
}

/// Logistic function σ(z) = 1 / (1 + exp(-z)), stable for large |z|.
#[inline]
pub fn expit(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Softplus log(1 + exp(z)).
///
/// Above 35 the correction term is below double precision, so z is returned.
#[inline]
pub fn softplus(z: f64) -> f64 {
    if z > 35.0 {
        z
    } else {
        z.exp().ln_1p()
    }
}

/// log(softplus(z)), finite for arbitrarily negative z.
#[inline]
pub fn log_softplus(z: f64) -> f64 {
    if z < -30.0 {
        // log(log(1 + e^z)) = z - e^z/2 + O(e^2z)
        z
    } else {
        softplus(z).ln()
    }
}

/// σ(z) / softplus(z), the derivative of [`log_softplus`].
#[inline]
pub fn softplus_ratio(z: f64) -> f64 {
    if z < -30.0 {
        1.0
    } else {
        expit(z) / softplus(z)
    }
}

/// Standard normal PDF φ(z) = exp(-z²/2) / √(2π)
#[inline]
pub fn standard_normal_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / (2.0 * PI).sqrt()
}

/// Standard normal CDF Φ(z) = erfc(-z/√2) / 2
#[inline]
pub fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z * FRAC_1_SQRT_2)
}

/// log Φ(z), accurate deep into the lower tail.
pub fn log_standard_normal_cdf(z: f64) -> f64 {
    if z < LOG_CDF_TAIL {
        // Φ(z) ≈ φ(z)/(-z) · (1 - 1/z² + 3/z⁴)
        let z2 = z * z;
        let series = 1.0 - 1.0 / z2 + 3.0 / (z2 * z2);
        -0.5 * z2 - 0.5 * (2.0 * PI).ln() - (-z).ln() + series.ln()
    } else if z > 5.0 {
        (-standard_normal_cdf(-z)).ln_1p()
    } else {
        standard_normal_cdf(z).ln()
    }
}

/// Inverse Mills ratio φ(z) / Φ(z).
pub fn inverse_mills_ratio(z: f64) -> f64 {
    let log_pdf = -0.5 * z * z - 0.5 * (2.0 * PI).ln();
    (log_pdf - log_standard_normal_cdf(z)).exp()
}
