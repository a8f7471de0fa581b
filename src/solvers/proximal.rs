//! Elastic-net and group-lasso proximal operators.
//!
//! The penalty on the weights is
//!
//! ```text
//! P(β) = ½(1-α)‖Γβ‖² + α·(Σ_g ‖β_g‖₂ + Σ_{j ungrouped} |β_j|)
//! ```
//!
//! where Γ defaults to the identity. Features with group id 0 (or no group
//! assignment at all) get the elementwise L1 term; every other id forms a
//! block that is shrunk, and possibly zeroed, as a whole.

use crate::core::{GlmOptions, OptionsError};
use faer::{Col, Mat};
use std::collections::BTreeMap;

/// Soft thresholding operator: S(z, γ) = sign(z) * max(|z| - γ, 0)
#[inline]
pub fn soft_threshold(z: f64, gamma: f64) -> f64 {
    if z > gamma {
        z - gamma
    } else if z < -gamma {
        z + gamma
    } else {
        0.0
    }
}

/// Partition of the features into elementwise and block-penalized sets.
#[derive(Debug, Clone)]
pub struct GroupStructure {
    singles: Vec<usize>,
    blocks: Vec<Vec<usize>>,
}

impl GroupStructure {
    /// Every feature penalized elementwise.
    pub fn ungrouped(n_features: usize) -> Self {
        Self {
            singles: (0..n_features).collect(),
            blocks: Vec::new(),
        }
    }

    /// Build from a group id per feature; id 0 means ungrouped.
    pub fn from_ids(group: &[usize]) -> Self {
        let mut singles = Vec::new();
        let mut by_id: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (j, &id) in group.iter().enumerate() {
            if id == 0 {
                singles.push(j);
            } else {
                by_id.entry(id).or_default().push(j);
            }
        }
        Self {
            singles,
            blocks: by_id.into_values().collect(),
        }
    }

    /// Feature indices of each block, ordered by group id.
    pub fn blocks(&self) -> &[Vec<usize>] {
        &self.blocks
    }

    /// L1 part of the penalty: block L2 norms plus elementwise magnitudes.
    pub fn l1_norm(&self, beta: &Col<f64>) -> f64 {
        let singles: f64 = self.singles.iter().map(|&j| beta[j].abs()).sum();
        let blocks: f64 = self.blocks.iter().map(|b| block_norm(beta, b)).sum();
        singles + blocks
    }

    /// Dual norm of the L1 part: the largest |v_j| or block norm.
    ///
    /// A zero weight vector is optimal exactly when the smooth gradient has
    /// dual norm at most λα.
    pub fn dual_norm(&self, v: &Col<f64>) -> f64 {
        let singles = self.singles.iter().map(|&j| v[j].abs()).fold(0.0, f64::max);
        self.blocks
            .iter()
            .map(|b| block_norm(v, b))
            .fold(singles, f64::max)
    }

    /// Proximal map of `threshold` times the L1 part, then a uniform `shrink`.
    ///
    /// A block whose norm does not exceed the threshold is set to exactly zero
    /// in every coordinate.
    pub fn prox(&self, v: &Col<f64>, threshold: f64, shrink: f64) -> Col<f64> {
        let mut out = Col::zeros(v.nrows());
        for &j in &self.singles {
            out[j] = soft_threshold(v[j], threshold) * shrink;
        }
        for block in &self.blocks {
            let norm = block_norm(v, block);
            if norm <= threshold {
                continue;
            }
            let scale = (1.0 - threshold / norm) * shrink;
            for &j in block {
                out[j] = v[j] * scale;
            }
        }
        out
    }
}

fn block_norm(v: &Col<f64>, block: &[usize]) -> f64 {
    block.iter().map(|&j| v[j] * v[j]).sum::<f64>().sqrt()
}

/// The elastic-net penalty of a fit, without its λ factor.
#[derive(Debug, Clone)]
pub struct Penalty {
    alpha: f64,
    groups: GroupStructure,
    /// ΓᵀΓ when a Tikhonov matrix is configured.
    gram: Option<Mat<f64>>,
}

impl Penalty {
    /// Penalty with identity Tikhonov matrix and no groups.
    pub fn elastic_net(alpha: f64, n_features: usize) -> Self {
        Self {
            alpha,
            groups: GroupStructure::ungrouped(n_features),
            gram: None,
        }
    }

    /// Build the penalty described by validated options.
    pub fn from_options(options: &GlmOptions, n_features: usize) -> Result<Self, OptionsError> {
        options.validate_for_features(n_features)?;
        let groups = match options.group {
            Some(ref ids) => GroupStructure::from_ids(ids),
            None => GroupStructure::ungrouped(n_features),
        };
        let gram = options.tikhonov.as_ref().map(gram_matrix);
        Ok(Self {
            alpha: options.alpha,
            groups,
            gram,
        })
    }

    /// Elastic-net mixing parameter.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Feature grouping.
    pub fn groups(&self) -> &GroupStructure {
        &self.groups
    }

    /// Value of P(β).
    pub fn value(&self, beta: &Col<f64>) -> f64 {
        let l2 = match self.gram {
            Some(ref gram) => quadratic_form(gram, beta),
            None => beta.iter().map(|b| b * b).sum(),
        };
        0.5 * (1.0 - self.alpha) * l2 + self.alpha * self.groups.l1_norm(beta)
    }

    /// Gradient of the L2 part when it cannot be folded into the prox.
    ///
    /// Returns `(1-α)ΓᵀΓβ` with a Tikhonov matrix and `None` otherwise.
    pub fn smooth_gradient(&self, beta: &Col<f64>) -> Option<Col<f64>> {
        let gram = self.gram.as_ref()?;
        let scale = 1.0 - self.alpha;
        let p = beta.nrows();
        Some(Col::from_fn(p, |i| {
            scale * (0..p).map(|k| gram[(i, k)] * beta[k]).sum::<f64>()
        }))
    }

    /// Proximal step `prox_{step·λ·P}(v)`.
    ///
    /// Without a Tikhonov matrix this is the closed-form elastic-net
    /// operator: threshold by `step·λ·α`, then scale by `1/(1 + step·λ·(1-α))`.
    /// With one, the L2 part is handled by [`Penalty::smooth_gradient`] and
    /// only the thresholding remains.
    pub fn prox(&self, v: &Col<f64>, step: f64, reg_lambda: f64) -> Col<f64> {
        let threshold = step * reg_lambda * self.alpha;
        let shrink = if self.gram.is_some() {
            1.0
        } else {
            1.0 / (1.0 + step * reg_lambda * (1.0 - self.alpha))
        };
        self.groups.prox(v, threshold, shrink)
    }
}

fn gram_matrix(tikhonov: &Mat<f64>) -> Mat<f64> {
    let p = tikhonov.ncols();
    let r = tikhonov.nrows();
    Mat::from_fn(p, p, |i, k| (0..r).map(|m| tikhonov[(m, i)] * tikhonov[(m, k)]).sum())
}

fn quadratic_form(a: &Mat<f64>, v: &Col<f64>) -> f64 {
    let p = v.nrows();
    let mut total = 0.0;
    for i in 0..p {
        for k in 0..p {
            total += v[i] * a[(i, k)] * v[k];
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_soft_threshold() {
        assert_eq!(soft_threshold(3.0, 1.0), 2.0);
        assert_eq!(soft_threshold(-3.0, 1.0), -2.0);
        assert_eq!(soft_threshold(0.5, 1.0), 0.0);
        assert_eq!(soft_threshold(-1.0, 1.0), 0.0);
    }

    #[test]
    fn test_elastic_net_prox_closed_form() {
        let penalty = Penalty::elastic_net(0.5, 3);
        let v = Col::from_fn(3, |j| [2.0, -0.05, -1.0][j]);
        let out = penalty.prox(&v, 0.2, 1.0);
        // threshold 0.1, shrink 1 / 1.1
        assert_relative_eq!(out[0], 1.9 / 1.1, epsilon = 1e-12);
        assert_eq!(out[1], 0.0);
        assert_relative_eq!(out[2], -0.9 / 1.1, epsilon = 1e-12);
    }

    #[test]
    fn test_ridge_prox_only_scales() {
        let penalty = Penalty::elastic_net(0.0, 2);
        let v = Col::from_fn(2, |j| [1e-4, -3.0][j]);
        let out = penalty.prox(&v, 0.5, 2.0);
        assert_relative_eq!(out[0], 1e-4 / 2.0, epsilon = 1e-15);
        assert_relative_eq!(out[1], -1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_group_zeroed_simultaneously() {
        // Group 1 has one large and one tiny coordinate but small joint norm
        let groups = GroupStructure::from_ids(&[1, 1, 2, 2, 0]);
        let v = Col::from_fn(5, |j| [0.3, 0.01, 2.0, -1.0, 0.05][j]);
        let out = groups.prox(&v, 0.5, 1.0);

        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 0.0);
        assert!(out[2] != 0.0 && out[3] != 0.0);
        // Ungrouped feature is soft-thresholded on its own
        assert_eq!(out[4], 0.0);
    }

    #[test]
    fn test_group_shrinks_along_direction() {
        let groups = GroupStructure::from_ids(&[3, 3]);
        let v = Col::from_fn(2, |j| [3.0, 4.0][j]);
        let out = groups.prox(&v, 1.0, 1.0);
        // Norm 5 shrinks to 4 keeping direction
        assert_relative_eq!(out[0], 2.4, epsilon = 1e-12);
        assert_relative_eq!(out[1], 3.2, epsilon = 1e-12);
    }

    #[test]
    fn test_group_prox_depends_on_whole_group() {
        // Same first coordinate, different partner: one survives, one is zeroed
        let groups = GroupStructure::from_ids(&[1, 1]);
        let small = groups.prox(&Col::from_fn(2, |j| [0.4, 0.0][j]), 0.5, 1.0);
        let large = groups.prox(&Col::from_fn(2, |j| [0.4, 0.6][j]), 0.5, 1.0);
        assert_eq!(small[0], 0.0);
        assert!(large[0] > 0.0);
    }

    #[test]
    fn test_prox_is_minimizer() {
        // prox_f(v) minimizes ½‖u - v‖² + f(u); compare against perturbations
        let mut options = GlmOptions::default();
        options.alpha = 0.7;
        options.group = Some(vec![1, 1, 0, 2]);
        let penalty = Penalty::from_options(&options, 4).unwrap();
        let v = Col::from_fn(4, |j| [0.8, -0.3, 0.2, 1.5][j]);
        let (step, lambda) = (0.5, 0.6);
        let u = penalty.prox(&v, step, lambda);

        let objective = |w: &Col<f64>| {
            let dist: f64 = (0..4).map(|j| (w[j] - v[j]).powi(2)).sum();
            0.5 * dist + step * lambda * penalty.value(w)
        };
        let best = objective(&u);
        for j in 0..4 {
            for delta in [-1e-3, 1e-3] {
                let mut w = u.clone();
                w[j] += delta;
                assert!(objective(&w) >= best - 1e-12);
            }
        }
    }

    #[test]
    fn test_penalty_value() {
        let penalty = Penalty::elastic_net(0.5, 2);
        let beta = Col::from_fn(2, |j| [3.0, -4.0][j]);
        // 0.5 * 0.5 * 25 + 0.5 * 7
        assert_relative_eq!(penalty.value(&beta), 6.25 + 3.5, epsilon = 1e-12);

        let groups = GroupStructure::from_ids(&[1, 1]);
        assert_relative_eq!(groups.l1_norm(&beta), 5.0, epsilon = 1e-12);
        assert_relative_eq!(groups.dual_norm(&beta), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_tikhonov_moves_l2_into_gradient() {
        let mut options = GlmOptions::default();
        options.alpha = 0.0;
        let mut gamma = Mat::zeros(2, 2);
        gamma[(0, 0)] = 2.0;
        gamma[(1, 0)] = 1.0;
        gamma[(1, 1)] = 1.0;
        options.tikhonov = Some(gamma);
        let penalty = Penalty::from_options(&options, 2).unwrap();

        let beta = Col::from_fn(2, |j| [1.0, -1.0][j]);
        // Γβ = (2, 0) so ½‖Γβ‖² = 2
        assert_relative_eq!(penalty.value(&beta), 2.0, epsilon = 1e-12);

        // ΓᵀΓ = [[5, 1], [1, 1]]
        let grad = penalty.smooth_gradient(&beta).unwrap();
        assert_relative_eq!(grad[0], 4.0, epsilon = 1e-12);
        assert_relative_eq!(grad[1], 0.0, epsilon = 1e-12);

        // Prox with alpha = 0 is then the identity
        let out = penalty.prox(&beta, 0.3, 1.0);
        assert_eq!(out[0], 1.0);
        assert_eq!(out[1], -1.0);
    }
}
