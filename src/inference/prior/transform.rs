use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Bijection between an unconstrained internal parameter `u` and the external parameter `x`
///
/// Samplers move in the internal space where every real value is allowed, priors and the model
/// are evaluated in the external space.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub enum Transform {
    /// `x = u`
    Identity,
    /// `x = lower + exp(u)`
    Log { lower: f64 },
    /// `x = lower + (upper - lower) / (1 + exp(-u))`
    Interval { lower: f64, upper: f64 },
}

/// ln(1 + exp(x)) without overflow
fn softplus(x: f64) -> f64 {
    x.max(0.0) + f64::ln_1p(f64::exp(-x.abs()))
}

fn logistic(x: f64) -> f64 {
    if x >= 0.0 {
        (1.0 + f64::exp(-x)).recip()
    } else {
        let e = f64::exp(x);
        e / (1.0 + e)
    }
}

impl Transform {
    /// Choose the transformation for a prior supported on `[lower, upper]`
    pub fn from_support(lower: f64, upper: f64) -> Self {
        match (lower.is_finite(), upper.is_finite()) {
            (true, true) => Self::Interval { lower, upper },
            (true, false) => Self::Log { lower },
            _ => Self::Identity,
        }
    }

    pub fn to_external(&self, u: f64) -> f64 {
        match *self {
            Self::Identity => u,
            Self::Log { lower } => lower + f64::exp(u),
            Self::Interval { lower, upper } => lower + (upper - lower) * logistic(u),
        }
    }

    /// Inverse of [Transform::to_external], infinite on the support boundary
    pub fn to_internal(&self, x: f64) -> f64 {
        match *self {
            Self::Identity => x,
            Self::Log { lower } => f64::ln(x - lower),
            Self::Interval { lower, upper } => f64::ln(x - lower) - f64::ln(upper - x),
        }
    }

    /// Natural logarithm of |dx/du|
    ///
    /// If `grad` is `Some`, it receives `(d ln|dx/du| / du, dx/du)`.
    pub fn ln_jacobian(&self, u: f64, grad: Option<&mut (f64, f64)>) -> f64 {
        match *self {
            Self::Identity => {
                if let Some(g) = grad {
                    *g = (0.0, 1.0);
                }
                0.0
            }
            Self::Log { .. } => {
                if let Some(g) = grad {
                    *g = (1.0, f64::exp(u));
                }
                u
            }
            Self::Interval { lower, upper } => {
                let width = upper - lower;
                if let Some(g) = grad {
                    let s = logistic(u);
                    *g = (1.0 - 2.0 * s, width * s * (1.0 - s));
                }
                f64::ln(width) - softplus(-u) - softplus(u)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TRANSFORMS: [Transform; 3] = [
        Transform::Identity,
        Transform::Log { lower: 0.0 },
        Transform::Interval {
            lower: 4.0,
            upper: 15.0,
        },
    ];

    #[test]
    fn from_support() {
        assert_eq!(
            Transform::from_support(0.0, f64::INFINITY),
            Transform::Log { lower: 0.0 }
        );
        assert_eq!(
            Transform::from_support(0.0, 1.0),
            Transform::Interval {
                lower: 0.0,
                upper: 1.0
            }
        );
        assert_eq!(
            Transform::from_support(f64::NEG_INFINITY, f64::INFINITY),
            Transform::Identity
        );
    }

    #[test]
    fn inverse() {
        for transform in TRANSFORMS {
            for u in [-5.0, -0.3, 0.0, 1.7, 6.0] {
                let x = transform.to_external(u);
                assert_relative_eq!(transform.to_internal(x), u, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn jacobian_matches_finite_differences() {
        const EPS: f64 = 1e-6;
        for transform in TRANSFORMS {
            for u in [-3.0, -0.5, 0.0, 0.8, 2.5] {
                let mut grad = (0.0, 0.0);
                let ln_jac = transform.ln_jacobian(u, Some(&mut grad));

                let dx_du = (transform.to_external(u + EPS) - transform.to_external(u - EPS))
                    / (2.0 * EPS);
                assert_relative_eq!(grad.1, dx_du, max_relative = 1e-6);
                assert_relative_eq!(ln_jac, dx_du.ln(), epsilon = 1e-6);

                let d_ln_jac = (transform.ln_jacobian(u + EPS, None)
                    - transform.ln_jacobian(u - EPS, None))
                    / (2.0 * EPS);
                assert_relative_eq!(grad.0, d_ln_jac, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn interval_boundaries_stay_inside() {
        let transform = Transform::Interval {
            lower: 0.0,
            upper: std::f64::consts::FRAC_PI_2,
        };
        assert_eq!(transform.to_external(-1e3), 0.0);
        assert_eq!(transform.to_external(1e3), std::f64::consts::FRAC_PI_2);
        assert_eq!(transform.to_internal(0.0), f64::NEG_INFINITY);
    }
}
