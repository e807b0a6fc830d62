//! Posterior sampling infrastructure for the starspot model.
//!
//! # Parameter Spaces
//!
//! Two parameter spaces are used:
//!
//! ## 1. External Parameters
//!
//! The physical parameters, in the order of [SpotModel::parameter_names]:
//! `f0, P_eq, shear, comp_inc, lon_0, lat_0, R_spot_0, lon_1, ...`. Priors, the forward model and
//! the returned [Trace] all live in this space.
//!
//! ## 2. Internal Parameters
//!
//! The unconstrained space seen by the samplers. Every prior has a closed support
//! (half-line or interval), and each parameter is mapped to the real line by the [Transform]
//! derived from that support:
//!
//! ```text
//! External ←→ Internal
//!     ↑           ↑
//!  priors,     samplers
//!  model,      work here
//!  traces
//! ```
//!
//! The log-posterior density in the internal space gets the log-Jacobian of the transformation:
//!
//! ```text
//! ln p(u) = ln L(x(u)) + ln π(x(u)) + Σ ln|dx_k/du_k|
//! ```
//!
//! and its gradient follows the chain rule
//!
//! ```text
//! ∂ ln p / ∂u_k = (∂ ln L/∂x_k + ∂ ln π/∂x_k) · dx_k/du_k + ∂ ln|dx_k/du_k| / ∂u_k
//! ```
//!
//! The likelihood gradient `∂ ln L/∂x` is computed by forward-mode automatic differentiation:
//! the model is generic over [LikeFloat] and evaluated with [Dual] numbers, several directions
//! per pass.
//!
//! # Samplers
//!
//! - [SmcSampler]: tempered Sequential Monte Carlo, uses `emcee` ensemble moves as the mutation
//!   kernel. Does not use derivatives.
//! - [NutsSampler]: the No-U-Turn Sampler of `nuts-rs`. Uses derivatives.
//!
//! [SpotModel::parameter_names]: crate::SpotModel::parameter_names

use crate::error::SamplerError;
use crate::spot_model::SpotModel;

use enum_dispatch::enum_dispatch;
use hyperdual::Hyperdual;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub mod nuts;
pub use nuts::NutsSampler;

pub mod posterior;
pub use posterior::Posterior;

pub mod prior;

pub mod smc;
pub use smc::SmcSampler;

pub mod trace;
pub use trace::Trace;

/// Number of derivative directions carried by a single [Dual] evaluation
pub const GRAD_CHUNK: usize = 8;

/// Dual number carrying a real part and [GRAD_CHUNK] derivative components
pub type Dual = Hyperdual<f64, { GRAD_CHUNK + 1 }>;

/// Scalar type the forward model is generic over
///
/// Implemented for `f64` (plain evaluation) and [Dual] (evaluation with derivatives).
pub trait LikeFloat: num_traits::Float {
    /// Lift a constant into the scalar type, all derivative components are zero
    fn constant(x: f64) -> Self;

    /// Real part of the value
    fn re(self) -> f64;

    /// Element-wise select
    ///
    /// The chosen operand is returned together with all its derivative components, the other
    /// operand does not contribute to the value nor to the derivatives. Callers must make the
    /// discarded operand finite themselves.
    #[inline]
    fn select(condition: bool, if_true: Self, if_false: Self) -> Self {
        if condition { if_true } else { if_false }
    }
}

impl LikeFloat for f64 {
    #[inline]
    fn constant(x: f64) -> Self {
        x
    }

    #[inline]
    fn re(self) -> f64 {
        self
    }
}

impl LikeFloat for Dual {
    #[inline]
    fn constant(x: f64) -> Self {
        Dual::from_real(x)
    }

    #[inline]
    fn re(self) -> f64 {
        self[0]
    }
}

#[enum_dispatch]
pub trait SamplerTrait: Clone + Debug {
    /// Draw posterior samples of the model parameters
    fn sample(&self, model: &SpotModel) -> Result<Trace, SamplerError>;
}

/// Sampler to use for [crate::Session::sample]
#[enum_dispatch(SamplerTrait)]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[non_exhaustive]
pub enum SamplerAlgorithm {
    Smc(SmcSampler),
    Nuts(NutsSampler),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dual_select_keeps_derivatives_of_chosen_operand() {
        let mut a = Dual::from_real(2.0);
        a[1] = 1.0;
        let mut b = Dual::from_real(f64::NAN);
        b[2] = f64::NAN;

        let chosen = Dual::select(true, a, b);
        assert_eq!(chosen.re(), 2.0);
        assert_eq!(chosen[1], 1.0);
        assert_eq!(chosen[2], 0.0);
    }

    #[test]
    fn sampler_algorithm_serde() {
        let algorithms: Vec<SamplerAlgorithm> = vec![
            SmcSampler::new(100).into(),
            NutsSampler::new(200).into(),
        ];
        let json = serde_json::to_string(&algorithms).unwrap();
        let restored: Vec<SamplerAlgorithm> = serde_json::from_str(&json).unwrap();
        assert_eq!(algorithms, restored);
    }
}
