use crate::inference::prior::ln_prior_1d::{LnPrior1D, LnPrior1DTrait};
use crate::inference::prior::transform::Transform;

use rand::RngCore;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Natural logarithm of a prior made of independent per-parameter components
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct LnPrior {
    pub components: Vec<LnPrior1D>,
}

impl LnPrior {
    pub fn ind_components(components: Vec<LnPrior1D>) -> Self {
        Self { components }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Evaluate the natural logarithm of the prior at params
    ///
    /// If `jac` is `Some`, the gradient d(ln_prior)/d(params) is also computed and stored in it.
    pub fn ln_prior(&self, params: &[f64], jac: Option<&mut [f64]>) -> f64 {
        debug_assert_eq!(params.len(), self.len());
        match jac {
            Some(j) => params
                .iter()
                .zip(self.components.iter())
                .zip(j.iter_mut())
                .map(|((&x, prior), g)| prior.ln_prior_1d(x, Some(g)))
                .sum(),
            None => params
                .iter()
                .zip(self.components.iter())
                .map(|(&x, prior)| prior.ln_prior_1d(x, None))
                .sum(),
        }
    }

    /// Support-derived transformations to the unconstrained space, one per component
    pub fn transforms(&self) -> Vec<Transform> {
        self.components
            .iter()
            .map(|prior| {
                let (lower, upper) = prior.support();
                Transform::from_support(lower, upper)
            })
            .collect()
    }

    /// Draw a parameter vector from the prior
    pub fn sample(&self, rng: &mut dyn RngCore) -> Vec<f64> {
        self.components.iter().map(|prior| prior.sample(rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ind_components_ln_prior() {
        let prior = LnPrior::ind_components(vec![
            LnPrior1D::uniform(0.0, 1.0),
            LnPrior1D::half_normal(1.0),
        ]);

        let params = [0.5, 1.0];
        assert!(prior.ln_prior(&params, None).is_finite());

        let params = [1.5, 1.0];
        assert!(prior.ln_prior(&params, None).is_infinite());

        let params = [0.5, -1.0];
        assert!(prior.ln_prior(&params, None) < 0.0);
        assert!(prior.ln_prior(&params, None).is_infinite());
    }

    #[test]
    fn jacobian_is_per_component() {
        let prior = LnPrior::ind_components(vec![
            LnPrior1D::half_normal(0.2),
            LnPrior1D::truncated_normal(10.0, 0.1, 4.0, 15.0),
        ]);
        let params = [0.1, 10.05];
        let mut jac = [0.0; 2];
        let value = prior.ln_prior(&params, Some(&mut jac));
        assert_relative_eq!(value, prior.ln_prior(&params, None));
        assert_relative_eq!(jac[0], -0.1 / 0.04, epsilon = 1e-12);
        assert_relative_eq!(jac[1], -0.05 / 0.01, epsilon = 1e-9);
    }

    #[test]
    fn transforms_follow_support() {
        let prior = LnPrior::ind_components(vec![
            LnPrior1D::half_normal(1.0),
            LnPrior1D::uniform(0.0, 2.0),
        ]);
        assert_eq!(
            prior.transforms(),
            vec![
                Transform::Log { lower: 0.0 },
                Transform::Interval {
                    lower: 0.0,
                    upper: 2.0
                },
            ]
        );
    }
}
