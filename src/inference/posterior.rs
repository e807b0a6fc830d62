use crate::error::SamplerError;
use crate::inference::prior::Transform;
use crate::spot_model::SpotModel;

use rand::RngCore;

/// Log-posterior density of a [SpotModel] in the unconstrained internal space
#[derive(Clone, Debug)]
pub struct Posterior {
    model: SpotModel,
    transforms: Vec<Transform>,
}

impl Posterior {
    pub fn new(model: SpotModel) -> Self {
        let transforms = model.ln_prior().transforms();
        Self { model, transforms }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.transforms.len()
    }

    #[inline]
    pub fn model(&self) -> &SpotModel {
        &self.model
    }

    pub fn to_external(&self, internal: &[f64]) -> Vec<f64> {
        internal
            .iter()
            .zip(self.transforms.iter())
            .map(|(&u, transform)| transform.to_external(u))
            .collect()
    }

    /// Map an external parameter vector into the internal space
    ///
    /// Fails if any value is on or outside the boundary of its prior support.
    pub fn to_internal(&self, external: &[f64]) -> Result<Vec<f64>, SamplerError> {
        if external.len() != self.dim() {
            return Err(SamplerError::Start(format!(
                "{} values given, model has {} parameters",
                external.len(),
                self.dim()
            )));
        }
        external
            .iter()
            .zip(self.transforms.iter())
            .zip(self.model.parameter_names())
            .map(|((&x, transform), name)| {
                let u = transform.to_internal(x);
                if u.is_finite() {
                    Ok(u)
                } else {
                    Err(SamplerError::Start(format!("{name} = {x}")))
                }
            })
            .collect()
    }

    /// Draw from the prior and return the internal representation
    pub fn sample_prior(&self, rng: &mut dyn RngCore) -> Vec<f64> {
        let external = self.model.ln_prior().sample(rng);
        external
            .iter()
            .zip(self.transforms.iter())
            .map(|(&x, transform)| transform.to_internal(x))
            .collect()
    }

    /// Log-prior plus log-Jacobian at the internal point
    pub fn ln_prior(&self, internal: &[f64]) -> f64 {
        let external = self.to_external(internal);
        let ln_jacobian: f64 = internal
            .iter()
            .zip(self.transforms.iter())
            .map(|(&u, transform)| transform.ln_jacobian(u, None))
            .sum();
        self.model.ln_prior().ln_prior(&external, None) + ln_jacobian
    }

    /// Log-likelihood at the internal point
    pub fn ln_likelihood(&self, internal: &[f64]) -> f64 {
        let external = self.to_external(internal);
        self.model.log_likelihood_unchecked(&external)
    }

    /// Log-posterior and its gradient at the internal point
    pub fn ln_posterior_with_grad(&self, internal: &[f64], grad: &mut [f64]) -> f64 {
        let external = self.to_external(internal);

        let mut grad_prior = vec![0.0; self.dim()];
        let ln_prior = self
            .model
            .ln_prior()
            .ln_prior(&external, Some(&mut grad_prior));

        let mut grad_like = vec![0.0; self.dim()];
        let ln_like = self
            .model
            .log_likelihood_with_grad_unchecked(&external, &mut grad_like);

        let mut ln_jacobian = 0.0;
        for (k, (&u, transform)) in internal.iter().zip(self.transforms.iter()).enumerate() {
            let mut jac_grad = (0.0, 0.0);
            ln_jacobian += transform.ln_jacobian(u, Some(&mut jac_grad));
            let (d_ln_jac, dx_du) = jac_grad;
            grad[k] = (grad_prior[k] + grad_like[k]) * dx_du + d_ln_jac;
        }

        ln_like + ln_prior + ln_jacobian
    }
}
