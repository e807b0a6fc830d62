//! Forward model of a spotted star light curve.
//!
//! A [SpotModel] maps the global parameters ([GlobalParameters]) and per-spot parameters
//! ([SpotParameters]) to the predicted flux at the observation times:
//!
//! ```text
//! flux(t) = 1 + f0 - Σ_i R_i² (1 - CONTRAST) sqrt(1 - x_i² - y_i²) [z_i > 0]
//! ```
//!
//! where `(x_i, y_i, z_i)` is the position of spot `i` on a sphere rotating with the latitude
//! dependent period `P_eq / (1 - shear sin²(lat_i - π/2))`, see [geometry]. The model is generic
//! over [LikeFloat], so the same code evaluates the flux and its derivatives.

use crate::data::{LightCurve, ObservedData};
use crate::error::ModelError;
use crate::inference::prior::LnPrior;
use crate::inference::{Dual, GRAD_CHUNK, LikeFloat};
use crate::types::{Array1f, ArrayView1f};

use std::sync::Arc;

mod builder;
pub use builder::{ModelBuilder, longitude_wedges};

mod config;
pub use config::ModelConfig;

pub mod geometry;
pub use geometry::CONTRAST;
use geometry::{Spot, Star};

mod parameters;
pub use parameters::{
    GlobalParameters, N_GLOBAL, N_PER_SPOT, SpotParameters, pack, parameter_names, unpack,
};

/// Built starspot model: priors of all parameters and the likelihood of the observations
///
/// The model is immutable, cloning shares the observations.
#[derive(Clone, Debug)]
pub struct SpotModel {
    config: ModelConfig,
    names: Vec<String>,
    ln_prior: LnPrior,
    data: Arc<ObservedData>,
}

impl SpotModel {
    /// Build the complete model for a light curve
    pub fn new(lc: &LightCurve, config: ModelConfig) -> Result<Self, ModelError> {
        ModelBuilder::new(config)?
            .declare_globals()
            .declare_spots()
            .observe(lc)?
            .build()
    }

    /// Model name, the number of spots
    pub fn name(&self) -> String {
        self.config.n_spots.to_string()
    }

    #[inline]
    pub fn n_spots(&self) -> usize {
        self.config.n_spots
    }

    #[inline]
    pub fn n_params(&self) -> usize {
        self.names.len()
    }

    pub fn parameter_names(&self) -> &[String] {
        &self.names
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    #[inline]
    pub fn verbose(&self) -> bool {
        self.config.verbose
    }

    pub fn ln_prior(&self) -> &LnPrior {
        &self.ln_prior
    }

    pub fn observed(&self) -> &ObservedData {
        &self.data
    }

    fn check_params<U>(&self, params: &[U]) -> Result<(), ModelError> {
        if params.len() == self.n_params() {
            Ok(())
        } else {
            Err(ModelError::ParameterCount {
                actual: params.len(),
                expected: self.n_params(),
            })
        }
    }

    fn prepare<U: LikeFloat>(params: &[U]) -> (Star<U>, Vec<Spot<U>>) {
        let (globals, spots) = unpack(params);
        let star = Star::new(&globals);
        let spots = spots.iter().map(|spot| Spot::new(&globals, spot)).collect();
        (star, spots)
    }

    /// Model flux at centred times, generic over the scalar type
    pub fn flux_at<U: LikeFloat>(
        &self,
        params: &[U],
        t: ArrayView1f,
    ) -> Result<Vec<U>, ModelError> {
        self.check_params(params)?;
        let (star, spots) = Self::prepare(params);
        Ok(t.iter().map(|&t| geometry::flux(&star, &spots, t)).collect())
    }

    /// Predicted flux at the subsampled observation times
    pub fn predict_flux(&self, params: &[f64]) -> Result<Array1f, ModelError> {
        Ok(self.flux_at(params, self.data.t.view())?.into())
    }

    /// Predicted flux at arbitrary times, in the same time units as the light curve
    pub fn predict_flux_at(&self, params: &[f64], t: ArrayView1f) -> Result<Array1f, ModelError> {
        let t = self.data.centre(t);
        Ok(self.flux_at(params, t.view())?.into())
    }

    /// Gaussian log-likelihood, generic over the scalar type
    pub(crate) fn log_likelihood_generic<U: LikeFloat>(&self, params: &[U]) -> U {
        let (star, spots) = Self::prepare(params);
        self.data.ln_likelihood(|t| geometry::flux(&star, &spots, t))
    }

    pub fn log_likelihood(&self, params: &[f64]) -> Result<f64, ModelError> {
        self.check_params(params)?;
        Ok(self.log_likelihood_unchecked(params))
    }

    pub(crate) fn log_likelihood_unchecked(&self, params: &[f64]) -> f64 {
        self.log_likelihood_generic(params)
    }

    /// Log-likelihood and its gradient
    ///
    /// The gradient is computed in passes of [GRAD_CHUNK] directions.
    pub fn log_likelihood_with_grad(
        &self,
        params: &[f64],
        grad: &mut [f64],
    ) -> Result<f64, ModelError> {
        self.check_params(params)?;
        if grad.len() != params.len() {
            return Err(ModelError::GradientLength {
                actual: grad.len(),
                expected: params.len(),
            });
        }
        Ok(self.log_likelihood_with_grad_unchecked(params, grad))
    }

    pub(crate) fn log_likelihood_with_grad_unchecked(
        &self,
        params: &[f64],
        grad: &mut [f64],
    ) -> f64 {
        let mut value = f64::NAN;
        for first in (0..params.len()).step_by(GRAD_CHUNK) {
            let last = usize::min(first + GRAD_CHUNK, params.len());
            let duals: Vec<Dual> = params
                .iter()
                .enumerate()
                .map(|(i, &x)| {
                    let mut dual = Dual::from_real(x);
                    if (first..last).contains(&i) {
                        dual[i - first + 1] = 1.0;
                    }
                    dual
                })
                .collect();
            let result = self.log_likelihood_generic(&duals);
            value = result.re();
            for i in first..last {
                grad[i] = result[i - first + 1];
            }
        }
        value
    }

    pub fn log_prior(&self, params: &[f64]) -> Result<f64, ModelError> {
        self.check_params(params)?;
        Ok(self.ln_prior.ln_prior(params, None))
    }

    pub fn log_posterior(&self, params: &[f64]) -> Result<f64, ModelError> {
        Ok(self.log_prior(params)? + self.log_likelihood(params)?)
    }
}
