use crate::data::LightCurve;
use crate::detrend::GpDetrend;
use crate::error::{DetrendError, ModelError, SamplerError};
use crate::inference::{NutsSampler, SamplerAlgorithm, SamplerTrait, SmcSampler, Trace};
use crate::spot_model::{ModelConfig, SpotModel};
use crate::types::Array1f;

use std::path::PathBuf;

/// Light curve, model configuration and the model built from them
///
/// ```no_run
/// use light_curve_starspot::{LightCurve, ModelConfig, Session, SmcSampler};
///
/// let t: Vec<f64> = (0..100).map(|i| 0.2 * i as f64).collect();
/// let lc = LightCurve::new(t, vec![1.0; 100], vec![1e-3; 100]).unwrap();
/// let mut session = Session::new(lc, ModelConfig::new(10.0, 2)).unwrap();
/// session.gp_normalize(1.0, 8.0, None).unwrap();
/// session.build_model().unwrap();
/// let trace = session.sample_smc(&SmcSampler::new(1000)).unwrap();
/// println!("P_eq = {:?}", trace.mean("P_eq"));
/// ```
#[derive(Clone, Debug)]
pub struct Session {
    light_curve: LightCurve,
    config: ModelConfig,
    model: Option<SpotModel>,
}

impl Session {
    /// Validate inputs, the model is not built yet
    pub fn new(light_curve: LightCurve, config: ModelConfig) -> Result<Self, ModelError> {
        config.validate()?;
        light_curve.validate()?;
        Ok(Self {
            light_curve,
            config,
            model: None,
        })
    }

    /// Validate inputs and build the model
    pub fn build(light_curve: LightCurve, config: ModelConfig) -> Result<Self, ModelError> {
        let mut session = Self::new(light_curve, config)?;
        session.build_model()?;
        Ok(session)
    }

    pub fn light_curve(&self) -> &LightCurve {
        &self.light_curve
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn model(&self) -> Option<&SpotModel> {
        self.model.as_ref()
    }

    /// Build the model from the current light curve, replacing a previously built one
    pub fn build_model(&mut self) -> Result<&SpotModel, ModelError> {
        let model = SpotModel::new(&self.light_curve, self.config.clone())?;
        Ok(&*self.model.insert(model))
    }

    /// Normalise the light curve by a Matérn-3/2 GP trend, see [GpDetrend]
    ///
    /// A previously built model was built on the raw flux, it is dropped and must be built again.
    pub fn gp_normalize(
        &mut self,
        log_sigma: f64,
        log_rho: f64,
        plot: Option<PathBuf>,
    ) -> Result<Array1f, DetrendError> {
        let detrend = GpDetrend {
            log_sigma,
            log_rho,
            plot,
        };
        self.detrend(&detrend)
    }

    pub fn detrend(&mut self, detrend: &GpDetrend) -> Result<Array1f, DetrendError> {
        let trend = detrend.normalize(&mut self.light_curve)?;
        if self.model.take().is_some() {
            tracing::warn!("Light curve is normalized after the model was built, build it again");
        }
        Ok(trend)
    }

    fn built_model(&self) -> Result<&SpotModel, SamplerError> {
        self.model.as_ref().ok_or(SamplerError::ModelNotBuilt)
    }

    pub fn sample_smc(&self, sampler: &SmcSampler) -> Result<Trace, SamplerError> {
        sampler.sample(self.built_model()?)
    }

    pub fn sample_nuts(&self, sampler: &NutsSampler) -> Result<Trace, SamplerError> {
        sampler.sample(self.built_model()?)
    }

    pub fn sample(&self, algorithm: &SamplerAlgorithm) -> Result<Trace, SamplerError> {
        algorithm.sample(self.built_model()?)
    }
}
