use crate::error::SamplerError;
use crate::inference::posterior::Posterior;
use crate::inference::trace::Trace;
use crate::inference::SamplerTrait;
use crate::quiet::QuietGuard;
use crate::spot_model::SpotModel;

use ndarray::Array2;
use nuts_rs::{Chain, CpuLogpFunc, CpuMath, DiagGradNutsSettings, LogpError, Settings};
use nuts_storable::HasDims;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// NUTS (No-U-Turn Sampler) of `nuts-rs`
///
/// Chains sample the unconstrained internal space with a diagonal mass matrix adapted during
/// `tune` iterations, the following `draws` iterations are kept and stored in the external space.
/// The log-posterior gradient is exact, computed with forward-mode dual numbers.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename = "Nuts")]
pub struct NutsSampler {
    /// Number of posterior samples per chain
    pub draws: usize,
    /// Number of adaptation iterations, discarded
    #[serde(default = "NutsSampler::default_tune")]
    pub tune: usize,
    /// Starting point in the external parameter space, random prior draw if `None`
    #[serde(default)]
    pub start: Option<Vec<f64>>,
    /// Maximum number of worker threads
    #[serde(default = "NutsSampler::default_cores")]
    pub cores: usize,
    /// Number of chains, defaults to `cores`
    #[serde(default)]
    pub chains: Option<usize>,
    #[serde(default = "NutsSampler::default_target_accept")]
    pub target_accept: f64,
    /// Maximum tree depth
    #[serde(default = "NutsSampler::default_maxdepth")]
    pub maxdepth: u64,
    #[serde(default = "NutsSampler::default_random_seed")]
    pub random_seed: u64,
}

impl NutsSampler {
    pub fn new(draws: usize) -> Self {
        Self {
            draws,
            tune: Self::default_tune(),
            start: None,
            cores: Self::default_cores(),
            chains: None,
            target_accept: Self::default_target_accept(),
            maxdepth: Self::default_maxdepth(),
            random_seed: Self::default_random_seed(),
        }
    }

    #[inline]
    pub fn default_tune() -> usize {
        1000
    }

    #[inline]
    pub fn default_cores() -> usize {
        64
    }

    #[inline]
    pub fn default_target_accept() -> f64 {
        0.99
    }

    #[inline]
    pub fn default_maxdepth() -> u64 {
        10
    }

    #[inline]
    pub fn default_random_seed() -> u64 {
        42
    }

    pub fn with_tune(mut self, tune: usize) -> Self {
        self.tune = tune;
        self
    }

    pub fn with_start(mut self, start: Vec<f64>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_cores(mut self, cores: usize) -> Self {
        self.cores = cores;
        self
    }

    pub fn with_chains(mut self, chains: usize) -> Self {
        self.chains = Some(chains);
        self
    }

    pub fn with_target_accept(mut self, target_accept: f64) -> Self {
        self.target_accept = target_accept;
        self
    }

    pub fn with_maxdepth(mut self, maxdepth: u64) -> Self {
        self.maxdepth = maxdepth;
        self
    }

    pub fn with_random_seed(mut self, random_seed: u64) -> Self {
        self.random_seed = random_seed;
        self
    }

    #[inline]
    pub fn n_chains(&self) -> usize {
        self.chains.unwrap_or(self.cores)
    }

    /// Size of the thread pool, never more than the number of chains
    #[inline]
    pub fn n_threads(&self) -> usize {
        usize::min(self.cores, self.n_chains())
    }

    pub fn validate(&self) -> Result<(), SamplerError> {
        if self.draws == 0 {
            return Err(SamplerError::ZeroDraws);
        }
        if self.cores == 0 || self.n_chains() == 0 {
            return Err(SamplerError::ZeroCores);
        }
        if !(self.target_accept > 0.0 && self.target_accept < 1.0) {
            return Err(SamplerError::TargetAccept(self.target_accept));
        }
        Ok(())
    }

    fn settings(&self) -> DiagGradNutsSettings {
        let mut settings = DiagGradNutsSettings::default();
        settings.num_tune = self.tune as u64;
        settings.num_draws = self.draws as u64;
        settings.maxdepth = self.maxdepth;
        settings.adapt_options.step_size_settings.target_accept = self.target_accept;
        settings
    }

    fn run_chain(
        &self,
        posterior: &Arc<Posterior>,
        start: Option<&[f64]>,
        chain: usize,
    ) -> Result<Array2<f64>, SamplerError> {
        let _quiet = QuietGuard::unless(posterior.model().verbose());
        let nuts_error = |message: String| SamplerError::Nuts { chain, message };

        let mut rng = StdRng::seed_from_u64(self.random_seed.wrapping_add(chain as u64));
        let initial = match start {
            Some(start) => start.to_vec(),
            None => posterior.sample_prior(&mut rng),
        };

        let math = CpuMath::new(LogpFunc {
            posterior: posterior.clone(),
        });
        let mut sampler = self.settings().new_chain(chain as u64, math, &mut rng);
        sampler
            .set_position(&initial)
            .map_err(|e| nuts_error(format!("cannot set initial position: {e:?}")))?;

        let dim = posterior.dim();
        let mut samples = Vec::with_capacity(self.draws * dim);
        let mut divergences = 0;
        for i in 0..(self.tune + self.draws) {
            let (_draw, expanded, _stats, progress) = sampler
                .expanded_draw()
                .map_err(|e| nuts_error(format!("draw {i}: {e:?}")))?;
            if i < self.tune {
                continue;
            }
            if progress.diverging {
                divergences += 1;
            }
            samples.extend(expanded);
        }
        if divergences > 0 {
            tracing::warn!("NUTS chain {chain}: {divergences} divergences after tuning");
        }
        tracing::info!("NUTS chain {chain} finished");

        Array2::from_shape_vec((self.draws, dim), samples).map_err(|e| nuts_error(e.to_string()))
    }
}

impl SamplerTrait for NutsSampler {
    fn sample(&self, model: &SpotModel) -> Result<Trace, SamplerError> {
        self.validate()?;
        let posterior = Arc::new(Posterior::new(model.clone()));
        let start = self
            .start
            .as_deref()
            .map(|start| posterior.to_internal(start))
            .transpose()?;
        let _quiet = QuietGuard::unless(model.verbose());

        let n_chains = self.n_chains();
        tracing::info!(
            "Sampling {n_chains} NUTS chains on {} threads for model {}",
            self.n_threads(),
            model.name()
        );
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.n_threads())
            .build()?;
        let chains = pool.install(|| {
            (0..n_chains)
                .into_par_iter()
                .map(|chain| self.run_chain(&posterior, start.as_deref(), chain))
                .collect::<Result<Vec<_>, _>>()
        })?;

        Ok(Trace::from_chains(
            model.parameter_names().to_vec(),
            chains,
            None,
        ))
    }
}

#[derive(Debug)]
enum NutsLogpError {
    NonFinite,
    NonRecoverable,
}

impl std::fmt::Display for NutsLogpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NutsLogpError::NonFinite => write!(f, "log-posterior or its gradient is not finite"),
            NutsLogpError::NonRecoverable => {
                write!(f, "Non-recoverable error in logp calculation")
            }
        }
    }
}

impl std::error::Error for NutsLogpError {}

impl LogpError for NutsLogpError {
    fn is_recoverable(&self) -> bool {
        matches!(self, NutsLogpError::NonFinite)
    }
}

struct LogpFunc {
    posterior: Arc<Posterior>,
}

impl HasDims for LogpFunc {
    fn dim_sizes(&self) -> HashMap<String, u64> {
        let dim = self.posterior.dim() as u64;
        HashMap::from([
            ("unconstrained_parameter".to_string(), dim),
            ("dim".to_string(), dim),
        ])
    }
}

impl CpuLogpFunc for LogpFunc {
    type LogpError = NutsLogpError;
    type FlowParameters = ();
    type ExpandedVector = Vec<f64>;

    fn dim(&self) -> usize {
        self.posterior.dim()
    }

    fn logp(&mut self, params: &[f64], grad: &mut [f64]) -> Result<f64, Self::LogpError> {
        if params.len() != self.posterior.dim() || grad.len() != params.len() {
            return Err(NutsLogpError::NonRecoverable);
        }
        let value = self.posterior.ln_posterior_with_grad(params, grad);
        if value.is_finite() && grad.iter().all(|g| g.is_finite()) {
            Ok(value)
        } else {
            Err(NutsLogpError::NonFinite)
        }
    }

    fn expand_vector<R: rand::Rng + ?Sized>(
        &mut self,
        _rng: &mut R,
        array: &[f64],
    ) -> Result<Self::ExpandedVector, nuts_rs::CpuMathError> {
        Ok(self.posterior.to_external(array))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation() {
        assert!(NutsSampler::new(10).validate().is_ok());
        assert!(matches!(
            NutsSampler::new(0).validate(),
            Err(SamplerError::ZeroDraws)
        ));
        assert!(matches!(
            NutsSampler::new(10).with_chains(0).validate(),
            Err(SamplerError::ZeroCores)
        ));
        assert!(matches!(
            NutsSampler::new(10).with_target_accept(1.0).validate(),
            Err(SamplerError::TargetAccept(_))
        ));
    }

    #[test]
    fn threads_capped_by_chains() {
        let sampler = NutsSampler::new(10);
        assert_eq!(sampler.n_chains(), 64);
        assert_eq!(sampler.n_threads(), 64);
        let sampler = sampler.with_chains(2);
        assert_eq!(sampler.n_threads(), 2);
    }

    #[test]
    fn serde_defaults() {
        let sampler: NutsSampler =
            serde_json::from_str(r#"{"draws": 10, "start": [1.0, 2.0]}"#).unwrap();
        assert_eq!(sampler, NutsSampler::new(10).with_start(vec![1.0, 2.0]));
    }
}
