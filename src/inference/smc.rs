use crate::error::SamplerError;
use crate::inference::posterior::Posterior;
use crate::inference::trace::Trace;
use crate::inference::SamplerTrait;
use crate::quiet::QuietGuard;
use crate::spot_model::SpotModel;

use emcee::{EnsembleSampler, Guess, Prob};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Adaptive tempered Sequential Monte Carlo
///
/// Particles are drawn from the prior and moved towards the posterior through a sequence of
/// tempered distributions `π(x) L(x)^β` with `β` growing from zero to one. Each stage chooses the
/// next `β` so that the effective sample size of the importance weights equals `threshold` times
/// the number of particles, resamples the particles systematically and mutates them with
/// `n_steps` iterations of the `emcee` affine-invariant ensemble sampler targeting the current
/// tempered posterior.
///
/// Every chain is an independent SMC run, its log marginal likelihood estimate is reported by
/// [Trace::log_marginal_likelihood].
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename = "Smc")]
pub struct SmcSampler {
    /// Number of posterior samples per chain
    pub draws: usize,
    #[serde(default = "SmcSampler::default_random_seed")]
    pub random_seed: u64,
    /// Run chains on a thread pool when `cores > 1`
    #[serde(default = "SmcSampler::default_parallel")]
    pub parallel: bool,
    #[serde(default = "SmcSampler::default_cores")]
    pub cores: usize,
    /// Number of independent chains, defaults to `cores`
    #[serde(default)]
    pub chains: Option<usize>,
    /// Target effective sample size fraction for the tempering schedule
    #[serde(default = "SmcSampler::default_threshold")]
    pub threshold: f64,
    /// Ensemble iterations per mutation stage
    #[serde(default = "SmcSampler::default_n_steps")]
    pub n_steps: usize,
}

impl SmcSampler {
    pub fn new(draws: usize) -> Self {
        Self {
            draws,
            random_seed: Self::default_random_seed(),
            parallel: Self::default_parallel(),
            cores: Self::default_cores(),
            chains: None,
            threshold: Self::default_threshold(),
            n_steps: Self::default_n_steps(),
        }
    }

    #[inline]
    pub fn default_random_seed() -> u64 {
        42
    }

    #[inline]
    pub fn default_parallel() -> bool {
        true
    }

    #[inline]
    pub fn default_cores() -> usize {
        1
    }

    #[inline]
    pub fn default_threshold() -> f64 {
        0.5
    }

    #[inline]
    pub fn default_n_steps() -> usize {
        25
    }

    pub fn with_random_seed(mut self, random_seed: u64) -> Self {
        self.random_seed = random_seed;
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

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_n_steps(mut self, n_steps: usize) -> Self {
        self.n_steps = n_steps;
        self
    }

    #[inline]
    pub fn n_chains(&self) -> usize {
        self.chains.unwrap_or(self.cores)
    }

    /// Number of particles for a model of dimension `dim`
    ///
    /// The ensemble sampler needs an even number of walkers, at least twice the dimension.
    pub fn n_particles(&self, dim: usize) -> usize {
        let n = usize::max(self.draws, 2 * dim);
        n + n % 2
    }

    pub fn validate(&self) -> Result<(), SamplerError> {
        if self.draws == 0 {
            return Err(SamplerError::ZeroDraws);
        }
        if self.cores == 0 || self.n_chains() == 0 {
            return Err(SamplerError::ZeroCores);
        }
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(SamplerError::Threshold(self.threshold));
        }
        Ok(())
    }

    fn run_chain(&self, posterior: &Posterior, chain: usize) -> Result<ChainResult, SamplerError> {
        let _quiet = QuietGuard::unless(posterior.model().verbose());

        let dim = posterior.dim();
        let n_particles = self.n_particles(dim);
        let mut rng = StdRng::seed_from_u64(self.random_seed.wrapping_add(chain as u64));

        let mut particles: Vec<Vec<f64>> = (0..n_particles)
            .map(|_| posterior.sample_prior(&mut rng))
            .collect();
        let mut ln_like: Vec<f64> = particles
            .iter()
            .map(|u| posterior.ln_likelihood(u))
            .collect();

        let mut beta = 0.0;
        let mut log_marginal_likelihood = 0.0;
        let mut stage = 0;
        while beta < 1.0 {
            let new_beta = next_beta(&ln_like, beta, self.threshold);
            let (log_mean_weight, weights) = importance_weights(&ln_like, new_beta - beta)
                .ok_or(SamplerError::Degenerate {
                    stage,
                    beta: new_beta,
                })?;
            log_marginal_likelihood += log_mean_weight;
            tracing::debug!("SMC chain {chain} stage {stage}: beta = {new_beta:.6}");

            let indices = systematic_resample(&weights, rng.random::<f64>());
            particles = indices.iter().map(|&i| particles[i].clone()).collect();
            beta = new_beta;

            particles = self.mutate(posterior, beta, &particles, [chain, stage])?;
            ln_like = particles
                .iter()
                .map(|u| posterior.ln_likelihood(u))
                .collect();
            stage += 1;
        }
        tracing::info!(
            "SMC chain {chain} finished after {stage} stages, log marginal likelihood = {log_marginal_likelihood:.3}"
        );

        let samples = particles
            .iter()
            .take(self.draws)
            .flat_map(|u| posterior.to_external(u))
            .collect();
        let samples = Array2::from_shape_vec((self.draws, dim), samples)
            .map_err(|e| SamplerError::Emcee(e.to_string()))?;
        Ok(ChainResult {
            samples,
            log_marginal_likelihood,
        })
    }

    fn mutate(
        &self,
        posterior: &Posterior,
        beta: f64,
        particles: &[Vec<f64>],
        [chain, stage]: [usize; 2],
    ) -> Result<Vec<Vec<f64>>, SamplerError> {
        let target = TemperedPosterior { posterior, beta };
        let guesses: Vec<Guess> = particles
            .iter()
            .map(|u| Guess::new(&u.iter().map(|&x| x as f32).collect::<Vec<_>>()))
            .collect();

        let mut sampler = EnsembleSampler::new(guesses.len(), posterior.dim(), &target)
            .map_err(|e| SamplerError::Emcee(e.to_string()))?;
        sampler.seed(&[self.random_seed as usize, chain, stage]);

        let mut last = guesses.clone();
        sampler
            .sample(&guesses, self.n_steps, |step| {
                last = step.pos.to_vec();
            })
            .map_err(|e| SamplerError::Emcee(e.to_string()))?;

        Ok(last
            .iter()
            .map(|guess| guess.values.iter().map(|&x| x as f64).collect())
            .collect())
    }
}

impl SamplerTrait for SmcSampler {
    fn sample(&self, model: &SpotModel) -> Result<Trace, SamplerError> {
        self.validate()?;
        let posterior = Arc::new(Posterior::new(model.clone()));
        let _quiet = QuietGuard::unless(model.verbose());

        let n_chains = self.n_chains();
        tracing::info!(
            "Sampling {n_chains} SMC chains of {} particles for model {}",
            self.n_particles(posterior.dim()),
            model.name()
        );
        let results: Vec<ChainResult> = if self.parallel && self.cores > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.cores)
                .build()?;
            pool.install(|| {
                (0..n_chains)
                    .into_par_iter()
                    .map(|chain| self.run_chain(&posterior, chain))
                    .collect::<Result<_, _>>()
            })?
        } else {
            (0..n_chains)
                .map(|chain| self.run_chain(&posterior, chain))
                .collect::<Result<_, _>>()?
        };

        let (chains, log_marginal_likelihood) = results
            .into_iter()
            .map(|r| (r.samples, r.log_marginal_likelihood))
            .unzip();
        Ok(Trace::from_chains(
            model.parameter_names().to_vec(),
            chains,
            Some(log_marginal_likelihood),
        ))
    }
}

struct ChainResult {
    samples: Array2<f64>,
    log_marginal_likelihood: f64,
}

/// Tempered posterior in the internal space, `β ln L + ln π + ln J`
struct TemperedPosterior<'a> {
    posterior: &'a Posterior,
    beta: f64,
}

impl TemperedPosterior<'_> {
    fn internal(params: &Guess) -> Vec<f64> {
        params.values.iter().map(|&x| x as f64).collect()
    }
}

impl Prob for TemperedPosterior<'_> {
    fn lnlike(&self, params: &Guess) -> f32 {
        let value = self.beta * self.posterior.ln_likelihood(&Self::internal(params));
        finite_or_neg_inf(value)
    }

    fn lnprior(&self, params: &Guess) -> f32 {
        let value = self.posterior.ln_prior(&Self::internal(params));
        finite_or_neg_inf(value)
    }
}

fn finite_or_neg_inf(value: f64) -> f32 {
    if value.is_nan() {
        f32::NEG_INFINITY
    } else {
        value as f32
    }
}

/// Normalised importance weights `L^Δβ` and the log of their mean
///
/// Returns `None` if all weights vanish.
fn importance_weights(ln_like: &[f64], delta_beta: f64) -> Option<(f64, Vec<f64>)> {
    let ln_w: Vec<f64> = ln_like
        .iter()
        .map(|&l| {
            let v = delta_beta * l;
            if v.is_nan() { f64::NEG_INFINITY } else { v }
        })
        .collect();
    let max = ln_w.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return None;
    }
    let weights: Vec<f64> = ln_w.iter().map(|&v| f64::exp(v - max)).collect();
    let sum: f64 = weights.iter().sum();
    let log_mean = max + sum.ln() - (ln_like.len() as f64).ln();
    Some((log_mean, weights.into_iter().map(|w| w / sum).collect()))
}

fn effective_sample_size(ln_like: &[f64], delta_beta: f64) -> f64 {
    match importance_weights(ln_like, delta_beta) {
        Some((_, weights)) => 1.0 / weights.iter().map(|w| w * w).sum::<f64>(),
        None => 0.0,
    }
}

/// Next inverse temperature by bisection on the effective sample size
fn next_beta(ln_like: &[f64], beta: f64, threshold: f64) -> f64 {
    const MAX_ITERATIONS: usize = 60;

    let target = threshold * ln_like.len() as f64;
    if effective_sample_size(ln_like, 1.0 - beta) >= target {
        return 1.0;
    }
    let (mut low, mut high) = (beta, 1.0);
    for _ in 0..MAX_ITERATIONS {
        let mid = 0.5 * (low + high);
        if effective_sample_size(ln_like, mid - beta) >= target {
            low = mid;
        } else {
            high = mid;
        }
    }
    // Always make progress
    if low > beta { low } else { high }
}

/// Systematic resampling, `u` is a uniform draw from `[0, 1)`
fn systematic_resample(weights: &[f64], u: f64) -> Vec<usize> {
    let n = weights.len();
    let mut indices = Vec::with_capacity(n);
    let mut cumulative = 0.0;
    let mut i = 0;
    for k in 0..n {
        let position = (k as f64 + u) / n as f64;
        while i + 1 < n && cumulative + weights[i] < position {
            cumulative += weights[i];
            i += 1;
        }
        indices.push(i);
    }
    indices
}
