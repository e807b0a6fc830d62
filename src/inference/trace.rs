use ndarray::{Array1, Array2, Array3, ArrayView2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

/// Posterior samples keyed by parameter name
///
/// Samples are stored in the external parameter space as a `(chain, draw, parameter)` array.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Trace {
    names: Vec<String>,
    samples: Array3<f64>,
    log_marginal_likelihood: Option<Vec<f64>>,
}

impl Trace {
    /// Assemble a trace from per-chain `(draw, parameter)` arrays of equal shape
    pub(crate) fn from_chains(
        names: Vec<String>,
        chains: Vec<Array2<f64>>,
        log_marginal_likelihood: Option<Vec<f64>>,
    ) -> Self {
        let n_draws = chains.first().map_or(0, |chain| chain.nrows());
        let mut samples = Array3::zeros((chains.len(), n_draws, names.len()));
        for (mut dst, src) in samples.outer_iter_mut().zip(chains.iter()) {
            dst.assign(src);
        }
        Self {
            names,
            samples,
            log_marginal_likelihood,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[inline]
    pub fn n_chains(&self) -> usize {
        self.samples.len_of(Axis(0))
    }

    #[inline]
    pub fn n_draws(&self) -> usize {
        self.samples.len_of(Axis(1))
    }

    /// All samples, `(chain, draw, parameter)`
    pub fn samples(&self) -> ArrayView3<'_, f64> {
        self.samples.view()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Samples of a single parameter, `(chain, draw)`
    pub fn get(&self, name: &str) -> Option<ArrayView2<'_, f64>> {
        self.index_of(name)
            .map(|i| self.samples.index_axis(Axis(2), i))
    }

    /// Samples of a single parameter with all chains concatenated
    pub fn flat(&self, name: &str) -> Option<Array1<f64>> {
        self.get(name).map(|v| v.iter().copied().collect())
    }

    /// Posterior mean of a single parameter over all chains and draws
    pub fn mean(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|v| v.mean())
    }

    /// SMC estimate of the log marginal likelihood, one value per chain
    pub fn log_marginal_likelihood(&self) -> Option<&[f64]> {
        self.log_marginal_likelihood.as_deref()
    }
}
