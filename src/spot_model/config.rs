use crate::error::ModelError;
use crate::inference::prior::ln_prior_1d::normal_mass;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Truncated normal as `[mu, std, left, right]`
pub(crate) type TruncatedNormalParameters = [f64; 4];

/// Truncation interval is finite, non-empty and holds probability mass
fn is_proper([mu, std, left, right]: TruncatedNormalParameters) -> bool {
    [mu, std, left, right].iter().all(|x| x.is_finite())
        && left < right
        && normal_mass(mu, std, left, right) > 0.0
}

/// Configuration of a [crate::SpotModel]
///
/// - `rotation_period`: prior guess of the equatorial rotation period, the `P_eq` prior is a
///   normal centred on it
/// - `n_spots`: number of spots, at least one
/// - `latitude_cutoff`: angular distance from the poles, in degrees, where spots are forbidden
/// - `scale_error`: factor the flux errors are multiplied by in the likelihood
/// - `skip_n_points`: stride used to subsample the light curve
/// - `verbose`: keep log output of model construction and sampling
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename = "SpotModel")]
pub struct ModelConfig {
    pub rotation_period: f64,
    pub n_spots: usize,
    #[serde(default = "ModelConfig::default_latitude_cutoff")]
    pub latitude_cutoff: f64,
    #[serde(default = "ModelConfig::default_scale_error")]
    pub scale_error: f64,
    #[serde(default = "ModelConfig::default_skip_n_points")]
    pub skip_n_points: usize,
    #[serde(default = "ModelConfig::default_verbose")]
    pub verbose: bool,
}

impl ModelConfig {
    pub fn new(rotation_period: f64, n_spots: usize) -> Self {
        Self {
            rotation_period,
            n_spots,
            latitude_cutoff: Self::default_latitude_cutoff(),
            scale_error: Self::default_scale_error(),
            skip_n_points: Self::default_skip_n_points(),
            verbose: Self::default_verbose(),
        }
    }

    #[inline]
    pub fn default_latitude_cutoff() -> f64 {
        10.0
    }

    #[inline]
    pub fn default_scale_error() -> f64 {
        5.0
    }

    #[inline]
    pub fn default_skip_n_points() -> usize {
        1
    }

    #[inline]
    pub fn default_verbose() -> bool {
        false
    }

    pub fn with_latitude_cutoff(mut self, latitude_cutoff: f64) -> Self {
        self.latitude_cutoff = latitude_cutoff;
        self
    }

    pub fn with_scale_error(mut self, scale_error: f64) -> Self {
        self.scale_error = scale_error;
        self
    }

    pub fn with_skip_n_points(mut self, skip_n_points: usize) -> Self {
        self.skip_n_points = skip_n_points;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Rejects values the priors cannot be built from, including periods and cutoffs so
    /// extreme that the prior support collapses in floating point
    pub fn validate(&self) -> Result<(), ModelError> {
        if !(self.rotation_period.is_finite()
            && self.rotation_period > 0.0
            && is_proper(self.period_prior()))
        {
            return Err(ModelError::RotationPeriod(self.rotation_period));
        }
        if self.n_spots == 0 {
            return Err(ModelError::NoSpots);
        }
        if !(self.latitude_cutoff >= 0.0
            && self.latitude_cutoff < 90.0
            && is_proper(self.latitude_prior()))
        {
            return Err(ModelError::LatitudeCutoff(self.latitude_cutoff));
        }
        if !(self.scale_error.is_finite() && self.scale_error >= 1.0) {
            return Err(ModelError::ScaleError(self.scale_error));
        }
        if self.skip_n_points == 0 {
            return Err(ModelError::ZeroStride);
        }
        Ok(())
    }

    /// Bounds of the latitude prior in radians, measured from the pole
    pub fn latitude_bounds(&self) -> (f64, f64) {
        (
            self.latitude_cutoff.to_radians(),
            (180.0 - self.latitude_cutoff).to_radians(),
        )
    }

    /// `P_eq` prior: normal around the rotation period, truncated to `[0.4 P, 1.5 P]`
    pub(crate) fn period_prior(&self) -> TruncatedNormalParameters {
        let period = self.rotation_period;
        [period, 0.1, 0.4 * period, 1.5 * period]
    }

    /// Latitude prior: normal centred on the equator, truncated by the cutoff
    pub(crate) fn latitude_prior(&self) -> TruncatedNormalParameters {
        let (lower, upper) = self.latitude_bounds();
        [FRAC_PI_2, FRAC_PI_2, lower, upper]
    }

    /// Number of model parameters
    #[inline]
    pub fn n_params(&self) -> usize {
        super::parameters::N_GLOBAL + super::parameters::N_PER_SPOT * self.n_spots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn defaults() {
        let config: ModelConfig =
            serde_json::from_str(r#"{"rotation_period": 10.0, "n_spots": 2}"#).unwrap();
        assert_eq!(config, ModelConfig::new(10.0, 2));
        assert_eq!(config.latitude_cutoff, 10.0);
        assert_eq!(config.scale_error, 5.0);
        assert_eq!(config.skip_n_points, 1);
        assert!(!config.verbose);
        assert_eq!(config.n_params(), 10);
    }

    #[test]
    fn latitude_bounds() {
        let (lower, upper) = ModelConfig::new(1.0, 1).latitude_bounds();
        assert_relative_eq!(lower, PI / 18.0);
        assert_relative_eq!(upper, 17.0 * PI / 18.0);
    }

    #[test]
    fn invalid() {
        assert_eq!(
            ModelConfig::new(0.0, 1).validate(),
            Err(ModelError::RotationPeriod(0.0))
        );
        assert_eq!(
            ModelConfig::new(-3.0, 1).validate(),
            Err(ModelError::RotationPeriod(-3.0))
        );
        assert!(matches!(
            ModelConfig::new(f64::NAN, 1).validate(),
            Err(ModelError::RotationPeriod(_))
        ));
        assert_eq!(ModelConfig::new(1.0, 0).validate(), Err(ModelError::NoSpots));
        assert_eq!(
            ModelConfig::new(1.0, 1).with_latitude_cutoff(90.0).validate(),
            Err(ModelError::LatitudeCutoff(90.0))
        );
        assert_eq!(
            ModelConfig::new(1.0, 1).with_latitude_cutoff(-1.0).validate(),
            Err(ModelError::LatitudeCutoff(-1.0))
        );
        assert_eq!(
            ModelConfig::new(1.0, 1).with_scale_error(0.5).validate(),
            Err(ModelError::ScaleError(0.5))
        );
        assert_eq!(
            ModelConfig::new(1.0, 1).with_skip_n_points(0).validate(),
            Err(ModelError::ZeroStride)
        );
        // Period prior has no mass left in floating point
        assert_eq!(
            ModelConfig::new(1e-20, 1).validate(),
            Err(ModelError::RotationPeriod(1e-20))
        );
        assert!(matches!(
            ModelConfig::new(1e308, 1).validate(),
            Err(ModelError::RotationPeriod(_))
        ));
        assert!(
            ModelConfig::new(1.0, 1)
                .with_latitude_cutoff(0.0)
                .with_scale_error(1.0)
                .validate()
                .is_ok()
        );
    }
}
