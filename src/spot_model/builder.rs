use crate::data::{LightCurve, ObservedData};
use crate::error::ModelError;
use crate::inference::prior::{LnPrior, LnPrior1D};
use crate::quiet::QuietGuard;
use crate::spot_model::config::ModelConfig;
use crate::spot_model::parameters::{GlobalParameters, SpotParameters, parameter_names};
use crate::spot_model::SpotModel;

use std::f64::consts::{FRAC_PI_2, PI};
use std::sync::Arc;

/// Longitude wedge boundaries `2π i / n_spots` for `i` in `0..=n_spots`
pub fn longitude_wedges(n_spots: usize) -> Vec<f64> {
    (0..=n_spots)
        .map(|i| 2.0 * PI * (i as f64) / (n_spots as f64))
        .collect()
}

/// Incremental construction of a [SpotModel]
///
/// Parameters are declared in order with their priors, then the observations are attached.
/// Log output of every step is suppressed for the duration of the call unless the configuration
/// is verbose.
///
///
/// ```
/// use light_curve_starspot::{LightCurve, ModelBuilder, ModelConfig};
///
/// let t: Vec<f64> = (0..50).map(|i| i as f64 * 0.4).collect();
/// let lc = LightCurve::new(t, vec![1.0; 50], vec![0.001; 50]).unwrap();
/// let model = ModelBuilder::new(ModelConfig::new(10.0, 2))
///     .unwrap()
///     .declare_globals()
///     .declare_spots()
///     .observe(&lc)
///     .unwrap()
///     .build()
///     .unwrap();
/// assert_eq!(model.n_params(), 10);
/// ```
#[derive(Debug)]
pub struct ModelBuilder {
    config: ModelConfig,
    names: Vec<String>,
    priors: Vec<LnPrior1D>,
    data: Option<ObservedData>,
}

impl ModelBuilder {
    /// Validate the configuration and start an empty model
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        config.validate()?;
        let _quiet = QuietGuard::unless(config.verbose);
        tracing::debug!(
            "Building model with {} spots, rotation period {}",
            config.n_spots,
            config.rotation_period
        );
        Ok(Self {
            names: Vec::with_capacity(config.n_params()),
            priors: Vec::with_capacity(config.n_params()),
            config,
            data: None,
        })
    }

    fn declare(mut self, name: impl Into<String>, prior: LnPrior1D) -> Self {
        let _quiet = QuietGuard::unless(self.config.verbose);
        let name = name.into();
        tracing::debug!("Declaring {name} ~ {prior:?}");
        self.names.push(name);
        self.priors.push(prior);
        self
    }

    /// Declare `f0`, `P_eq`, `shear` and `comp_inc`
    pub fn declare_globals(self) -> Self {
        let _quiet = QuietGuard::unless(self.config.verbose);
        let [mu, std, left, right] = self.config.period_prior();
        let [f0, p_eq, shear, comp_inc] = GlobalParameters::NAMES;
        self.declare(f0, LnPrior1D::half_normal(1.0))
            .declare(p_eq, LnPrior1D::truncated_normal(mu, std, left, right))
            .declare(shear, LnPrior1D::half_normal(0.2))
            .declare(comp_inc, LnPrior1D::uniform(0.0, FRAC_PI_2))
    }

    /// Declare longitude, latitude and radius of every spot
    ///
    /// Each spot longitude is restricted to its own wedge, so spots cannot exchange places.
    pub fn declare_spots(mut self) -> Self {
        let _quiet = QuietGuard::unless(self.config.verbose);
        let wedges = longitude_wedges(self.config.n_spots);
        let [lat_mu, lat_std, lat_lower, lat_upper] = self.config.latitude_prior();
        for (i, wedge) in wedges.windows(2).enumerate() {
            let (left, right) = (wedge[0], wedge[1]);
            let [lon, lat, r_spot] = SpotParameters::names(i);
            self = self
                .declare(
                    lon,
                    LnPrior1D::truncated_normal(
                        0.5 * (left + right),
                        0.5 * (right - left),
                        left,
                        right,
                    ),
                )
                .declare(
                    lat,
                    LnPrior1D::truncated_normal(lat_mu, lat_std, lat_lower, lat_upper),
                )
                .declare(r_spot, LnPrior1D::half_normal(0.1));
        }
        self
    }

    /// Attach the Gaussian likelihood over the subsampled light curve
    pub fn observe(mut self, lc: &LightCurve) -> Result<Self, ModelError> {
        let _quiet = QuietGuard::unless(self.config.verbose);
        let data = ObservedData::new(lc, self.config.skip_n_points, self.config.scale_error)?;
        tracing::debug!(
            "Observing {} of {} points, error scale {}",
            data.lenu(),
            lc.lenu(),
            self.config.scale_error
        );
        self.data = Some(data);
        Ok(self)
    }

    /// Number of parameters declared so far
    pub fn n_declared(&self) -> usize {
        self.names.len()
    }

    /// Check that every parameter is declared in order and the observations are attached
    pub fn build(self) -> Result<SpotModel, ModelError> {
        let _quiet = QuietGuard::unless(self.config.verbose);
        let expected = self.config.n_params();
        if self.names.len() != expected {
            return Err(ModelError::ParameterCount {
                actual: self.names.len(),
                expected,
            });
        }
        let expected_names = parameter_names(self.config.n_spots);
        if let Some((index, (actual, expected))) = self
            .names
            .iter()
            .zip(expected_names)
            .enumerate()
            .find(|(_, (actual, expected))| *actual != expected)
        {
            return Err(ModelError::ParameterName {
                index,
                actual: actual.clone(),
                expected,
            });
        }
        let data = self.data.ok_or(ModelError::NotObserved)?;
        tracing::debug!("Model {} is built", self.config.n_spots);
        Ok(SpotModel {
            config: self.config,
            names: self.names,
            ln_prior: LnPrior::ind_components(self.priors),
            data: Arc::new(data),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::prior::LnPrior1DTrait;
    use crate::tests::*;

    use approx::assert_relative_eq;
    use tracing::dispatcher;
    use tracing::subscriber::NoSubscriber;

    #[test]
    fn wedges_partition_circle() {
        for n_spots in 1..=7 {
            let wedges = longitude_wedges(n_spots);
            assert_eq!(wedges.len(), n_spots + 1);
            assert_eq!(wedges[0], 0.0);
            assert_relative_eq!(wedges[n_spots], 2.0 * PI, max_relative = 1e-15);
            for w in wedges.windows(2) {
                assert!(w[1] > w[0]);
                assert_relative_eq!(w[1] - w[0], 2.0 * PI / n_spots as f64, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn longitude_priors_follow_wedges() {
        let n_spots = 4;
        let model = SpotModel::new(&one_spot_light_curve(), ModelConfig::new(10.0, n_spots)).unwrap();
        let wedges = longitude_wedges(n_spots);
        for i in 0..n_spots {
            let prior = &model.ln_prior().components[4 + 3 * i];
            assert_eq!(prior.support(), (wedges[i], wedges[i + 1]));
        }
    }

    #[test]
    fn latitude_priors_avoid_poles() {
        for cutoff in [0.0, 10.0, 45.0, 80.0] {
            let config = ModelConfig::new(10.0, 3).with_latitude_cutoff(cutoff);
            let model = SpotModel::new(&one_spot_light_curve(), config).unwrap();
            for i in 0..3 {
                let (lower, upper) = model.ln_prior().components[5 + 3 * i].support();
                assert!(lower >= f64::to_radians(cutoff));
                assert!(upper <= f64::to_radians(180.0 - cutoff));
            }
        }
    }

    #[test]
    fn period_prior_is_positive() {
        let model = SpotModel::new(&one_spot_light_curve(), ModelConfig::new(3.0, 1)).unwrap();
        let (lower, upper) = model.ln_prior().components[1].support();
        assert_relative_eq!(lower, 1.2, max_relative = 1e-12);
        assert_relative_eq!(upper, 4.5, max_relative = 1e-12);
    }

    #[test]
    fn invalid_config_fails_before_declaring() {
        assert_eq!(
            ModelBuilder::new(ModelConfig::new(10.0, 0)).unwrap_err(),
            ModelError::NoSpots
        );
        assert_eq!(
            ModelBuilder::new(ModelConfig::new(-1.0, 1)).unwrap_err(),
            ModelError::RotationPeriod(-1.0)
        );
    }

    #[test]
    fn extreme_configs_fail_validation_instead_of_panicking() {
        let lc = one_spot_light_curve();
        let mut cutoff = 90.0_f64;
        for _ in 0..8 {
            cutoff = f64::from_bits(cutoff.to_bits() - 1);
            let config = ModelConfig::new(10.0, 1).with_latitude_cutoff(cutoff);
            match SpotModel::new(&lc, config) {
                Ok(model) => {
                    let (lower, upper) = model.ln_prior().components[5].support();
                    assert!(lower < upper);
                }
                Err(err) => assert_eq!(err, ModelError::LatitudeCutoff(cutoff)),
            }
        }
        assert_eq!(
            SpotModel::new(&lc, ModelConfig::new(1e-20, 1)).unwrap_err(),
            ModelError::RotationPeriod(1e-20)
        );
    }

    #[test]
    fn incomplete_builder() {
        let lc = one_spot_light_curve();
        let config = ModelConfig::new(10.0, 1);

        let missing_spots = ModelBuilder::new(config.clone())
            .unwrap()
            .declare_globals()
            .observe(&lc)
            .unwrap();
        assert_eq!(missing_spots.n_declared(), 4);
        assert_eq!(
            missing_spots.build().unwrap_err(),
            ModelError::ParameterCount {
                actual: 4,
                expected: 7
            }
        );

        let missing_data = ModelBuilder::new(config)
            .unwrap()
            .declare_globals()
            .declare_spots();
        assert_eq!(missing_data.build().unwrap_err(), ModelError::NotObserved);
    }

    #[test]
    fn parameters_must_be_declared_in_order() {
        let lc = one_spot_light_curve();
        let swapped = ModelBuilder::new(ModelConfig::new(10.0, 1))
            .unwrap()
            .declare_spots()
            .declare_globals()
            .observe(&lc)
            .unwrap();
        assert_eq!(
            swapped.build().unwrap_err(),
            ModelError::ParameterName {
                index: 0,
                actual: "lon_0".to_owned(),
                expected: "f0".to_owned(),
            }
        );

        let renamed = ModelBuilder::new(ModelConfig::new(10.0, 1))
            .unwrap()
            .declare_globals()
            .declare("lon_0", LnPrior1D::uniform(0.0, 1.0))
            .declare("lat_0", LnPrior1D::uniform(0.0, 1.0))
            .declare("radius", LnPrior1D::half_normal(0.1))
            .observe(&lc)
            .unwrap();
        assert!(matches!(
            renamed.build(),
            Err(ModelError::ParameterName { index: 6, .. })
        ));
    }

    fn is_silenced() -> bool {
        dispatcher::get_default(|d| d.is::<NoSubscriber>())
    }

    #[test]
    fn interleaved_builders_restore_logging() {
        let subscriber = tracing_subscriber::fmt().with_test_writer().finish();
        let _default = tracing::subscriber::set_default(subscriber);
        let lc = one_spot_light_curve();

        let first = ModelBuilder::new(ModelConfig::new(10.0, 1)).unwrap();
        let second = ModelBuilder::new(ModelConfig::new(5.0, 2)).unwrap();
        assert!(!is_silenced());

        let first = first.declare_globals().declare_spots().observe(&lc).unwrap();
        let second = second.declare_globals().declare_spots().observe(&lc).unwrap();
        assert!(!is_silenced());

        let first = first.build().unwrap();
        assert!(!is_silenced());
        let second = second.build().unwrap();
        assert!(!is_silenced());
        assert_eq!((first.n_params(), second.n_params()), (7, 10));
    }
}
