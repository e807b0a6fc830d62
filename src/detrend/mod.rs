//! Gaussian process detrending of a light curve.

use crate::data::LightCurve;
use crate::error::DetrendError;
use crate::types::{Array1f, ArrayView1f};

use itertools::Itertools;
use nalgebra::{DMatrix, DVector};
use ndarray::Zip;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[cfg(feature = "plot")]
mod plot;

/// Time units are divided by this before the kernel is evaluated
const TIME_SCALE: f64 = 100.0;

/// Normalise a light curve by a zero-mean Matérn-3/2 Gaussian process trend
///
/// Kernel is
/// $$
/// k(\tau) = \sigma^2 \left(1 + \frac{\sqrt{3} \tau}{\rho}\right) \exp\left(-\frac{\sqrt{3} \tau}{\rho}\right),
/// $$
/// where $\sigma = \exp(\text{log\_sigma})$, $\rho = \exp(\text{log\_rho})$ and $\tau$ is the
/// time lag divided by 100. Flux errors are added to the diagonal of the covariance matrix.
/// The trend is the GP posterior mean at the observation times, the flux is divided by it.
///
/// If `plot` is set and the crate is built with the `plot` feature, the raw flux and the trend are
/// rendered to this PNG file.
///
/// The covariance is a dense `n × n` matrix factorised by Cholesky decomposition, so detrending
/// takes `O(n²)` memory and `O(n³)` time. About 8 GB are needed for 30 000 observations; bin or
/// subsample longer light curves before detrending them.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename = "GpDetrend")]
pub struct GpDetrend {
    #[serde(default = "GpDetrend::default_log_sigma")]
    pub log_sigma: f64,
    #[serde(default = "GpDetrend::default_log_rho")]
    pub log_rho: f64,
    #[serde(default)]
    pub plot: Option<PathBuf>,
}

impl GpDetrend {
    pub fn new(log_sigma: f64, log_rho: f64) -> Self {
        Self {
            log_sigma,
            log_rho,
            plot: None,
        }
    }

    #[inline]
    pub fn default_log_sigma() -> f64 {
        1.0
    }

    #[inline]
    pub fn default_log_rho() -> f64 {
        8.0
    }

    pub fn with_plot(mut self, path: impl Into<PathBuf>) -> Self {
        self.plot = Some(path.into());
        self
    }

    fn validate(&self) -> Result<(), DetrendError> {
        if self.log_sigma.is_finite() && self.log_rho.is_finite() {
            Ok(())
        } else {
            Err(DetrendError::Hyperparameters {
                log_sigma: self.log_sigma,
                log_rho: self.log_rho,
            })
        }
    }

    /// Kernel value at the scaled time lag `tau`
    pub fn kernel(&self, tau: f64) -> f64 {
        let sigma2 = f64::exp(2.0 * self.log_sigma);
        let a = f64::sqrt(3.0) * tau.abs() / f64::exp(self.log_rho);
        sigma2 * (1.0 + a) * f64::exp(-a)
    }

    fn kernel_matrix(&self, t: ArrayView1f) -> DMatrix<f64> {
        let n = t.len();
        DMatrix::from_fn(n, n, |i, j| self.kernel((t[i] - t[j]) / TIME_SCALE))
    }

    /// GP posterior mean of the flux at the observation times
    pub fn trend(&self, lc: &LightCurve) -> Result<Array1f, DetrendError> {
        self.validate()?;
        lc.validate()?;

        let mut k = self.kernel_matrix(lc.t());
        for (i, &err) in lc.flux_err().iter().enumerate() {
            k[(i, i)] += err * err;
        }
        let cholesky = k.cholesky().ok_or(DetrendError::SingularCovariance)?;
        let flux = DVector::from_iterator(lc.lenu(), lc.flux().iter().copied());
        let alpha = cholesky.solve(&flux);
        // K α = flux with K = K* + diag(err²), so K* α = flux - err² α
        let trend: Array1f = Zip::from(lc.flux())
            .and(lc.flux_err())
            .and(alpha.as_slice())
            .map_collect(|&f, &err, &a| f - err * err * a);

        if let Some((i, _)) = trend.iter().find_position(|&&x| !x.is_finite() || x == 0.0) {
            return Err(DetrendError::DegenerateTrend(i));
        }
        Ok(trend)
    }

    /// Divide the light curve flux by the GP trend in place and return the trend
    ///
    /// Time and flux errors are not changed.
    pub fn normalize(&self, lc: &mut LightCurve) -> Result<Array1f, DetrendError> {
        let trend = self.trend(lc)?;
        tracing::debug!(
            "GP trend with log_sigma = {}, log_rho = {} computed for {} observations",
            self.log_sigma,
            self.log_rho,
            lc.lenu()
        );
        if let Some(path) = &self.plot {
            self.plot(path, lc, trend.view())?;
        }
        lc.divide_flux(trend.view());
        Ok(trend)
    }

    #[cfg(feature = "plot")]
    fn plot(
        &self,
        path: &std::path::Path,
        lc: &LightCurve,
        trend: ArrayView1f,
    ) -> Result<(), DetrendError> {
        tracing::info!("Plotting GP trend to {}", path.display());
        plot::plot_trend(path, lc.t(), lc.flux(), trend)
    }

    #[cfg(not(feature = "plot"))]
    fn plot(
        &self,
        path: &std::path::Path,
        _lc: &LightCurve,
        _trend: ArrayView1f,
    ) -> Result<(), DetrendError> {
        tracing::warn!(
            "Cannot plot GP trend to {}: light-curve-starspot is built without the \"plot\" feature",
            path.display()
        );
        Ok(())
    }
}

impl Default for GpDetrend {
    fn default() -> Self {
        Self::new(Self::default_log_sigma(), Self::default_log_rho())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;

    use approx::assert_relative_eq;
    use light_curve_starspot_test_util::trended_light_curve;

    serde_json_test!(
        gp_detrend_serde,
        GpDetrend,
        GpDetrend::new(0.5, 3.0).with_plot("trend.png"),
    );

    #[test]
    fn defaults() {
        let detrend: GpDetrend = serde_json::from_str("{}").unwrap();
        assert_eq!(detrend, GpDetrend::default());
        assert_eq!(detrend.log_sigma, 1.0);
        assert_eq!(detrend.log_rho, 8.0);
        assert!(detrend.plot.is_none());
    }

    #[test]
    fn matern32_kernel() {
        let detrend = GpDetrend::new(0.5, 0.0);
        assert_relative_eq!(detrend.kernel(0.0), f64::exp(1.0), max_relative = 1e-12);
        let sqrt3 = f64::sqrt(3.0);
        assert_relative_eq!(
            detrend.kernel(1.0),
            f64::exp(1.0) * (1.0 + sqrt3) * f64::exp(-sqrt3),
            max_relative = 1e-12
        );
        assert_eq!(detrend.kernel(-0.3), detrend.kernel(0.3));
    }

    #[test]
    fn flat_flux_stays_near_unity() {
        let sigma = 1e-3;
        let mut lc = flat_light_curve(200, 30.0, sigma);
        let t = lc.t().to_owned();
        let flux_err = lc.flux_err().to_owned();

        let trend = GpDetrend::default().normalize(&mut lc).unwrap();
        assert!(trend.iter().all(|&x| (x - 1.0).abs() < 3.0 * sigma));
        assert!(lc.flux().iter().all(|&f| (f - 1.0).abs() < 6.0 * sigma));
        assert_eq!(lc.t(), t);
        assert_eq!(lc.flux_err(), flux_err);
    }

    #[test]
    fn removes_slow_trend() {
        let sigma = 1e-3;
        let (t, flux, flux_err) = trended_light_curve(100, 20.0, sigma, 0);
        let mut lc = LightCurve::new(t, flux, flux_err).unwrap();
        assert!(lc.flux().iter().any(|&f| (f - 1.0).abs() > 6.0 * sigma));

        GpDetrend::new(0.0, -1.0).normalize(&mut lc).unwrap();
        assert!(lc.flux().iter().all(|&f| (f - 1.0).abs() < 6.0 * sigma));
    }

    #[test]
    fn trend_matches_noise_free_kernel_product() {
        let lc = one_spot_light_curve();
        let detrend = GpDetrend::new(0.0, -1.0);
        let trend = detrend.trend(&lc).unwrap();

        let k_star = detrend.kernel_matrix(lc.t());
        let mut k = k_star.clone();
        for (i, &err) in lc.flux_err().iter().enumerate() {
            k[(i, i)] += err * err;
        }
        let flux = DVector::from_iterator(lc.lenu(), lc.flux().iter().copied());
        let alpha = k.cholesky().unwrap().solve(&flux);
        let desired: Array1f = (k_star * alpha).iter().copied().collect();
        assert_relative_eq!(trend, desired, epsilon = 1e-7, max_relative = 1e-7);
    }

    #[test]
    fn normalisation_result_is_flux_over_trend() {
        let mut lc = one_spot_light_curve();
        let raw = lc.flux().to_owned();
        let trend = GpDetrend::default().normalize(&mut lc).unwrap();
        assert_relative_eq!(lc.flux(), raw / trend, max_relative = 1e-12);
    }

    #[test]
    fn non_finite_hyperparameters() {
        let mut lc = one_spot_light_curve();
        let raw = lc.flux().to_owned();
        assert!(matches!(
            GpDetrend::new(f64::NAN, 8.0).normalize(&mut lc),
            Err(DetrendError::Hyperparameters { .. })
        ));
        assert!(matches!(
            GpDetrend::new(1.0, f64::INFINITY).trend(&lc),
            Err(DetrendError::Hyperparameters { .. })
        ));
        assert_eq!(lc.flux(), raw);
    }
}
