use crate::data::LightCurve;
use crate::error::ModelError;
use crate::types::{Array1f, ArrayView1f};

use ndarray::{Zip, s};
use std::f64::consts::PI;

/// Subsampled observations the likelihood is evaluated on
///
/// Time is centred on the mean over the full light curve, not over the subsample. The Gaussian
/// noise scale is `scale_error * flux_err`, stored as its inverse.
#[derive(Clone, Debug, PartialEq)]
pub struct ObservedData {
    /// Centred time
    pub t: Array1f,
    /// Observed flux
    pub m: Array1f,
    /// Inverse noise scale
    pub inv_err: Array1f,
    /// Mean time of the full light curve
    pub t_mean: f64,
    /// Normalisation of the Gaussian likelihood, `-Σ ln σ_j - n/2 ln 2π`
    pub ln_norm: f64,
}

impl ObservedData {
    pub fn new(lc: &LightCurve, skip_n_points: usize, scale_error: f64) -> Result<Self, ModelError> {
        if skip_n_points == 0 {
            return Err(ModelError::ZeroStride);
        }
        lc.validate()?;

        let step = skip_n_points as isize;
        let t_mean = lc.t_mean();
        let t = lc.t().slice(s![..;step]).mapv(|t| t - t_mean);
        let m = lc.flux().slice(s![..;step]).to_owned();
        let sigma = lc.flux_err().slice(s![..;step]).mapv(|err| scale_error * err);
        let inv_err = sigma.mapv(f64::recip);
        let ln_norm = -sigma.mapv(f64::ln).sum() - 0.5 * (sigma.len() as f64) * f64::ln(2.0 * PI);

        Ok(Self {
            t,
            m,
            inv_err,
            t_mean,
            ln_norm,
        })
    }

    #[inline]
    pub fn lenu(&self) -> usize {
        self.t.len()
    }

    /// Gaussian log-likelihood of the model flux given as a function of centred time
    pub fn ln_likelihood<U, F>(&self, model: F) -> U
    where
        U: crate::LikeFloat,
        F: Fn(f64) -> U,
    {
        let mut chi2 = U::zero();
        Zip::from(&self.t)
            .and(&self.m)
            .and(&self.inv_err)
            .for_each(|&t, &m, &inv_err| {
                let residual = (model(t) - U::constant(m)) * U::constant(inv_err);
                chi2 = chi2 + residual * residual;
            });
        U::constant(self.ln_norm) - U::constant(0.5) * chi2
    }

    /// Centre arbitrary observation times the same way as the stored ones
    pub fn centre(&self, t: ArrayView1f) -> Array1f {
        t.mapv(|t| t - self.t_mean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use ndarray::array;

    fn light_curve() -> LightCurve {
        LightCurve::new(
            vec![0.0, 1.0, 2.0, 3.0, 4.0],
            vec![1.0, 1.1, 1.2, 1.3, 1.4],
            vec![0.1, 0.2, 0.1, 0.2, 0.1],
        )
        .unwrap()
    }

    #[test]
    fn subsampling_keeps_full_mean() {
        let data = ObservedData::new(&light_curve(), 2, 5.0).unwrap();
        assert_eq!(data.t, array![-2.0, 0.0, 2.0]);
        assert_eq!(data.m, array![1.0, 1.2, 1.4]);
        assert_relative_eq!(data.inv_err, array![2.0, 2.0, 2.0], max_relative = 1e-12);

        let data = ObservedData::new(&light_curve(), 3, 1.0).unwrap();
        assert_eq!(data.t, array![-2.0, 1.0]);
        assert_eq!(data.t_mean, 2.0);
    }

    #[test]
    fn zero_stride() {
        assert_eq!(
            ObservedData::new(&light_curve(), 0, 5.0),
            Err(ModelError::ZeroStride)
        );
    }

    #[test]
    fn gaussian_likelihood() {
        let data = ObservedData::new(&light_curve(), 1, 1.0).unwrap();
        let value: f64 = data.ln_likelihood(|t| 1.2 + 0.1 * t);
        let expected: f64 = [0.1, 0.2, 0.1, 0.2, 0.1]
            .iter()
            .map(|&s: &f64| -s.ln() - 0.5 * (2.0 * PI).ln())
            .sum();
        assert_relative_eq!(value, expected, max_relative = 1e-12);
    }
}
