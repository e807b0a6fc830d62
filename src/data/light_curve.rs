use crate::error::LightCurveError;
use crate::types::{Array1f, ArrayView1f};

use ndarray::Zip;
use serde::{Deserialize, Serialize};

/// Observed light curve: time, flux and flux error
///
/// All columns have the same non-zero length, time is non-decreasing, flux errors are positive.
/// The forward model reads it without mutation, [crate::GpDetrend::normalize] divides flux in
/// place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LightCurveColumns", into = "LightCurveColumns")]
pub struct LightCurve {
    t: Array1f,
    flux: Array1f,
    flux_err: Array1f,
}

impl LightCurve {
    /// Construct [LightCurve] from array-like objects
    ///
    /// Input arrays could be [`ndarray::Array1`] or `Vec<f64>`.
    pub fn new(
        t: impl Into<Array1f>,
        flux: impl Into<Array1f>,
        flux_err: impl Into<Array1f>,
    ) -> Result<Self, LightCurveError> {
        let lc = Self {
            t: t.into(),
            flux: flux.into(),
            flux_err: flux_err.into(),
        };
        lc.validate()?;
        Ok(lc)
    }

    /// Check the invariants of the light curve
    pub fn validate(&self) -> Result<(), LightCurveError> {
        if self.t.is_empty() {
            return Err(LightCurveError::Empty);
        }
        for (name, column) in [("flux", &self.flux), ("flux_err", &self.flux_err)] {
            if column.len() != self.t.len() {
                return Err(LightCurveError::LengthMismatch {
                    name,
                    actual: column.len(),
                    expected: self.t.len(),
                });
            }
        }
        for (name, column) in [
            ("t", &self.t),
            ("flux", &self.flux),
            ("flux_err", &self.flux_err),
        ] {
            if !column.iter().all(|x| x.is_finite()) {
                return Err(LightCurveError::NonFinite(name));
            }
        }
        if self.t.windows(2).into_iter().any(|w| w[1] < w[0]) {
            return Err(LightCurveError::Unsorted);
        }
        if self.flux_err.iter().any(|&e| e <= 0.0) {
            return Err(LightCurveError::NonPositiveError);
        }
        Ok(())
    }

    /// Light curve length
    #[inline]
    pub fn lenu(&self) -> usize {
        self.t.len()
    }

    #[inline]
    pub fn t(&self) -> ArrayView1f<'_> {
        self.t.view()
    }

    #[inline]
    pub fn flux(&self) -> ArrayView1f<'_> {
        self.flux.view()
    }

    #[inline]
    pub fn flux_err(&self) -> ArrayView1f<'_> {
        self.flux_err.view()
    }

    /// Mean time over the full light curve
    pub fn t_mean(&self) -> f64 {
        // Validated light curve is never empty
        self.t.mean().unwrap_or(f64::NAN)
    }

    /// Divide flux by `trend` element-wise
    pub(crate) fn divide_flux(&mut self, trend: ArrayView1f) {
        Zip::from(&mut self.flux)
            .and(&trend)
            .for_each(|flux, &trend| *flux /= trend);
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename = "LightCurve")]
struct LightCurveColumns {
    t: Vec<f64>,
    flux: Vec<f64>,
    flux_err: Vec<f64>,
}

impl From<LightCurve> for LightCurveColumns {
    fn from(lc: LightCurve) -> Self {
        Self {
            t: lc.t.to_vec(),
            flux: lc.flux.to_vec(),
            flux_err: lc.flux_err.to_vec(),
        }
    }
}

impl TryFrom<LightCurveColumns> for LightCurve {
    type Error = LightCurveError;

    fn try_from(columns: LightCurveColumns) -> Result<Self, Self::Error> {
        Self::new(columns.t, columns.flux, columns.flux_err)
    }
}
