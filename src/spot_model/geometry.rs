//! Projected position and flux deficit of circular spots on a rotating sheared sphere.
//!
//! The stellar disk has unit radius, `x` and `y` are coordinates in the sky plane and `z` points
//! towards the observer. A spot of radius `R` at sky position `(x, y)` removes
//! `R² (1 - CONTRAST) sqrt(1 - x² - y²)` of the flux while it is on the visible hemisphere.

use crate::inference::LikeFloat;
use crate::spot_model::parameters::{GlobalParameters, SpotParameters};

use std::f64::consts::{FRAC_PI_2, PI};

/// Relative brightness of a spot with respect to the photosphere
pub const CONTRAST: f64 = 0.4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpotPosition<U> {
    pub x: U,
    pub y: U,
    pub z: U,
}

impl<U: LikeFloat> SpotPosition<U> {
    /// Squared projected distance from the disk centre
    #[inline]
    pub fn rsq(&self) -> U {
        self.x * self.x + self.y * self.y
    }

    /// Spot is on the visible hemisphere and inside the disk
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.z.re() > 0.0 && self.rsq().re() < 1.0
    }
}

/// Rotation period at colatitude `lat` for a star with equatorial period `p_eq`
#[inline]
pub fn spot_period<U: LikeFloat>(p_eq: U, shear: U, lat: U) -> U {
    let s = (lat - U::constant(FRAC_PI_2)).sin();
    p_eq / (U::one() - shear * s * s)
}

#[inline]
fn deficit_impl<U: LikeFloat>(position: &SpotPosition<U>, amplitude: U) -> U {
    let visible = position.is_visible();
    let root_arg = U::select(visible, U::one() - position.rsq(), U::one());
    U::select(visible, amplitude * root_arg.sqrt(), U::zero())
}

/// Time-independent part of the star geometry
#[derive(Clone, Copy, Debug)]
pub struct Star<U> {
    baseline: U,
    sin_inc: U,
    cos_inc: U,
}

impl<U: LikeFloat> Star<U> {
    pub fn new(globals: &GlobalParameters<U>) -> Self {
        Self {
            baseline: U::one() + globals.f0,
            sin_inc: globals.comp_inc.sin(),
            cos_inc: globals.comp_inc.cos(),
        }
    }

    #[inline]
    pub fn baseline(&self) -> U {
        self.baseline
    }
}

/// Time-independent part of a single spot
#[derive(Clone, Copy, Debug)]
pub struct Spot<U> {
    angular_velocity: U,
    lon: U,
    sin_lat: U,
    cos_lat: U,
    amplitude: U,
}

impl<U: LikeFloat> Spot<U> {
    pub fn new(globals: &GlobalParameters<U>, spot: &SpotParameters<U>) -> Self {
        let period = spot_period(globals.p_eq, globals.shear, spot.lat);
        Self {
            angular_velocity: U::constant(2.0 * PI) / period,
            lon: spot.lon,
            sin_lat: spot.lat.sin(),
            cos_lat: spot.lat.cos(),
            amplitude: spot.r_spot * spot.r_spot * U::constant(1.0 - CONTRAST),
        }
    }

    /// Rotational phase at centred time `t`
    #[inline]
    pub fn phase(&self, t: f64) -> U {
        self.angular_velocity * U::constant(t) - self.lon
    }

    #[inline]
    pub fn position(&self, star: &Star<U>, t: f64) -> SpotPosition<U> {
        Self::position_impl(
            self.phase(t),
            self.sin_lat,
            self.cos_lat,
            star.sin_inc,
            star.cos_inc,
        )
    }

    /// Flux removed by the spot at centred time `t`
    ///
    /// Exactly zero when the spot is hidden. The square root never sees a non-positive argument,
    /// so derivatives stay finite on both sides of the limb.
    #[inline]
    pub fn deficit(&self, star: &Star<U>, t: f64) -> U {
        deficit_impl(&self.position(star, t), self.amplitude)
    }

    // x and y use the phase shifted by a quarter turn, z uses the phase itself
    #[inline]
    fn position_impl(phase: U, sin_lat: U, cos_lat: U, sin_inc: U, cos_inc: U) -> SpotPosition<U> {
        let shifted = phase - U::constant(FRAC_PI_2);
        SpotPosition {
            x: shifted.cos() * sin_inc * sin_lat + cos_inc * cos_lat,
            y: -(shifted.sin() * sin_lat),
            z: cos_lat * sin_inc - phase.sin() * cos_inc * sin_lat,
        }
    }
}

/// Model flux at centred time `t`
#[inline]
pub fn flux<U: LikeFloat>(star: &Star<U>, spots: &[Spot<U>], t: f64) -> U {
    spots
        .iter()
        .fold(star.baseline(), |flux, spot| flux - spot.deficit(star, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::Dual;

    use approx::assert_relative_eq;

    fn globals() -> GlobalParameters {
        GlobalParameters {
            f0: 0.01,
            p_eq: 10.0,
            shear: 0.1,
            comp_inc: 1.0,
        }
    }

    #[test]
    fn equatorial_period_is_p_eq() {
        assert_relative_eq!(spot_period(10.0, 0.3, FRAC_PI_2), 10.0);
        // At the pole the period is stretched by 1 / (1 - shear)
        assert_relative_eq!(spot_period(10.0, 0.2, 0.0), 12.5, max_relative = 1e-12);
    }

    #[test]
    fn zero_radius_leaves_baseline() {
        let globals = globals();
        let star = Star::new(&globals);
        let spot = Spot::new(
            &globals,
            &SpotParameters {
                lon: 1.0,
                lat: 1.2,
                r_spot: 0.0,
            },
        );
        for t in [-7.0, -1.0, 0.0, 0.5, 3.0, 12.0] {
            assert_eq!(flux(&star, &[spot], t), 1.0 + globals.f0);
        }
    }

    /// Star and spot seen at rotational phase `phase` for `t = 0`
    fn at_phase<U: LikeFloat>(phase: U, lat: U, inc: U, r_spot: U) -> (Star<U>, Spot<U>) {
        let globals = GlobalParameters {
            f0: U::zero(),
            p_eq: U::constant(10.0),
            shear: U::zero(),
            comp_inc: inc,
        };
        let spot = SpotParameters {
            lon: -phase,
            lat,
            r_spot,
        };
        (Star::new(&globals), Spot::new(&globals, &spot))
    }

    #[test]
    fn hidden_spot_contributes_nothing() {
        // Edge-on star with a spot on the far hemisphere: z = cos(lat) < 0, rsq = sin²(lat) < 1
        let inc = FRAC_PI_2;
        let lat = 2.0;
        for phase in [0.0, 0.7, 2.0, 4.0] {
            let (star, spot) = at_phase(phase, lat, inc, 0.3);
            let position = spot.position(&star, 0.0);
            assert!(position.z <= 0.0);
            assert!(position.rsq() < 1.0);
            assert_eq!(spot.deficit(&star, 0.0), 0.0);
        }
    }

    #[test]
    fn disk_centre_spot() {
        // Zero inclination, equatorial spot half a turn past the limb
        let (star, spot) = at_phase(3.0 * FRAC_PI_2, FRAC_PI_2, 0.0, 0.1);
        let position = spot.position(&star, 0.0);
        assert_relative_eq!(position.z, 1.0, epsilon = 1e-15);
        assert_relative_eq!(position.x, 0.0, epsilon = 1e-15);
        assert_relative_eq!(position.y, 0.0, epsilon = 1e-15);
        assert_relative_eq!(
            spot.deficit(&star, 0.0),
            0.01 * (1.0 - CONTRAST),
            max_relative = 1e-12
        );
    }

    #[test]
    fn hidden_spot_has_zero_derivatives() {
        let mut r = Dual::from_real(0.3);
        r[1] = 1.0;
        let (star, spot) = at_phase(
            Dual::from_real(0.7),
            Dual::from_real(2.0),
            Dual::from_real(FRAC_PI_2),
            r,
        );
        let deficit = spot.deficit(&star, 0.0);
        assert_eq!(deficit.re(), 0.0);
        assert_eq!(deficit[1], 0.0);
    }

    #[test]
    fn deterministic() {
        let globals = globals();
        let star = Star::new(&globals);
        let spots: Vec<_> = [(0.5, 1.0, 0.1), (3.0, 2.0, 0.2)]
            .iter()
            .map(|&(lon, lat, r_spot)| Spot::new(&globals, &SpotParameters { lon, lat, r_spot }))
            .collect();
        for t in [-3.0, 0.0, 4.5] {
            let a = flux(&star, &spots, t);
            let b = flux(&star, &spots, t);
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }
}
