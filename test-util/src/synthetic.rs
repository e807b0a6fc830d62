use lazy_static::lazy_static;
use light_curve_starspot::ndarray::Array1;
use light_curve_starspot::spot_model::geometry::{Spot, Star, flux};
use light_curve_starspot::spot_model::unpack;
use rand::prelude::*;
use rand_distr::StandardNormal;

// We cannot return `LightCurve`, because it would cause cyclic crate dependencies
/// `(t, flux, flux_err)`
pub type TripleArray = (Array1<f64>, Array1<f64>, Array1<f64>);

/// Parameters of [ONE_SPOT_LIGHT_CURVE]: f0, P_eq, shear, comp_inc, lon_0, lat_0, R_spot_0
pub const ONE_SPOT_PARAMS: [f64; 7] = [0.0, 10.0, 0.05, 1.2, 3.0, 1.4, 0.03];

fn time_grid(n: usize, t_max: f64) -> Array1<f64> {
    Array1::linspace(0.0, t_max, n)
}

fn noise(rng: &mut StdRng, n: usize, sigma: f64) -> Array1<f64> {
    (0..n)
        .map(|_| sigma * rng.sample::<f64, _>(StandardNormal))
        .collect()
}

/// Constant unit flux with Gaussian noise
pub fn flat_light_curve(n: usize, t_max: f64, sigma: f64, seed: u64) -> TripleArray {
    let mut rng = StdRng::seed_from_u64(seed);
    let t = time_grid(n, t_max);
    let flux = noise(&mut rng, n, sigma) + 1.0;
    (t, flux, Array1::from_elem(n, sigma))
}

/// Noisy light curve of a spotted star with the given model parameters
pub fn spotted_light_curve(
    params: &[f64],
    n: usize,
    t_max: f64,
    sigma: f64,
    seed: u64,
) -> TripleArray {
    let mut rng = StdRng::seed_from_u64(seed);
    let t = time_grid(n, t_max);
    let t_mean = 0.5 * t_max;

    let (globals, spots) = unpack(params);
    let star = Star::new(&globals);
    let spots: Vec<_> = spots.iter().map(|spot| Spot::new(&globals, spot)).collect();
    let model = t.mapv(|t| flux(&star, &spots, t - t_mean));

    let flux = model + noise(&mut rng, n, sigma);
    (t, flux, Array1::from_elem(n, sigma))
}

/// Flat light curve multiplied by a slow quadratic trend
pub fn trended_light_curve(n: usize, t_max: f64, sigma: f64, seed: u64) -> TripleArray {
    let (t, flux, flux_err) = flat_light_curve(n, t_max, sigma, seed);
    let trend = t.mapv(|t| 1.0 + 0.02 * (t / t_max) - 0.01 * (t / t_max).powi(2));
    (t, flux * trend, flux_err)
}

lazy_static! {
    /// 100 observations over 20 days with 0.001 noise
    pub static ref ONE_SPOT_LIGHT_CURVE: TripleArray =
        spotted_light_curve(&ONE_SPOT_PARAMS, 100, 20.0, 0.001, 0);

    /// Light curves with one to three spots, keyed by the number of spots
    pub static ref SPOTTED_LIGHT_CURVES: Vec<(usize, TripleArray)> = vec![
        (1, ONE_SPOT_LIGHT_CURVE.clone()),
        (
            2,
            spotted_light_curve(
                &[0.0, 5.0, 0.1, 0.8, 1.0, 1.2, 0.05, 4.0, 2.0, 0.04],
                500,
                30.0,
                0.0005,
                1,
            ),
        ),
        (
            3,
            spotted_light_curve(
                &[0.01, 7.0, 0.0, 1.0, 0.5, 1.5, 0.05, 2.5, 1.0, 0.03, 5.0, 2.2, 0.04],
                1000,
                60.0,
                0.0005,
                2,
            ),
        ),
    ];
}
