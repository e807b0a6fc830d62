use criterion::Criterion;
use light_curve_starspot::{GpDetrend, LightCurve};
use light_curve_starspot_test_util::trended_light_curve;
use std::hint::black_box;

pub fn bench_detrend(c: &mut Criterion) {
    const COUNTS: [usize; 3] = [100, 300, 1000];

    let detrend = GpDetrend::default();
    for &n in COUNTS.iter() {
        let (t, flux, flux_err) = trended_light_curve(n, 30.0, 1e-3, 0);
        let lc = LightCurve::new(t, flux, flux_err).unwrap();
        c.bench_function(format!("GP trend {n}").as_str(), |b| {
            b.iter(|| detrend.trend(black_box(&lc)).unwrap())
        });
    }
}
