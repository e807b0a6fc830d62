use criterion::Criterion;
use light_curve_starspot::{LightCurve, ModelConfig, SpotModel};
use light_curve_starspot_test_util::SPOTTED_LIGHT_CURVES;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::hint::black_box;

fn models() -> Vec<(usize, SpotModel)> {
    SPOTTED_LIGHT_CURVES
        .iter()
        .map(|(n_spots, (t, flux, flux_err))| {
            let lc = LightCurve::new(t.clone(), flux.clone(), flux_err.clone()).unwrap();
            let model = SpotModel::new(&lc, ModelConfig::new(10.0, *n_spots)).unwrap();
            (lc.lenu(), model)
        })
        .collect()
}

pub fn bench_likelihood(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    for (n_obs, model) in models() {
        let params = model.ln_prior().sample(&mut rng);
        c.bench_function(
            format!("log_likelihood {} spots {n_obs} obs", model.name()).as_str(),
            |b| b.iter(|| model.log_likelihood(black_box(&params)).unwrap()),
        );
    }
}

pub fn bench_gradient(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    for (n_obs, model) in models() {
        let params = model.ln_prior().sample(&mut rng);
        let mut grad = vec![0.0; model.n_params()];
        c.bench_function(
            format!("log_likelihood_with_grad {} spots {n_obs} obs", model.name()).as_str(),
            |b| b.iter(|| model.log_likelihood_with_grad(black_box(&params), &mut grad).unwrap()),
        );
    }
}
