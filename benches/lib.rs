use criterion::{criterion_group, criterion_main};

mod detrend;
mod spot_model;

criterion_group!(
    benches,
    spot_model::bench_likelihood,
    spot_model::bench_gradient,
    detrend::bench_detrend
);
criterion_main!(benches);
