//! Benchmarks the per-tick estimation hot path (C6) at each supported
//! FFT size, since `Core`'s compute thread must finish one tick well
//! within `1 / calculation_rate` seconds to keep up in real time.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use instrument_tuner::config::Config;
use instrument_tuner::decimator::Decimator;
use instrument_tuner::estimator::Estimator;
use instrument_tuner::filter::Filter;
use instrument_tuner::signal::WindowType;
use std::f64::consts::PI;

fn push_sine(dec: &Decimator, freq: f64, sample_rate: f64, total: usize) {
    let step = 2.0 * PI * freq / sample_rate;
    let samples: Vec<f64> = (0..total).map(|i| 0.5 * (step * i as f64).sin()).collect();
    dec.push(&samples);
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimator_tick");

    for &fft_size in instrument_tuner::fft::SUPPORTED_SIZES.iter() {
        let config = Config {
            fft_size,
            temporal_buffer_size: fft_size * 2,
            window_type: WindowType::Hamming,
            ..Config::default()
        };
        let dec = Decimator::new(
            config.oversampling as usize,
            config.temporal_buffer_size,
            Filter::cheby_design(8, 0.5, 0.9),
        );
        push_sine(&dec, 440.0, config.sample_rate_hw as f64, config.temporal_buffer_size * 2);
        let estimator = Estimator::new(config);

        group.bench_with_input(BenchmarkId::from_parameter(fft_size), &fft_size, |b, _| {
            b.iter(|| estimator.tick(&dec, 440.0));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
