//! Per-tick pitch estimation pipeline (C6): snapshot -> spectrum -> SPL ->
//! denoise -> candidate -> two-pass Newton-Raphson refinement.
//!
//! Grounded on `lingot-core.c`'s `lingot_core_compute_fundamental_fequency`,
//! which this module follows step for step, including the early-abort
//! conditions on non-improving Newton-Raphson steps. Both windowed buffers
//! are taken from the decimator in a single `snapshot_tick` call so the two
//! refinement passes see the same ring state (`lingot-core.c:553-635` holds
//! `temporal_buffer_mutex` across both copies for the same reason).

use crate::config::Config;
use crate::decimator::Decimator;
use crate::fft;
use crate::signal::{self, WindowType};
use std::f64::consts::PI;

const MIN_SPL_DB: f64 = -200.0;
const NOISE_FILTER_WIDTH_HZ: f64 = 150.0;
const NEWTON_CONVERGENCE: f64 = 1.0e-4;

/// Owns the scratch buffers and precomputed windows for one running
/// tuner; `tick` is called once per `1/calculation_rate` seconds by the
/// compute thread.
pub struct Estimator {
    config: Config,
    window_fft: Vec<f64>,
    window_temporal: Vec<f64>,
    lowest_index: usize,
    highest_index: usize,
    noise_half_width: usize,
}

/// Result of one tick: the raw (pre-locker) frequency estimate, the
/// divisor applied to recover it, and the published spectrum.
pub struct Tick {
    pub raw_frequency: f64,
    pub spl: Vec<f64>,
}

impl Estimator {
    pub fn new(config: Config) -> Self {
        let window_fft = signal::window(config.fft_size, config.window_type);
        let window_temporal = signal::window(config.temporal_buffer_size, config.window_type);

        let lowest_index = (config.internal_min_frequency
            * (config.oversampling as f64 / config.sample_rate_hw as f64)
            * config.fft_size as f64)
            .ceil() as usize;
        let highest_index = (0.95 * config.spd_size() as f64).ceil() as usize;

        let noise_half_width = (NOISE_FILTER_WIDTH_HZ * config.fft_size as f64
            * config.oversampling as f64
            / config.sample_rate_hw as f64)
            .ceil() as usize;

        Estimator {
            config,
            window_fft,
            window_temporal,
            lowest_index,
            highest_index,
            noise_half_width,
        }
    }

    /// Re-derives the index bounds and windows after a live config change,
    /// per the Open Question decision in `DESIGN.md` ("bounds consistency
    /// on `change_config`").
    pub fn set_config(&mut self, config: Config) {
        *self = Estimator::new(config);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs one full estimation tick against `decimator`'s current ring
    /// contents, biasing candidate selection toward `prev_f_hint` (the
    /// locker's own running estimate, per spec.md's design notes).
    pub fn tick(&self, decimator: &Decimator, prev_f_hint: f64) -> Tick {
        let conf = &self.config;
        let spd_size = conf.spd_size();
        let bin_hz = conf.bin_hz();

        let fft_window = (conf.window_type != WindowType::None).then_some(self.window_fft.as_slice());
        let temporal_window =
            (conf.window_type != WindowType::None).then_some(self.window_temporal.as_slice());

        let mut windowed_fft = vec![0.0; conf.fft_size];
        let mut windowed_temporal = vec![0.0; conf.temporal_buffer_size];
        decimator.snapshot_tick(fft_window, &mut windowed_fft, temporal_window, &mut windowed_temporal);

        let mut spd = vec![0.0; spd_size];
        fft::compute_dft_and_spd(&windowed_fft, &mut spd);

        let mut spl: Vec<f64> = spd.iter().map(|&p| (10.0 * p.log10()).max(MIN_SPL_DB)).collect();

        let noise = signal::noise_floor(&spl, self.noise_half_width);
        for i in 0..spd_size {
            spl[i] -= noise[i];
        }

        let selection = signal::select_fundamental(
            &spl,
            prev_f_hint,
            conf.peak_number,
            self.lowest_index,
            self.highest_index.min(spd_size.saturating_sub(1)),
            conf.peak_half_width,
            bin_hz,
            conf.min_snr,
            conf.min_overall_snr,
            conf.internal_min_frequency,
        );

        if selection.frequency == 0.0 {
            return Tick { raw_frequency: 0.0, spl };
        }

        let w0 = 2.0 * PI * selection.frequency * conf.oversampling as f64 / conf.sample_rate_hw as f64;

        let mut w = newton_refine(&windowed_fft, w0, conf.max_nr_iter, false);
        if w > 0.0 {
            w = newton_refine(&windowed_temporal, w, conf.max_nr_iter, true);
        }

        let raw_frequency = if w == 0.0 {
            0.0
        } else {
            w * conf.sample_rate_hw as f64 / (selection.divisor as f64 * 2.0 * PI * conf.oversampling as f64)
        };

        Tick { raw_frequency, spl }
    }
}

/// Maximizes the spectral power distribution near `w0` by Newton-Raphson
/// on its first and second derivatives. Returns 0.0 if the iteration fails
/// to improve or diverges to a non-positive frequency.
///
/// `min_two_iters` applies the "run at least two iterations" floor the
/// original only uses on the second refinement pass
/// (`lingot-core.c:678-681`); the first pass's loop
/// (`lingot-core.c:652`) has no such floor.
fn newton_refine(signal: &[f64], w0: f64, max_iter: u32, min_two_iters: bool) -> f64 {
    let mut wk = -1.0e5_f64;
    let mut wkm1 = w0;
    let mut d0_prev = 0.0;

    let mut k = 0;
    while ((min_two_iters && k <= 1) || k < max_iter) && (wk - wkm1).abs() > NEWTON_CONVERGENCE {
        wk = wkm1;
        let (d0, d1, d2) = fft::spd_diffs_eval(signal, wk);

        if d2 == 0.0 {
            return 0.0;
        }
        wkm1 = wk - d1 / d2;

        if d0 < d0_prev {
            return 0.0;
        }
        d0_prev = d0;
        k += 1;
    }

    if wkm1 > 0.0 {
        wkm1
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;

    fn push_sine(dec: &Decimator, freq: f64, sample_rate: f64, amplitude: f64, total: usize) {
        let mut phase = 0.0;
        let step = 2.0 * PI * freq / sample_rate;
        let chunk = 256;
        let mut written = 0;
        while written < total {
            let n = chunk.min(total - written);
            let samples: Vec<f64> = (0..n)
                .map(|i| {
                    let v = amplitude * (phase + step * i as f64).sin();
                    v
                })
                .collect();
            phase += step * n as f64;
            dec.push(&samples);
            written += n;
        }
    }

    #[test]
    fn pure_tone_converges_near_true_frequency() {
        let config = Config {
            sample_rate_hw: 44100,
            oversampling: 1,
            fft_size: 1024,
            temporal_buffer_size: 2048,
            window_type: WindowType::Hamming,
            min_snr: 5.0,
            min_overall_snr: 5.0,
            ..Config::default()
        };
        let dec = Decimator::new(
            config.oversampling as usize,
            config.temporal_buffer_size,
            Filter::cheby_design(8, 0.5, 0.9),
        );
        push_sine(&dec, 440.0, config.sample_rate_hw as f64, 0.5, config.temporal_buffer_size * 2);

        let estimator = Estimator::new(config);
        let tick = estimator.tick(&dec, 0.0);
        assert!(tick.raw_frequency > 0.0, "expected a pitch, got silence");
        assert!((tick.raw_frequency - 440.0).abs() < 2.0, "got {}", tick.raw_frequency);
    }

    #[test]
    fn silence_yields_zero() {
        let config = Config::default();
        let dec = Decimator::new(
            config.oversampling as usize,
            config.temporal_buffer_size,
            Filter::cheby_design(8, 0.5, 0.9),
        );
        let estimator = Estimator::new(config);
        let tick = estimator.tick(&dec, 0.0);
        assert_eq!(tick.raw_frequency, 0.0);
    }

    #[test]
    fn spl_is_length_fft_size_over_two() {
        let config = Config::default();
        let dec = Decimator::new(
            config.oversampling as usize,
            config.temporal_buffer_size,
            Filter::cheby_design(8, 0.5, 0.9),
        );
        let estimator = Estimator::new(config);
        let tick = estimator.tick(&dec, 0.0);
        assert_eq!(tick.spl.len(), config.spd_size());
    }
}
