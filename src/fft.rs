//! Real-input DFT (dispatched through `microfft`) and direct-sum
//! point-evaluation of the spectral power distribution and its first two
//! derivatives at arbitrary angular frequency (C4).
//!
//! `compute_dft_and_spd` generalizes the teacher's `FftOps<N, HALF_N>`
//! dispatch (`src/fft/mod.rs` in `nathansbradshaw-synthphone_vocals`,
//! originally {512,1024,2048,4096}) to the five sizes this crate's
//! `Config::fft_size` supports, adding 256. `spd_eval`/`spd_diffs_eval` have
//! no FFT-library equivalent (no closed-form derivative support exists in
//! any FFT crate) and are implemented as the direct sums `lingot-fft.h`
//! declares (`lingot_fft_spd_eval`/`lingot_fft_spd_diffs_eval`), per
//! spec.md §4.4.

use crate::complex::{self, Complex};
use std::f64::consts::PI;

/// Runs the real-to-complex FFT on `samples` and writes `|X[k]|^2` for
/// `k in [0, samples.len()/2)` into `spd_out`.
///
/// # Panics
/// Panics if `samples.len()` is not one of the five supported FFT sizes, or
/// if `spd_out.len() != samples.len() / 2`. `Config` validates `fft_size`
/// at construction time, so this is never reachable on the per-tick path.
pub fn compute_dft_and_spd(samples: &[f64], spd_out: &mut [f64]) {
    let n = samples.len();
    assert_eq!(spd_out.len(), n / 2, "spd_out must be half the FFT size");

    let mut buf: Vec<f32> = samples.iter().map(|&v| v as f32).collect();
    let bins: &[microfft::Complex32] = match n {
        256 => microfft::real::rfft_256(buf.as_mut_slice().try_into().unwrap()),
        512 => microfft::real::rfft_512(buf.as_mut_slice().try_into().unwrap()),
        1024 => microfft::real::rfft_1024(buf.as_mut_slice().try_into().unwrap()),
        2048 => microfft::real::rfft_2048(buf.as_mut_slice().try_into().unwrap()),
        4096 => microfft::real::rfft_4096(buf.as_mut_slice().try_into().unwrap()),
        other => panic!("unsupported FFT size {other}"),
    };

    // microfft packs the real FFT output into N/2 complex bins: bin 0's
    // real part is the DC term and its imaginary part is the Nyquist term.
    spd_out[0] = (bins[0].re as f64).powi(2);
    for k in 1..bins.len() {
        let re = bins[k].re as f64;
        let im = bins[k].im as f64;
        spd_out[k] = re * re + im * im;
    }
}

/// `X(w) = sum_n x[n] * e^{-j*w*n}`, plus the first two `n`-weighted sums
/// used to build its derivatives.
fn weighted_dft(x: &[f64], w: f64) -> (Complex, Complex, Complex) {
    let mut s0: Complex = (0.0, 0.0);
    let mut s1: Complex = (0.0, 0.0);
    let mut s2: Complex = (0.0, 0.0);
    for (n, &xn) in x.iter().enumerate() {
        let phase = -w * n as f64;
        let e = (phase.cos(), phase.sin());
        let term = (xn * e.0, xn * e.1);
        s0 = complex::add(s0, term);
        let n1 = n as f64 * xn;
        s1 = complex::add(s1, (n1 * e.0, n1 * e.1));
        let n2 = (n * n) as f64 * xn;
        s2 = complex::add(s2, (n2 * e.0, n2 * e.1));
    }
    (s0, s1, s2)
}

/// Evaluates `|X(w)|^2` at `n2` angular frequencies starting at `w_i` with
/// step `dw`, via the direct sum (no FFT). Used for high-resolution local
/// re-sampling away from bin centers.
pub fn spd_eval(x: &[f64], w_i: f64, dw: f64, n2: usize) -> Vec<f64> {
    (0..n2)
        .map(|j| {
            let w = w_i + dw * j as f64;
            let (s0, _, _) = weighted_dft(x, w);
            s0.0 * s0.0 + s0.1 * s0.1
        })
        .collect()
}

/// Returns `(d0, d1, d2) = (|X(w)|^2, d/dw |X(w)|^2, d^2/dw^2 |X(w)|^2)`,
/// the quantities the Newton-Raphson refinement in `estimator.rs` walks
/// toward a local maximum of the spectral power distribution.
pub fn spd_diffs_eval(x: &[f64], w: f64) -> (f64, f64, f64) {
    let (s0, s1, s2) = weighted_dft(x, w);

    // dX/dw = -j*S1, d2X/dw2 = -S2 (see module derivation notes above).
    let dx = (s1.1, -s1.0);
    let d2x = (-s2.0, -s2.1);

    let d0 = s0.0 * s0.0 + s0.1 * s0.1;

    // d1 = 2 * Re(conj(X) * dX/dw)
    let conj_x = (s0.0, -s0.1);
    let d1 = 2.0 * complex::mul(conj_x, dx).0;

    // d2 = 2*(|dX/dw|^2 + Re(conj(X) * d2X/dw2))
    let dx_mag2 = dx.0 * dx.0 + dx.1 * dx.1;
    let d2 = 2.0 * (dx_mag2 + complex::mul(conj_x, d2x).0);

    (d0, d1, d2)
}

/// Frequencies supported by `Config::fft_size`.
pub const SUPPORTED_SIZES: [usize; 5] = [256, 512, 1024, 2048, 4096];

pub fn is_supported_fft_size(n: usize) -> bool {
    SUPPORTED_SIZES.contains(&n)
}
