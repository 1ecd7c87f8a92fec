//! Direct-Form-II transposed IIR filter and a Chebyshev type-I designer.
//!
//! Grounded on `lingot-filter.c`: `Filter::filter` mirrors
//! `lingot_filter_filter`'s recurrence exactly, and `Filter::cheby_design`
//! walks the same pole-placement / prewarp / bilinear-transform / polynomial
//! expansion steps as `lingot_filter_cheby_design`.

use crate::complex::{self, Complex};
use std::f64::consts::PI;

/// An IIR filter in Direct-Form-II transposed form, `N = max(Na, Nb)` states.
#[derive(Debug, Clone)]
pub struct Filter {
    a: Vec<f64>,
    b: Vec<f64>,
    s: Vec<f64>,
}

impl Filter {
    /// Builds a filter from numerator/denominator coefficients, normalizing
    /// so that `a[0] == 1`. `a` and `b` need not have the same length; the
    /// shorter one is implicitly zero-padded.
    pub fn new(a: &[f64], b: &[f64]) -> Self {
        let n = a.len().max(b.len()) - 1;
        let mut aa = vec![0.0; n + 1];
        let mut bb = vec![0.0; n + 1];
        aa[..a.len()].copy_from_slice(a);
        bb[..b.len()].copy_from_slice(b);
        let a0 = aa[0];
        for c in aa.iter_mut().chain(bb.iter_mut()) {
            *c /= a0;
        }
        Filter { a: aa, b: bb, s: vec![0.0; n + 1] }
    }

    /// Number of internal state registers.
    pub fn order(&self) -> usize {
        self.s.len() - 1
    }

    /// Zeros the filter state, leaving coefficients untouched.
    pub fn reset(&mut self) {
        self.s.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Filters `input` into `output`, in place if they're the same slice.
    pub fn filter(&mut self, input: &[f64], output: &mut [f64]) {
        let n = self.order();
        for i in 0..input.len() {
            let mut w = input[i];
            let mut y = 0.0;
            for j in (0..n).rev() {
                w -= self.a[j + 1] * self.s[j];
                y += self.b[j + 1] * self.s[j];
                self.s[j + 1] = self.s[j];
            }
            y += w * self.b[0];
            self.s[0] = w;
            output[i] = y;
        }
    }

    /// Filters a single sample.
    pub fn filter_sample(&mut self, input: f64) -> f64 {
        let mut out = [0.0; 1];
        self.filter(&[input], &mut out);
        out[0]
    }

    /// Designs an order-`n` Chebyshev type-I low-pass with pass-band ripple
    /// `ripple_db` and normalized cutoff `wc` in `(0, 1)` (1.0 == Nyquist).
    pub fn cheby_design(n: usize, ripple_db: f64, wc: f64) -> Filter {
        const T: f64 = 2.0;
        let w = 2.0 / T * (PI * wc / T).tan();

        let epsilon = (10f64.powf(0.1 * ripple_db) - 1.0).sqrt();
        let v0 = (1.0 / epsilon).asinh() / n as f64;
        let sv0 = v0.sinh();
        let cv0 = v0.cosh();

        let mut pole: Vec<Complex> = Vec::with_capacity(n);
        let mut i = -(n as isize - 1);
        while pole.len() < n {
            let theta = PI * i as f64 / (2.0 * n as f64);
            pole.push((-sv0 * theta.cos(), cv0 * theta.sin()));
            i += 2;
        }

        let mut gain = complex::product_of_negated(&pole);
        if n % 2 == 0 {
            let f = 10f64.powf(-0.05 * ripple_db);
            gain = (gain.0 * f, gain.1 * f);
        }
        let f = w.powi(n as i32);
        gain = (gain.0 * f, gain.1 * f);

        for p in pole.iter_mut() {
            p.0 *= w;
            p.1 *= w;
        }

        // Bilinear transform.
        let sp: Vec<Complex> = pole.iter().map(|p| ((2.0 - p.0 * T) / T, (0.0 - p.1 * T) / T)).collect();
        let tmp1 = complex::product_of_negated(&sp);
        complex::div_by(&mut gain, tmp1);

        for p in pole.iter_mut() {
            let num = (2.0 + p.0 * T, p.1 * T);
            let den = (2.0 - p.0 * T, -p.1 * T);
            *p = complex::div(num, den);
        }

        // Expand the pole set into real biquad coefficients, conjugate
        // pair by conjugate pair, with a first-order leftover if n is odd.
        let mut a = vec![0.0; n + 1];
        let mut b = vec![0.0; n + 1];
        a[0] = 1.0;
        b[0] = 1.0;

        if n % 2 == 1 {
            a[1] = -pole[n / 2].0;
            b[1] = 1.0;
        }

        for p in 0..n / 2 {
            let b1 = 2.0;
            let b2 = 1.0;
            let a1 = -2.0 * pole[p].0;
            let a2 = pole[p].0 * pole[p].0 + pole[p].1 * pole[p].1;

            let mut new_a = vec![0.0; n + 1];
            let mut new_b = vec![0.0; n + 1];
            new_a[0] = 1.0;
            new_b[0] = 1.0;
            new_a[1] = a[1] + a1 * a[0];
            new_b[1] = b[1] + b1 * b[0];
            for i in 2..=n {
                new_a[i] = a[i] + a1 * a[i - 1] + a2 * a[i - 2];
                new_b[i] = b[i] + b1 * b[i - 1] + b2 * b[i - 2];
            }
            a = new_a;
            b = new_b;
        }

        let gain_mag = gain.0.abs();
        for v in b.iter_mut() {
            *v *= gain_mag;
        }

        Filter::new(&a, &b)
    }
}
