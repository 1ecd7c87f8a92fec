//! The `Config` value object (spec.md §3) handed to `Core` at construction.
//!
//! Grounded on `lingot-io-config.c`'s parameter table (field names follow
//! its recognized keys) and on the teacher's `config.rs`
//! (`AutotuneConfig::new` validation style, `Default` impl).

use crate::error::TunerError;
use crate::fft;
use crate::signal::WindowType;

/// Immutable configuration snapshot; `Core::new` and `Core::set_config`
/// take it by value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub sample_rate_hw: u32,
    pub oversampling: u32,
    pub fft_size: usize,
    pub temporal_buffer_size: usize,
    pub window_type: WindowType,
    pub calculation_rate: f64,
    pub internal_min_frequency: f64,
    pub internal_max_frequency: f64,
    pub peak_number: usize,
    pub peak_half_width: usize,
    pub min_snr: f64,
    pub min_overall_snr: f64,
    pub max_nr_iter: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sample_rate_hw: 44100,
            oversampling: 1,
            fft_size: 1024,
            temporal_buffer_size: 2048,
            window_type: WindowType::Hamming,
            calculation_rate: 20.0,
            internal_min_frequency: 20.0,
            internal_max_frequency: 2000.0,
            peak_number: 5,
            peak_half_width: 2,
            min_snr: 10.0,
            min_overall_snr: 10.0,
            max_nr_iter: 25,
        }
    }
}

impl Config {
    /// Validates every field, matching the range checks
    /// `lingot-io-config.c` attaches to each parameter spec
    /// (`MIN_SNR` 0-40dB, `FFT_SIZE` in {256,...,4096}, `CALCULATION_RATE`
    /// 1-30Hz, ...).
    pub fn new(
        sample_rate_hw: u32,
        oversampling: u32,
        fft_size: usize,
        temporal_buffer_size: usize,
        window_type: WindowType,
        calculation_rate: f64,
        internal_min_frequency: f64,
        internal_max_frequency: f64,
    ) -> Result<Self, TunerError> {
        let mut config = Config {
            sample_rate_hw,
            oversampling,
            fft_size,
            temporal_buffer_size,
            window_type,
            calculation_rate,
            internal_min_frequency,
            internal_max_frequency,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&mut self) -> Result<(), TunerError> {
        if self.sample_rate_hw < 100 {
            return Err(TunerError::config(None, "sample_rate_hw must be >= 100 Hz"));
        }
        if self.oversampling < 1 {
            return Err(TunerError::config(None, "oversampling must be >= 1"));
        }
        if !fft::is_supported_fft_size(self.fft_size) {
            return Err(TunerError::config(
                None,
                format!("fft_size {} is not one of {:?}", self.fft_size, fft::SUPPORTED_SIZES),
            ));
        }
        if self.temporal_buffer_size < self.fft_size {
            self.temporal_buffer_size = self.fft_size;
        }
        if !(1.0..=30.0).contains(&self.calculation_rate) {
            return Err(TunerError::config(None, "calculation_rate must be within 1-30 Hz"));
        }
        if self.internal_min_frequency < 0.0 || self.internal_max_frequency <= self.internal_min_frequency
        {
            return Err(TunerError::config(
                None,
                "internal_min_frequency must be < internal_max_frequency",
            ));
        }
        if !(1..=10).contains(&self.peak_number) {
            return Err(TunerError::config(None, "peak_number must be within 1-10"));
        }
        if !(1..=5).contains(&self.peak_half_width) {
            return Err(TunerError::config(None, "peak_half_width must be within 1-5"));
        }
        Ok(())
    }

    /// FFT bin resolution in Hz at the internal (post-decimation) rate.
    pub fn bin_hz(&self) -> f64 {
        self.sample_rate_hw as f64 / (self.oversampling as f64 * self.fft_size as f64)
    }

    pub fn spd_size(&self) -> usize {
        self.fft_size / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unsupported_fft_size() {
        let mut config = Config { fft_size: 777, ..Config::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn grows_temporal_buffer_to_at_least_fft_size() {
        let mut config = Config { fft_size: 2048, temporal_buffer_size: 512, ..Config::default() };
        config.validate().unwrap();
        assert_eq!(config.temporal_buffer_size, 2048);
    }

    #[test]
    fn rejects_out_of_range_calculation_rate() {
        let mut config = Config { calculation_rate: 0.5, ..Config::default() };
        assert!(config.validate().is_err());
    }
}
