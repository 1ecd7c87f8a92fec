//! Config file parser/writer (spec.md §6's file format).
//!
//! Grounded line-for-line on `lingot-io-config.c`'s `lingot_io_config_load`
//! (`KEY = VALUE` tokens, a `SCALE { ... }` block) and `_save` (the writer
//! loop). Deprecated keys are recognized, warned about, and dropped rather
//! than rejected, exactly as the original's `parameters[].deprecated` flag
//! does.

use crate::config::Config;
use crate::error::TunerError;
use crate::scale::{self, Note, Scale};
use crate::signal::WindowType;
use log::warn;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

const DEPRECATED_KEYS: &[&str] = &[
    "GAIN",
    "PEAK_ORDER",
    "MIN_FREQUENCY",
    "SAMPLE_RATE",
    "OVERSAMPLING",
    "PEAK_NUMBER",
    "PEAK_HALF_WIDTH",
    "PEAK_REJECTION_RELATION",
    "DFT_NUMBER",
    "DFT_SIZE",
    "NOISE_THRESHOLD",
    "AUDIO_DEV",
    "AUDIO_DEV_ALSA",
    "AUDIO_DEV_JACK",
    "AUDIO_DEV_PULSEAUDIO",
];

/// Loads a `(Config, Scale)` pair from `path`. Missing keys keep their
/// `Config::default()` value; out-of-range or malformed values fall back
/// to the default and log a warning rather than aborting, matching
/// `lingot_io_config_load`'s "assume default values" behavior. A missing
/// or unreadable file yields the all-defaults config with the 440 Hz
/// equal-tempered scale.
pub fn load(path: &Path) -> Result<(Config, Scale), TunerError> {
    let mut config = Config::default();
    let mut scale = Scale::equal_temperament_440();

    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(err) => {
            warn!("error opening config file {}, assuming default values ({err})", path.display());
            return Ok((config, scale));
        }
    };

    let mut lines = BufReader::new(file).lines();
    let mut line_no = 0;
    let mut parsed_scale: Option<Scale> = None;

    while let Some(line) = lines.next() {
        line_no += 1;
        let line = line.map_err(|e| TunerError::config(Some(line_no), e.to_string()))?;
        let mut tokens = line.split_whitespace().filter(|t| *t != "=");
        let Some(key) = tokens.next() else { continue };
        if key.starts_with('#') {
            continue;
        }

        if key == "SCALE" {
            let (read, new_line_no) = parse_scale_block(&mut lines, line_no)?;
            parsed_scale = Some(read);
            line_no = new_line_no;
            continue;
        }

        if DEPRECATED_KEYS.contains(&key) || key.starts_with("AUDIO_DEV.") {
            warn!("warning: line {line_no}, deprecated option '{key}'");
            continue;
        }

        let Some(value) = tokens.next() else {
            warn!("warning: line {line_no}, '{key}': value expected, assuming default");
            continue;
        };

        apply_key(&mut config, key, value, line_no);
    }

    if let Some(s) = parsed_scale {
        if s.validate().is_ok() {
            scale = s;
        } else {
            warn!("warning: the scale in the configuration file is invalid, using default");
        }
    }

    config.validate()?;
    Ok((config, scale))
}

fn apply_key(config: &mut Config, key: &str, value: &str, line_no: usize) {
    match key {
        "MIN_SNR" => set_float(&mut config.min_overall_snr, value, 0.0, 40.0, key, line_no),
        "FFT_SIZE" => {
            if let Ok(n) = value.parse::<usize>() {
                if crate::fft::is_supported_fft_size(n) {
                    config.fft_size = n;
                } else {
                    warn!("warning: line {line_no}, FFT_SIZE = {value}: must be one of {:?}", crate::fft::SUPPORTED_SIZES);
                }
            }
        }
        "TEMPORAL_WINDOW" => {
            if let Ok(seconds) = value.parse::<f64>() {
                if (0.0..=15.0).contains(&seconds) {
                    config.temporal_buffer_size =
                        (seconds * config.sample_rate_hw as f64 / config.oversampling as f64) as usize;
                } else {
                    warn!("warning: line {line_no}, TEMPORAL_WINDOW = {value}: out of bounds");
                }
            }
        }
        "CALCULATION_RATE" => set_float(&mut config.calculation_rate, value, 1.0, 30.0, key, line_no),
        "MINIMUM_FREQUENCY" => {
            set_float(&mut config.internal_min_frequency, value, 0.0, 22050.0, key, line_no)
        }
        "MAXIMUM_FREQUENCY" => {
            set_float(&mut config.internal_max_frequency, value, 0.0, 22050.0, key, line_no)
        }
        "WINDOW_TYPE" => {
            config.window_type = match value {
                "NONE" => WindowType::None,
                "HANNING" => WindowType::Hanning,
                "HAMMING" => WindowType::Hamming,
                _ => {
                    warn!("warning: line {line_no}, WINDOW_TYPE = {value}: unrecognized");
                    config.window_type
                }
            };
        }
        "ROOT_FREQUENCY_ERROR" | "VISUALIZATION_RATE" | "AUDIO_SYSTEM" => {
            // Recognized by the original format but outside this crate's
            // scope (GUI/audio-backend concerns); accepted and ignored.
        }
        other => warn!("warning: parse error at line {line_no}: unknown keyword '{other}'"),
    }
}

fn set_float(field: &mut f64, value: &str, min: f64, max: f64, key: &str, line_no: usize) {
    match value.parse::<f64>() {
        Ok(v) if (min..=max).contains(&v) => *field = v,
        _ => warn!("warning: line {line_no}, {key} = {value}: out of bounds (minimum {min}, maximum {max})"),
    }
}

fn parse_scale_block(
    lines: &mut std::io::Lines<BufReader<std::fs::File>>,
    mut line_no: usize,
) -> Result<(Scale, usize), TunerError> {
    let mut name = String::new();
    let mut base_frequency = 440.0;
    let mut note_count = 0usize;
    let mut notes = Vec::new();

    loop {
        let Some(line) = lines.next() else { break };
        line_no += 1;
        let line = line.map_err(|e| TunerError::config(Some(line_no), e.to_string()))?;
        let trimmed = line.trim();

        if trimmed == "}" {
            break;
        }
        if let Some(rest) = trimmed.strip_prefix("NAME") {
            name = rest.trim_start_matches(['=', ' ', '\t']).trim().to_string();
        } else if let Some(rest) = trimmed.strip_prefix("BASE_FREQUENCY") {
            if let Ok(v) = rest.trim_start_matches(['=', ' ', '\t']).trim().parse() {
                base_frequency = v;
            }
        } else if let Some(rest) = trimmed.strip_prefix("NOTE_COUNT") {
            note_count = rest.trim_start_matches(['=', ' ', '\t']).trim().parse().unwrap_or(0);
        } else if trimmed == "NOTES" || trimmed == "NOTES = {" {
            for _ in 0..note_count {
                let Some(note_line) = lines.next() else { break };
                line_no += 1;
                let note_line = note_line.map_err(|e| TunerError::config(Some(line_no), e.to_string()))?;
                let mut parts = note_line.split_whitespace();
                let Some(note_name) = parts.next() else {
                    return Err(TunerError::scale(line_no, "error reading the scale"));
                };
                let Some(shift_field) = parts.next() else {
                    return Err(TunerError::scale(line_no, "error reading the scale"));
                };
                let offset_cents = scale::parse_shift(shift_field)
                    .ok_or_else(|| TunerError::scale(line_no, "malformed note shift"))?;
                notes.push(Note { name: note_name.to_string(), offset_cents });
            }
            line_no += 1;
            lines.next();
        }
    }

    Ok((Scale { name, base_frequency, notes }, line_no))
}

/// Writes `config`/`scale` back out in the original's key ordering.
/// Deprecated keys are never written, matching `lingot_io_config_save`
/// skipping any parameter spec marked `deprecated`.
pub fn save(path: &Path, config: &Config, scale: &Scale) -> Result<(), TunerError> {
    let mut out = std::fs::File::create(path)
        .map_err(|e| TunerError::config(None, format!("error opening {}: {e}", path.display())))?;

    let window_type = match config.window_type {
        WindowType::None => "NONE",
        WindowType::Hanning => "HANNING",
        WindowType::Hamming => "HAMMING",
    };
    let temporal_window_seconds =
        config.temporal_buffer_size as f64 * config.oversampling as f64 / config.sample_rate_hw as f64;

    writeln!(out, "MIN_SNR = {}", config.min_overall_snr)
        .and_then(|_| writeln!(out, "FFT_SIZE = {}", config.fft_size))
        .and_then(|_| writeln!(out, "TEMPORAL_WINDOW = {temporal_window_seconds}"))
        .and_then(|_| writeln!(out, "CALCULATION_RATE = {}", config.calculation_rate))
        .and_then(|_| writeln!(out, "MINIMUM_FREQUENCY = {}", config.internal_min_frequency))
        .and_then(|_| writeln!(out, "MAXIMUM_FREQUENCY = {}", config.internal_max_frequency))
        .and_then(|_| writeln!(out, "WINDOW_TYPE = {window_type}"))
        .map_err(|e| TunerError::config(None, e.to_string()))?;

    writeln!(out, "\nSCALE = {{").map_err(|e| TunerError::config(None, e.to_string()))?;
    writeln!(out, "NAME = {}", scale.name).map_err(|e| TunerError::config(None, e.to_string()))?;
    writeln!(out, "BASE_FREQUENCY = {}", scale.base_frequency)
        .map_err(|e| TunerError::config(None, e.to_string()))?;
    writeln!(out, "NOTE_COUNT = {}", scale.notes.len())
        .map_err(|e| TunerError::config(None, e.to_string()))?;
    writeln!(out, "NOTES = {{").map_err(|e| TunerError::config(None, e.to_string()))?;
    for note in &scale.notes {
        writeln!(out, "{}\t{}", note.name, scale::format_shift(note.offset_cents))
            .map_err(|e| TunerError::config(None, e.to_string()))?;
    }
    writeln!(out, "}}\n}}").map_err(|e| TunerError::config(None, e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let path = Path::new("/nonexistent/path/does-not-exist.conf");
        let (config, scale) = load(path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(scale, Scale::equal_temperament_440());
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = std::env::temp_dir().join(format!("tuner-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("roundtrip.conf");

        let config = Config { fft_size: 2048, min_overall_snr: 12.0, ..Config::default() };
        let scale = Scale::equal_temperament_440();
        save(&path, &config, &scale).unwrap();

        let (loaded_config, loaded_scale) = load(&path).unwrap();
        assert_eq!(loaded_config.fft_size, 2048);
        assert_eq!(loaded_config.min_overall_snr, 12.0);
        assert_eq!(loaded_scale.name, scale.name);
        assert_eq!(loaded_scale.notes.len(), scale.notes.len());

        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(&dir).ok();
    }

    #[test]
    fn deprecated_keys_are_ignored_not_rejected() {
        let dir = std::env::temp_dir().join(format!("tuner-config-test-dep-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("deprecated.conf");
        std::fs::write(&path, "SAMPLE_RATE = 48000\nOVERSAMPLING = 4\nMIN_SNR = 8.0\n").unwrap();

        let (config, _scale) = load(&path).unwrap();
        assert_eq!(config.min_overall_snr, 8.0);
        assert_eq!(config.sample_rate_hw, Config::default().sample_rate_hw);
        assert_eq!(config.oversampling, Config::default().oversampling);

        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(&dir).ok();
    }

    #[test]
    fn out_of_range_value_falls_back_to_default() {
        let dir = std::env::temp_dir().join(format!("tuner-config-test-oob-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("oob.conf");
        std::fs::write(&path, "CALCULATION_RATE = 999\n").unwrap();

        let (config, _scale) = load(&path).unwrap();
        assert_eq!(config.calculation_rate, Config::default().calculation_rate);

        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(&dir).ok();
    }
}
