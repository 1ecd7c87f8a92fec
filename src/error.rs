//! Error types for the tuner crate.

/// Errors surfaced by configuration/scale parsing and by `Core::start`.
/// The DSP path itself (C1-C7) never returns `Result`: numeric edge cases
/// resolve to `f_raw = 0.0` internally, per spec.md §7.
#[derive(Debug, Clone, PartialEq)]
pub enum TunerError {
    /// Malformed config file or an out-of-range value; the caller is
    /// expected to log a warning and substitute a default rather than
    /// abort, except when `Config::new`/`Config::validate` calls this
    /// constructor directly to reject an invalid snapshot outright.
    Config { line: Option<usize>, message: String },
    /// The audio device could not be opened (unavailable or in use).
    AudioOpen(String),
    /// The audio server shut down mid-stream.
    AudioRuntime(String),
    /// An invalid scale definition (non-monotonic notes, first note not
    /// at 0 cents, ...).
    Scale { line: usize, message: String },
    /// Allocation failure at construction time.
    ResourceExhausted,
}

impl TunerError {
    pub fn config(line: Option<usize>, message: impl Into<String>) -> Self {
        TunerError::Config { line, message: message.into() }
    }

    pub fn scale(line: usize, message: impl Into<String>) -> Self {
        TunerError::Scale { line, message: message.into() }
    }
}

impl std::fmt::Display for TunerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TunerError::Config { line: Some(line), message } => {
                write!(f, "config error at line {line}: {message}")
            }
            TunerError::Config { line: None, message } => {
                write!(f, "config error: {message}")
            }
            TunerError::AudioOpen(message) => write!(f, "could not open audio device: {message}"),
            TunerError::AudioRuntime(message) => write!(f, "audio runtime error: {message}"),
            TunerError::Scale { line, message } => {
                write!(f, "invalid scale at line {line}: {message}")
            }
            TunerError::ResourceExhausted => write!(f, "resource exhausted"),
        }
    }
}

impl std::error::Error for TunerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_without_line_has_no_line_marker() {
        let err = TunerError::config(None, "bad value");
        assert_eq!(err.to_string(), "config error: bad value");
    }

    #[test]
    fn config_error_with_line_reports_it() {
        let err = TunerError::config(Some(12), "bad value");
        assert_eq!(err.to_string(), "config error at line 12: bad value");
    }
}
