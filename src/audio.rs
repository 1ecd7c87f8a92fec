//! The `AudioSource` contract (spec.md §6): deliberately out of scope for
//! this crate's implementation — capture backends (ALSA/JACK/PulseAudio/
//! OSS) are external collaborators specified only by the interface they
//! present to `Core`.

use crate::error::TunerError;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// What `AudioSource::open` reports back once the device is actually
/// opened; the requested rate and the device's real rate can differ.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioStreamInfo {
    pub real_sample_rate: u32,
    pub buffer_size_samples: usize,
    pub bytes_per_sample: usize,
}

/// A callback invoked once per audio buffer with mono samples in `[-1, 1]`.
pub type ReadCallback = Box<dyn FnMut(&[f32]) + Send>;

/// Implemented by an audio capture backend. `Core` never talks to a
/// specific backend directly — only through this trait.
pub trait AudioSource: Send {
    /// Opens `device` as close to `desired_rate` as the backend allows.
    fn open(&mut self, device: &str, desired_rate: u32) -> Result<AudioStreamInfo, TunerError>;

    /// Registers the buffer callback and the flag the backend must set
    /// when the underlying server shuts down mid-stream (spec.md's
    /// `shutdown_event`).
    fn start(&mut self, callback: ReadCallback, interrupted: Arc<AtomicBool>) -> Result<(), TunerError>;

    fn stop(&mut self);

    fn close(&mut self);
}
