//! Lifecycle and threading orchestrator (C8).
//!
//! Grounded on `lingot-core.c`'s `lingot_core_new`/`_start`/`_stop`/
//! `_destroy` and `lingot_core_run_computation_thread`, generalized from
//! pthread mutex/cond/thread to `std::sync::{Mutex, Condvar}` +
//! `std::thread::spawn`, per spec.md §5. The 300ms watchdog on `stop()`
//! mirrors the original's `pthread_cond_timedwait` deadline; Rust threads
//! can't be detached the way `pthread_cancel` implies, so instead of
//! abandoning the join we wait on a dedicated "finished" condition and log
//! a warning if it doesn't fire in time, the same way the original logged
//! `"warning: cancelling computation thread"` to stderr.

use crate::audio::AudioSource;
use crate::config::Config;
use crate::consumer::Consumer;
use crate::error::TunerError;
use crate::estimator::Estimator;
use crate::filter::Filter;
use crate::locker::FrequencyLocker;
use crate::decimator::Decimator;
use log::{debug, trace, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

struct CoreState {
    config: Config,
    estimator: Estimator,
}

struct ThreadSignal {
    mutex: Mutex<SignalState>,
    cond: Condvar,
}

struct SignalState {
    running: bool,
    finished: bool,
}

/// The running tuner. Owns the decimator, estimator, locker and the
/// compute thread; implements `Consumer` for its own published state.
pub struct Core {
    state: Mutex<CoreState>,
    decimator: Arc<Decimator>,
    locker: Mutex<FrequencyLocker>,
    last_frequency: Mutex<f64>,
    spl: Mutex<Vec<f32>>,
    running: Arc<AtomicBool>,
    interrupted: Arc<AtomicBool>,
    audio: Mutex<Box<dyn AudioSource>>,
    signal: Arc<ThreadSignal>,
    compute_thread: Mutex<Option<JoinHandle<()>>>,
}

const STOP_WATCHDOG: Duration = Duration::from_millis(300);

/// `n=8, Rp=0.5dB` Chebyshev-I anti-alias low-pass, `wc = 0.9/oversampling`
/// — the 10% safety margin below Nyquist the original comments attribute
/// to non-ideal filter rolloff near `w = pi`.
fn antialiasing_filter(oversampling: u32) -> Filter {
    Filter::cheby_design(8, 0.5, 0.9 / oversampling as f64)
}

impl Core {
    /// Allocates the ring, estimator windows, anti-alias filter and locker
    /// state. Does not touch the audio device; call `start` for that.
    pub fn new(mut config: Config, audio: Box<dyn AudioSource>) -> Result<Self, TunerError> {
        config.validate()?;
        let decimator = Arc::new(Decimator::new(
            config.oversampling as usize,
            config.temporal_buffer_size,
            antialiasing_filter(config.oversampling),
        ));
        let estimator = Estimator::new(config);

        Ok(Core {
            state: Mutex::new(CoreState { config, estimator }),
            decimator,
            locker: Mutex::new(FrequencyLocker::new()),
            last_frequency: Mutex::new(0.0),
            spl: Mutex::new(vec![0.0; config.spd_size()]),
            running: Arc::new(AtomicBool::new(false)),
            interrupted: Arc::new(AtomicBool::new(false)),
            audio: Mutex::new(audio),
            signal: Arc::new(ThreadSignal {
                mutex: Mutex::new(SignalState { running: false, finished: true }),
                cond: Condvar::new(),
            }),
            compute_thread: Mutex::new(None),
        })
    }

    /// Opens `device`, spawns the compute thread, and transitions to
    /// Running. On audio-open failure the core stays Idle and the error
    /// is returned for the caller to surface via its message queue.
    pub fn start(self: &Arc<Self>, device: &str) -> Result<(), TunerError> {
        let sample_rate_hw = self.state.lock().unwrap().config.sample_rate_hw;

        let info = {
            let mut audio = self.audio.lock().unwrap();
            audio.open(device, sample_rate_hw)?
        };
        if info.real_sample_rate != sample_rate_hw {
            warn!(
                "requested sample rate {} Hz unavailable, device runs at {} Hz",
                sample_rate_hw, info.real_sample_rate
            );
        }

        let decimator = self.decimator.clone();
        let callback: crate::audio::ReadCallback = Box::new(move |samples: &[f32]| {
            let input: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
            decimator.push(&input);
        });

        {
            let mut audio = self.audio.lock().unwrap();
            audio.start(callback, self.interrupted.clone())?;
        }

        self.running.store(true, Ordering::SeqCst);
        {
            let mut signal = self.signal.mutex.lock().unwrap();
            signal.running = true;
            signal.finished = false;
        }

        let this = self.clone();
        let handle = std::thread::spawn(move || this.run_computation_thread());
        *self.compute_thread.lock().unwrap() = Some(handle);

        debug!("core started on device {device}");
        Ok(())
    }

    fn run_computation_thread(self: Arc<Self>) {
        loop {
            let calc_period = {
                let running = { self.signal.mutex.lock().unwrap().running };
                if !running {
                    break;
                }
                self.tick();
                Duration::from_secs_f64(1.0 / self.state.lock().unwrap().config.calculation_rate)
            };

            let mut signal = self.signal.mutex.lock().unwrap();
            let (guard, _timeout) = self
                .signal
                .cond
                .wait_timeout_while(signal, calc_period, |s| s.running)
                .unwrap();
            signal = guard;

            if self.interrupted.load(Ordering::SeqCst) {
                self.publish(0.0, None);
                signal.running = false;
                self.running.store(false, Ordering::SeqCst);
            }

            if !signal.running {
                break;
            }
        }

        let mut signal = self.signal.mutex.lock().unwrap();
        signal.finished = true;
        self.signal.cond.notify_all();
    }

    fn tick(&self) {
        let (raw_frequency, spl, min_frequency) = {
            let state = self.state.lock().unwrap();
            let hint = self.locker.lock().unwrap().current_frequency();
            let tick = state.estimator.tick(&self.decimator, hint);
            (tick.raw_frequency, tick.spl, state.config.internal_min_frequency)
        };

        let published = self.locker.lock().unwrap().update(raw_frequency, min_frequency);
        trace!("raw={raw_frequency:.3} published={published:.3}");
        self.publish(published, Some(spl));
    }

    fn publish(&self, frequency: f64, spl: Option<Vec<f64>>) {
        *self.last_frequency.lock().unwrap() = frequency;
        if let Some(spl) = spl {
            *self.spl.lock().unwrap() = spl.iter().map(|&v| v as f32).collect();
        } else {
            self.spl.lock().unwrap().iter_mut().for_each(|v| *v = 0.0);
        }
    }

    /// Signals the compute thread, waits up to 300ms for it to notice and
    /// exit, then deactivates the audio source regardless of whether the
    /// watchdog fired. Zeros the published spectrum and frequency.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        {
            let mut signal = self.signal.mutex.lock().unwrap();
            signal.running = false;
            self.signal.cond.notify_all();
        }

        let signal_guard = self.signal.mutex.lock().unwrap();
        let (_guard, result) = self
            .signal
            .cond
            .wait_timeout_while(signal_guard, STOP_WATCHDOG, |s| !s.finished)
            .unwrap();

        if result.timed_out() {
            warn!("warning: computation thread did not stop within 300ms");
        } else if let Some(handle) = self.compute_thread.lock().unwrap().take() {
            let _ = handle.join();
        }

        self.audio.lock().unwrap().stop();
        self.publish(0.0, None);
    }

    /// Atomically swaps in a new config: the estimator's derived index
    /// bounds and windows are rebuilt together with the locker's
    /// `min_frequency` input (read fresh from `state.config` every tick),
    /// so a live scale change can never leave them disagreeing — see the
    /// Open Question decision in `DESIGN.md`.
    pub fn set_config(&self, mut config: Config) -> Result<(), TunerError> {
        config.validate()?;
        let mut state = self.state.lock().unwrap();
        state.estimator.set_config(config);
        state.config = config;
        Ok(())
    }

    pub fn config(&self) -> Config {
        self.state.lock().unwrap().config
    }
}

impl Consumer for Core {
    fn latest_frequency(&self) -> f64 {
        *self.last_frequency.lock().unwrap()
    }

    fn latest_spl(&self, dest: &mut [f32]) {
        let spl = self.spl.lock().unwrap();
        let n = dest.len().min(spl.len());
        dest[..n].copy_from_slice(&spl[..n]);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn was_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::WindowType;
    use std::sync::atomic::AtomicBool as StdAtomicBool;

    struct FakeAudio {
        interrupted: Option<Arc<StdAtomicBool>>,
    }

    impl AudioSource for FakeAudio {
        fn open(&mut self, _device: &str, desired_rate: u32) -> Result<crate::audio::AudioStreamInfo, TunerError> {
            Ok(crate::audio::AudioStreamInfo {
                real_sample_rate: desired_rate,
                buffer_size_samples: 256,
                bytes_per_sample: 4,
            })
        }

        fn start(
            &mut self,
            _callback: crate::audio::ReadCallback,
            interrupted: Arc<StdAtomicBool>,
        ) -> Result<(), TunerError> {
            self.interrupted = Some(interrupted);
            Ok(())
        }

        fn stop(&mut self) {}
        fn close(&mut self) {}
    }

    #[test]
    fn start_then_stop_returns_to_idle() {
        let config = Config { calculation_rate: 20.0, window_type: WindowType::None, ..Config::default() };
        let core = Arc::new(Core::new(config, Box::new(FakeAudio { interrupted: None })).unwrap());
        core.start("default").unwrap();
        assert!(core.is_running());
        std::thread::sleep(Duration::from_millis(50));
        core.stop();
        assert!(!core.is_running());
        assert_eq!(core.latest_frequency(), 0.0);
    }

    #[test]
    fn set_config_rebuilds_estimator_bounds() {
        let config = Config::default();
        let core = Core::new(config, Box::new(FakeAudio { interrupted: None })).unwrap();
        let mut updated = config;
        updated.internal_min_frequency = 80.0;
        updated.internal_max_frequency = 1000.0;
        core.set_config(updated).unwrap();
        assert_eq!(core.config().internal_min_frequency, 80.0);
    }
}
