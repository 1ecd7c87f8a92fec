//! Command-line front end: loads a named config, builds a [`Core`], and
//! pumps it against an audio backend until interrupted.
//!
//! No concrete [`instrument_tuner::audio::AudioSource`] ships in this
//! crate — wiring a real backend (ALSA/JACK/PulseAudio/...) is outside
//! scope. `NullAudioSource` below stands in for one so this binary links
//! and its argument/config-resolution plumbing is exercisable; a real
//! deployment swaps it for a backend crate's `AudioSource` impl.

use clap::Parser;
use instrument_tuner::audio::{AudioSource, AudioStreamInfo, ReadCallback};
use instrument_tuner::{config_file, Core, TunerError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "instrument-tuner", about = "Real-time pitch estimation and tuning")]
struct Args {
    /// Config name under $HOME/.instrument-tuner/, without the .conf suffix.
    #[arg(short = 'c', long = "config", default_value = "default")]
    config: String,

    /// Audio device string passed through to the backend's `open`.
    #[arg(short = 'd', long = "device", default_value = "default")]
    device: String,
}

struct NullAudioSource;

impl AudioSource for NullAudioSource {
    fn open(&mut self, _device: &str, _desired_rate: u32) -> Result<AudioStreamInfo, TunerError> {
        Err(TunerError::AudioOpen(
            "no audio backend compiled into this binary; link one implementing AudioSource".into(),
        ))
    }

    fn start(&mut self, _callback: ReadCallback, _interrupted: Arc<AtomicBool>) -> Result<(), TunerError> {
        unreachable!("open() always fails, start() is never reached")
    }

    fn stop(&mut self) {}
    fn close(&mut self) {}
}

fn config_path(name: &str) -> Result<PathBuf, TunerError> {
    let home = dirs::home_dir()
        .ok_or_else(|| TunerError::config(None, "could not resolve $HOME"))?;
    Ok(home.join(".instrument-tuner").join(format!("{name}.conf")))
}

fn run(args: Args) -> Result<(), TunerError> {
    let path = config_path(&args.config)?;
    let (config, scale) = config_file::load(&path)?;
    log::info!("loaded config '{}', scale '{}'", args.config, scale.name);

    let core = Arc::new(Core::new(config, Box::new(NullAudioSource))?);
    core.start(&args.device)?;

    println!("tuning against scale '{}' — press Enter to stop", scale.name);
    let mut discard = String::new();
    let _ = std::io::stdin().read_line(&mut discard);

    core.stop();
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
