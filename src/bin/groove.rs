//! groove - local gesture capture loop
//!
//! This binary:
//! 1. Opens the configured landmark source
//! 2. Recognizes gestures on every Nth frame
//! 3. Sends admitted gestures to the playback backend

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gesture_groove::{
    playback::backend_from_settings, ActionDispatcher, GrooveConfig, LandmarkSource, LocalDriver,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension). Defaults to GROOVE_CONFIG.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Landmark source: stub://<name> or a recorded JSON-lines file.
    #[arg(long)]
    source: Option<String>,
    /// Process every Nth raw frame.
    #[arg(long)]
    frame_skip: Option<u32>,
    /// Playback backend: memory or spotify.
    #[arg(long)]
    backend: Option<String>,
    /// Stop after this many raw frames.
    #[arg(long)]
    max_frames: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => GrooveConfig::load_from(path)?,
        None => GrooveConfig::load()?,
    };
    if let Some(source) = args.source {
        config.capture.source = source;
    }
    if let Some(frame_skip) = args.frame_skip {
        config.capture.frame_skip = frame_skip;
    }
    if let Some(backend) = args.backend {
        config.playback.backend = backend.to_lowercase();
    }

    let backend = backend_from_settings(&config.playback)?;
    let dispatcher = ActionDispatcher::new(backend, config.playback.volume_step);
    let source = LandmarkSource::new(config.source_config())?;
    let mut driver = LocalDriver::new(
        source,
        config.capture.frame_skip,
        config.session_settings(),
        dispatcher,
    )?
    .with_target_fps(config.capture.target_fps);
    driver.connect()?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    ctrlc::set_handler(move || {
        stop_handler.store(true, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    let stats = driver.run(&stop, args.max_frames)?;
    log::info!(
        "groove stopped: frames={} gestures={} dispatched={} suppressed={} failures={}",
        stats.frames_processed,
        stats.gestures_recognized,
        stats.gestures_admitted,
        stats.gestures_suppressed,
        stats.dispatch_failures
    );
    Ok(())
}
