//! groove_server - gesture recognition over a loopback TCP connection
//!
//! Clients stream landmark frames as JSON lines; each connection gets its own
//! recognizer and cooldown. Playback goes to the configured backend.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::mpsc;

use gesture_groove::{
    playback::backend_from_settings, ActionDispatcher, GestureServer, GrooveConfig, ServerConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension). Defaults to GROOVE_CONFIG.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Listen address; must be loopback unless you front it yourself.
    #[arg(long)]
    addr: Option<String>,
    /// Playback backend: memory or spotify.
    #[arg(long)]
    backend: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => GrooveConfig::load_from(path)?,
        None => GrooveConfig::load()?,
    };
    if let Some(addr) = args.addr {
        config.server_addr = addr;
    }
    if let Some(backend) = args.backend {
        config.playback.backend = backend.to_lowercase();
    }

    let backend = backend_from_settings(&config.playback)?;
    let dispatcher = ActionDispatcher::new(backend, config.playback.volume_step);
    let server_config = ServerConfig {
        addr: config.server_addr.clone(),
        session: config.session_settings(),
    };
    let handle = GestureServer::new(server_config, dispatcher).spawn()?;
    log::info!(
        "groove_server listening on {} (backend={}, cooldown={:?})",
        handle.addr,
        config.playback.backend,
        config.cooldown
    );

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .expect("error setting Ctrl-C handler");

    log::info!("groove_server waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping server...");
    handle.stop()?;

    Ok(())
}
