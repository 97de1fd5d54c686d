use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::ingest::SourceConfig;
use crate::playback::{DEFAULT_API_BASE, DEFAULT_VOLUME_STEP};
use crate::recognize::RecognizerSettings;
use crate::session::{SessionSettings, DEFAULT_COOLDOWN};

const DEFAULT_SOURCE: &str = "stub://webcam";
const DEFAULT_FRAME_SKIP: u32 = 3;
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_TARGET_FPS: u32 = 30;
const DEFAULT_PLAYBACK_BACKEND: &str = "memory";
const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:8765";

#[derive(Debug, Deserialize, Default)]
struct GrooveConfigFile {
    recognizer: Option<RecognizerConfigFile>,
    capture: Option<CaptureConfigFile>,
    playback: Option<PlaybackConfigFile>,
    server: Option<ServerConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct RecognizerConfigFile {
    pinch_threshold: Option<f32>,
    swipe_threshold_px: Option<f32>,
    buffer_capacity: Option<usize>,
    cooldown_secs: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    source: Option<String>,
    frame_skip: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct PlaybackConfigFile {
    backend: Option<String>,
    volume_step: Option<u8>,
    api_base: Option<String>,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ServerConfigFile {
    addr: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GrooveConfig {
    pub recognizer: RecognizerSettings,
    pub cooldown: Duration,
    pub capture: CaptureSettings,
    pub playback: PlaybackSettings,
    pub server_addr: String,
}

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub source: String,
    pub frame_skip: u32,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

#[derive(Clone)]
pub struct PlaybackSettings {
    pub backend: String,
    pub volume_step: u8,
    pub api_base: String,
    pub access_token: Option<String>,
}

impl std::fmt::Debug for PlaybackSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSettings")
            .field("backend", &self.backend)
            .field("volume_step", &self.volume_step)
            .field("api_base", &self.api_base)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for GrooveConfig {
    fn default() -> Self {
        Self {
            recognizer: RecognizerSettings::default(),
            cooldown: DEFAULT_COOLDOWN,
            capture: CaptureSettings {
                source: DEFAULT_SOURCE.to_string(),
                frame_skip: DEFAULT_FRAME_SKIP,
                width: DEFAULT_WIDTH,
                height: DEFAULT_HEIGHT,
                target_fps: DEFAULT_TARGET_FPS,
            },
            playback: PlaybackSettings {
                backend: DEFAULT_PLAYBACK_BACKEND.to_string(),
                volume_step: DEFAULT_VOLUME_STEP,
                api_base: DEFAULT_API_BASE.to_string(),
                access_token: None,
            },
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
        }
    }
}

impl GrooveConfig {
    /// Load from `GROOVE_CONFIG` (if set), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("GROOVE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a specific file, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_config_file(path)?)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            recognizer: self.recognizer,
            cooldown: self.cooldown,
        }
    }

    pub fn source_config(&self) -> SourceConfig {
        SourceConfig {
            url: self.capture.source.clone(),
            width: self.capture.width,
            height: self.capture.height,
        }
    }

    fn from_file(file: GrooveConfigFile) -> Result<Self> {
        let recognizer_file = file.recognizer.unwrap_or_default();
        let defaults = RecognizerSettings::default();
        let recognizer = RecognizerSettings {
            pinch_threshold: recognizer_file
                .pinch_threshold
                .unwrap_or(defaults.pinch_threshold),
            swipe_threshold_px: recognizer_file
                .swipe_threshold_px
                .unwrap_or(defaults.swipe_threshold_px),
            buffer_capacity: recognizer_file
                .buffer_capacity
                .unwrap_or(defaults.buffer_capacity),
        };
        let cooldown_secs = recognizer_file
            .cooldown_secs
            .unwrap_or(DEFAULT_COOLDOWN.as_secs_f64());
        let cooldown = Duration::try_from_secs_f64(cooldown_secs)
            .map_err(|_| anyhow!("cooldown_secs must be a non-negative number"))?;

        let capture_file = file.capture.unwrap_or_default();
        let capture = CaptureSettings {
            source: capture_file
                .source
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            frame_skip: capture_file.frame_skip.unwrap_or(DEFAULT_FRAME_SKIP),
            width: capture_file.width.unwrap_or(DEFAULT_WIDTH),
            height: capture_file.height.unwrap_or(DEFAULT_HEIGHT),
            target_fps: capture_file.target_fps.unwrap_or(DEFAULT_TARGET_FPS),
        };

        let playback_file = file.playback.unwrap_or_default();
        let playback = PlaybackSettings {
            backend: playback_file
                .backend
                .unwrap_or_else(|| DEFAULT_PLAYBACK_BACKEND.to_string()),
            volume_step: playback_file.volume_step.unwrap_or(DEFAULT_VOLUME_STEP),
            api_base: playback_file
                .api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            access_token: playback_file.access_token,
        };

        let server_addr = file
            .server
            .and_then(|server| server.addr)
            .unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string());

        Ok(Self {
            recognizer,
            cooldown,
            capture,
            playback,
            server_addr,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(source) = std::env::var("GROOVE_SOURCE") {
            if !source.trim().is_empty() {
                self.capture.source = source;
            }
        }
        if let Ok(skip) = std::env::var("GROOVE_FRAME_SKIP") {
            self.capture.frame_skip = skip
                .trim()
                .parse()
                .map_err(|_| anyhow!("GROOVE_FRAME_SKIP must be a positive integer"))?;
        }
        if let Ok(cooldown) = std::env::var("GROOVE_COOLDOWN_SECS") {
            let secs: f64 = cooldown
                .trim()
                .parse()
                .map_err(|_| anyhow!("GROOVE_COOLDOWN_SECS must be a number of seconds"))?;
            self.cooldown = Duration::try_from_secs_f64(secs)
                .map_err(|_| anyhow!("GROOVE_COOLDOWN_SECS must be a non-negative number"))?;
        }
        if let Ok(backend) = std::env::var("GROOVE_PLAYBACK_BACKEND") {
            if !backend.trim().is_empty() {
                self.playback.backend = backend.trim().to_lowercase();
            }
        }
        if let Ok(step) = std::env::var("GROOVE_VOLUME_STEP") {
            self.playback.volume_step = step
                .trim()
                .parse()
                .map_err(|_| anyhow!("GROOVE_VOLUME_STEP must be an integer between 1 and 100"))?;
        }
        if let Ok(addr) = std::env::var("GROOVE_SERVER_ADDR") {
            if !addr.trim().is_empty() {
                self.server_addr = addr;
            }
        }
        if let Ok(token) = std::env::var("SPOTIFY_ACCESS_TOKEN") {
            if !token.trim().is_empty() {
                self.playback.access_token = Some(token.trim().to_string());
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let r = &self.recognizer;
        if !(r.pinch_threshold > 0.0 && r.pinch_threshold <= 1.0) {
            return Err(anyhow!("pinch_threshold must be within (0, 1]"));
        }
        if !(r.swipe_threshold_px > 0.0) || !r.swipe_threshold_px.is_finite() {
            return Err(anyhow!("swipe_threshold_px must be greater than zero"));
        }
        if r.buffer_capacity < 2 {
            return Err(anyhow!("buffer_capacity must be at least 2 samples"));
        }
        if self.capture.frame_skip == 0 {
            return Err(anyhow!("frame_skip must be at least 1"));
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(anyhow!("capture width and height must be greater than zero"));
        }
        if self.capture.target_fps == 0 {
            return Err(anyhow!("target_fps must be at least 1"));
        }
        if self.playback.volume_step == 0 || self.playback.volume_step > 100 {
            return Err(anyhow!("volume_step must be between 1 and 100"));
        }
        match self.playback.backend.as_str() {
            "memory" | "spotify" => {}
            other => return Err(anyhow!("unknown playback backend '{}'", other)),
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<GrooveConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = GrooveConfig::default();
        assert_eq!(cfg.recognizer, RecognizerSettings::default());
        assert_eq!(cfg.cooldown, Duration::from_secs(1));
        assert_eq!(cfg.capture.frame_skip, 3);
        assert_eq!(cfg.playback.volume_step, 30);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_file_uses_component_defaults() {
        let cfg = GrooveConfig::from_file(GrooveConfigFile::default()).expect("defaults");
        assert_eq!(cfg.session_settings(), SessionSettings::default());
        assert_eq!(cfg.playback.volume_step, DEFAULT_VOLUME_STEP);
        assert_eq!(cfg.playback.api_base, DEFAULT_API_BASE);
        let built = GrooveConfig::default();
        assert_eq!(cfg.recognizer, built.recognizer);
        assert_eq!(cfg.cooldown, built.cooldown);
    }

    #[test]
    fn rejects_degenerate_window() {
        let mut cfg = GrooveConfig::default();
        cfg.recognizer.buffer_capacity = 1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_unknown_backend() {
        let mut cfg = GrooveConfig::default();
        cfg.playback.backend = "winamp".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let mut cfg = GrooveConfig::default();
        cfg.playback.access_token = Some("secret-token".to_string());
        assert!(!format!("{:?}", cfg).contains("secret-token"));
    }
}
