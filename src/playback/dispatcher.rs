use std::fmt;
use std::sync::Arc;

use crate::recognize::GestureLabel;

use super::backend::PlaybackControl;

pub const DEFAULT_VOLUME_STEP: u8 = 30;
/// Assumed volume when the active device does not report one.
const FALLBACK_VOLUME: u8 = 50;

/// Why a gesture could not be turned into a playback call.
#[derive(Debug)]
pub enum DispatchError {
    /// The account has no active playback session.
    NoActiveSession,
    /// No device is available to start playback on.
    NoDevice,
    /// The backend call itself failed.
    Backend {
        action: GestureLabel,
        source: anyhow::Error,
    },
}

impl DispatchError {
    fn backend(action: GestureLabel) -> impl FnOnce(anyhow::Error) -> DispatchError {
        move |source| DispatchError::Backend { action, source }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NoActiveSession => {
                write!(f, "no active playback session; start playback on a device first")
            }
            DispatchError::NoDevice => write!(f, "no playback devices available"),
            DispatchError::Backend { action, source } => {
                write!(f, "playback backend failed on '{}': {}", action, source)
            }
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Backend { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Maps a gesture to one playback-control call.
///
/// Holds no per-session state; one dispatcher is shared by every session.
#[derive(Clone)]
pub struct ActionDispatcher {
    backend: Arc<dyn PlaybackControl>,
    volume_step: u8,
}

impl ActionDispatcher {
    pub fn new(backend: Arc<dyn PlaybackControl>, volume_step: u8) -> Self {
        Self {
            backend,
            volume_step,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn volume_step(&self) -> u8 {
        self.volume_step
    }

    pub fn dispatch(&self, label: GestureLabel) -> Result<(), DispatchError> {
        match label {
            GestureLabel::PlayPause => self.toggle_playback(),
            GestureLabel::Next => self
                .backend
                .next_track()
                .map_err(DispatchError::backend(label)),
            GestureLabel::Previous => self
                .backend
                .previous_track()
                .map_err(DispatchError::backend(label)),
            GestureLabel::VolumeUp => self.adjust_volume(label, i16::from(self.volume_step)),
            GestureLabel::VolumeDown => self.adjust_volume(label, -i16::from(self.volume_step)),
        }
    }

    /// Pause when playing. Otherwise start playback on the first available device.
    fn toggle_playback(&self) -> Result<(), DispatchError> {
        let label = GestureLabel::PlayPause;
        let state = self
            .backend
            .playback_state()
            .map_err(DispatchError::backend(label))?
            .ok_or(DispatchError::NoActiveSession)?;

        if state.is_playing {
            return self.backend.pause().map_err(DispatchError::backend(label));
        }

        let devices = self
            .backend
            .devices()
            .map_err(DispatchError::backend(label))?;
        let device = devices.first().ok_or(DispatchError::NoDevice)?;
        log::debug!("starting playback on device {} ({})", device.name, device.id);
        self.backend
            .play(Some(&device.id))
            .map_err(DispatchError::backend(label))
    }

    fn adjust_volume(&self, label: GestureLabel, delta: i16) -> Result<(), DispatchError> {
        let state = self
            .backend
            .playback_state()
            .map_err(DispatchError::backend(label))?
            .ok_or(DispatchError::NoActiveSession)?;
        let device = state.device.ok_or(DispatchError::NoActiveSession)?;

        let current = device.volume_percent.unwrap_or(FALLBACK_VOLUME).min(100);
        let target = (i16::from(current) + delta).clamp(0, 100) as u8;
        if target == current {
            log::debug!("volume already at {}%, nothing to do", current);
            return Ok(());
        }
        self.backend
            .set_volume(target)
            .map_err(DispatchError::backend(label))
    }
}

impl fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDispatcher")
            .field("backend", &self.backend.name())
            .field("volume_step", &self.volume_step)
            .finish()
    }
}
