use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};

use crate::playback::backend::{Device, PlaybackControl, PlaybackState};

const DEFAULT_DEVICE_ID: &str = "local-speaker";
const DEFAULT_VOLUME: u8 = 50;

/// A call received by the in-memory player, recorded in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayerCall {
    Play(Option<String>),
    Pause,
    Next,
    Previous,
    SetVolume(u8),
}

#[derive(Debug)]
struct PlayerState {
    session_active: bool,
    is_playing: bool,
    active_device: Option<String>,
    devices: Vec<Device>,
    volume: u8,
    track: i64,
    failing: bool,
    calls: Vec<PlayerCall>,
}

/// In-process playback target.
///
/// Used when no real backend is configured and as the test double for the
/// dispatcher. Clones share state, so a test can keep one handle while the
/// dispatcher owns another.
#[derive(Clone, Debug)]
pub struct InMemoryPlayer {
    state: Arc<Mutex<PlayerState>>,
}

impl InMemoryPlayer {
    /// One local device, active session, paused, volume 50.
    pub fn new() -> Self {
        Self::from_state(PlayerState {
            session_active: true,
            is_playing: false,
            active_device: Some(DEFAULT_DEVICE_ID.to_string()),
            devices: vec![Device {
                id: DEFAULT_DEVICE_ID.to_string(),
                name: "Local Speaker".to_string(),
                is_active: true,
                volume_percent: Some(DEFAULT_VOLUME),
            }],
            volume: DEFAULT_VOLUME,
            track: 0,
            failing: false,
            calls: Vec::new(),
        })
    }

    /// Account with no active playback session.
    pub fn without_session() -> Self {
        let player = Self::new();
        player.lock_state().session_active = false;
        player
    }

    /// Replace the device list. The active device is cleared.
    pub fn with_devices(self, devices: Vec<Device>) -> Self {
        {
            let mut state = self.lock_state();
            state.devices = devices;
            state.active_device = None;
        }
        self
    }

    pub fn with_volume(self, volume: u8) -> Self {
        self.lock_state().volume = volume.min(100);
        self
    }

    pub fn with_playing(self, playing: bool) -> Self {
        self.lock_state().is_playing = playing;
        self
    }

    /// Make every subsequent call fail, as an unreachable backend would.
    pub fn set_failing(&self, failing: bool) {
        self.lock_state().failing = failing;
    }

    pub fn calls(&self) -> Vec<PlayerCall> {
        self.lock_state().calls.clone()
    }

    pub fn volume(&self) -> u8 {
        self.lock_state().volume
    }

    pub fn is_playing(&self) -> bool {
        self.lock_state().is_playing
    }

    /// Net track offset from where the player started.
    pub fn track(&self) -> i64 {
        self.lock_state().track
    }

    fn from_state(state: PlayerState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, PlayerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn checked(&self) -> Result<MutexGuard<'_, PlayerState>> {
        let state = self
            .state
            .lock()
            .map_err(|_| anyhow!("in-memory player lock poisoned"))?;
        if state.failing {
            return Err(anyhow!("in-memory player unreachable"));
        }
        Ok(state)
    }
}

impl Default for InMemoryPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackControl for InMemoryPlayer {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn playback_state(&self) -> Result<Option<PlaybackState>> {
        let state = self.checked()?;
        if !state.session_active {
            return Ok(None);
        }
        let device = state
            .active_device
            .as_ref()
            .and_then(|id| state.devices.iter().find(|d| &d.id == id))
            .map(|d| Device {
                is_active: true,
                volume_percent: Some(state.volume),
                ..d.clone()
            });
        Ok(Some(PlaybackState {
            is_playing: state.is_playing,
            device,
        }))
    }

    fn devices(&self) -> Result<Vec<Device>> {
        Ok(self.checked()?.devices.clone())
    }

    fn play(&self, device_id: Option<&str>) -> Result<()> {
        let mut state = self.checked()?;
        if let Some(id) = device_id {
            if !state.devices.iter().any(|d| d.id == id) {
                return Err(anyhow!("device '{}' not found", id));
            }
            state.active_device = Some(id.to_string());
        }
        state.session_active = true;
        state.is_playing = true;
        state.calls.push(PlayerCall::Play(device_id.map(str::to_string)));
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        let mut state = self.checked()?;
        state.is_playing = false;
        state.calls.push(PlayerCall::Pause);
        Ok(())
    }

    fn next_track(&self) -> Result<()> {
        let mut state = self.checked()?;
        state.track += 1;
        state.calls.push(PlayerCall::Next);
        Ok(())
    }

    fn previous_track(&self) -> Result<()> {
        let mut state = self.checked()?;
        state.track -= 1;
        state.calls.push(PlayerCall::Previous);
        Ok(())
    }

    fn set_volume(&self, percent: u8) -> Result<()> {
        if percent > 100 {
            return Err(anyhow!("volume must be within 0..=100, got {}", percent));
        }
        let mut state = self.checked()?;
        state.volume = percent;
        state.calls.push(PlayerCall::SetVolume(percent));
        Ok(())
    }
}
