use anyhow::Result;

/// A playback device known to the backend account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    /// Current volume, when the device reports one.
    pub volume_percent: Option<u8>,
}

/// Snapshot of the account's current playback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub device: Option<Device>,
}

/// Playback-control backend.
///
/// Calls may block on network I/O. Implementations are shared across sessions,
/// so they take `&self` and handle their own interior synchronization.
pub trait PlaybackControl: Send + Sync {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Current playback, or `None` when the account has no active session.
    fn playback_state(&self) -> Result<Option<PlaybackState>>;

    /// Devices available to the account.
    fn devices(&self) -> Result<Vec<Device>>;

    /// Start or resume playback, optionally transferring to `device_id`.
    fn play(&self, device_id: Option<&str>) -> Result<()>;

    fn pause(&self) -> Result<()>;

    fn next_track(&self) -> Result<()>;

    fn previous_track(&self) -> Result<()>;

    /// Set the absolute volume (0..=100) of the active device.
    fn set_volume(&self, percent: u8) -> Result<()>;
}
