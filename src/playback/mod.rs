//! Playback control.
//!
//! The playback target is an external service reached through the
//! `PlaybackControl` trait. `ActionDispatcher` maps one gesture to one call on
//! that trait and owns the product rules (toggle semantics, relative volume).

mod backend;
mod backends;
mod dispatcher;

use std::sync::Arc;

use anyhow::{anyhow, Result};

pub use backend::{Device, PlaybackControl, PlaybackState};
pub use backends::{InMemoryPlayer, PlayerCall};
#[cfg(feature = "backend-spotify")]
pub use backends::{SpotifyConfig, SpotifyPlayer};
pub use dispatcher::{ActionDispatcher, DispatchError, DEFAULT_VOLUME_STEP};

/// Spotify Web API base used when none is configured.
pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1/";

use crate::config::PlaybackSettings;

/// Build the configured playback backend.
pub fn backend_from_settings(settings: &PlaybackSettings) -> Result<Arc<dyn PlaybackControl>> {
    match settings.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryPlayer::new())),
        "spotify" => {
            #[cfg(feature = "backend-spotify")]
            {
                let token = settings
                    .access_token
                    .clone()
                    .ok_or_else(|| anyhow!("spotify backend requires an access token"))?;
                let player = SpotifyPlayer::new(SpotifyConfig {
                    api_base: settings.api_base.clone(),
                    access_token: token,
                })?;
                Ok(Arc::new(player))
            }
            #[cfg(not(feature = "backend-spotify"))]
            {
                Err(anyhow!(
                    "spotify playback requires the backend-spotify feature"
                ))
            }
        }
        other => Err(anyhow!("unknown playback backend '{}'", other)),
    }
}
