//! Spotify Web API playback backend.
//!
//! Talks to the player endpoints with a bearer token. Token acquisition
//! (OAuth authorization-code flow, refresh) happens outside this crate; the
//! token is supplied through configuration.
//!
//! The backend is responsible for:
//! - Translating `PlaybackControl` calls into Web API requests
//! - Mapping "no active playback" (HTTP 204) to `None`
//!
//! The backend MUST NOT:
//! - Log the access token
//! - Retry failed calls (the dispatcher reports them upward)

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use url::Url;

use crate::playback::backend::{Device, PlaybackControl, PlaybackState};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the Spotify backend.
#[derive(Clone)]
pub struct SpotifyConfig {
    /// Web API base URL, e.g. "https://api.spotify.com/v1/".
    pub api_base: String,
    /// OAuth access token with `user-read-playback-state` and
    /// `user-modify-playback-state` scopes.
    pub access_token: String,
}

impl std::fmt::Debug for SpotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyConfig")
            .field("api_base", &self.api_base)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

pub struct SpotifyPlayer {
    agent: ureq::Agent,
    base: Url,
    auth_header: String,
}

#[derive(Debug, Deserialize)]
struct PlayerResponse {
    #[serde(default)]
    is_playing: bool,
    device: Option<DeviceResponse>,
}

#[derive(Debug, Deserialize)]
struct DevicesResponse {
    #[serde(default)]
    devices: Vec<DeviceResponse>,
}

#[derive(Debug, Deserialize)]
struct DeviceResponse {
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    is_active: bool,
    volume_percent: Option<u8>,
}

impl DeviceResponse {
    fn into_device(self) -> Option<Device> {
        Some(Device {
            id: self.id?,
            name: self.name,
            is_active: self.is_active,
            volume_percent: self.volume_percent,
        })
    }
}

impl SpotifyPlayer {
    pub fn new(config: SpotifyConfig) -> Result<Self> {
        let mut base_str = config.api_base.clone();
        if !base_str.ends_with('/') {
            base_str.push('/');
        }
        let base = Url::parse(&base_str).context("parse spotify api base url")?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(anyhow!(
                "unsupported spotify api scheme '{}'; expected http(s)",
                base.scheme()
            ));
        }
        if config.access_token.trim().is_empty() {
            return Err(anyhow!("spotify access token is empty"));
        }
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Ok(Self {
            agent,
            base,
            auth_header: format!("Bearer {}", config.access_token.trim()),
        })
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base
            .join(path)
            .with_context(|| format!("build spotify endpoint {}", path))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    fn get(&self, path: &str) -> Result<Option<String>> {
        let url = self.endpoint(path, &[])?;
        let response = self
            .agent
            .get(url.as_str())
            .set("Authorization", &self.auth_header)
            .call()
            .map_err(|e| describe_error(path, e))?;
        if response.status() == 204 {
            return Ok(None);
        }
        let body = response
            .into_string()
            .with_context(|| format!("read spotify response for {}", path))?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(body))
    }

    fn send(&self, method: &str, path: &str, query: &[(&str, &str)]) -> Result<()> {
        let url = self.endpoint(path, query)?;
        self.agent
            .request(method, url.as_str())
            .set("Authorization", &self.auth_header)
            .send_string("")
            .map_err(|e| describe_error(path, e))?;
        log::debug!("spotify {} {} ok", method, path);
        Ok(())
    }
}

fn describe_error(path: &str, err: ureq::Error) -> anyhow::Error {
    match err {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            anyhow!("spotify {} returned HTTP {}: {}", path, code, body.trim())
        }
        ureq::Error::Transport(transport) => {
            anyhow!("spotify {} unreachable: {}", path, transport)
        }
    }
}

impl PlaybackControl for SpotifyPlayer {
    fn name(&self) -> &'static str {
        "spotify"
    }

    fn playback_state(&self) -> Result<Option<PlaybackState>> {
        let Some(body) = self.get("me/player")? else {
            return Ok(None);
        };
        let parsed: PlayerResponse =
            serde_json::from_str(&body).context("parse spotify playback state")?;
        Ok(Some(PlaybackState {
            is_playing: parsed.is_playing,
            device: parsed.device.and_then(DeviceResponse::into_device),
        }))
    }

    fn devices(&self) -> Result<Vec<Device>> {
        let Some(body) = self.get("me/player/devices")? else {
            return Ok(Vec::new());
        };
        let parsed: DevicesResponse =
            serde_json::from_str(&body).context("parse spotify device list")?;
        Ok(parsed
            .devices
            .into_iter()
            .filter_map(DeviceResponse::into_device)
            .collect())
    }

    fn play(&self, device_id: Option<&str>) -> Result<()> {
        match device_id {
            Some(id) => self.send("PUT", "me/player/play", &[("device_id", id)]),
            None => self.send("PUT", "me/player/play", &[]),
        }
    }

    fn pause(&self) -> Result<()> {
        self.send("PUT", "me/player/pause", &[])
    }

    fn next_track(&self) -> Result<()> {
        self.send("POST", "me/player/next", &[])
    }

    fn previous_track(&self) -> Result<()> {
        self.send("POST", "me/player/previous", &[])
    }

    fn set_volume(&self, percent: u8) -> Result<()> {
        let percent = percent.min(100).to_string();
        self.send("PUT", "me/player/volume", &[("volume_percent", &percent)])
    }
}
