use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discrete gesture produced by the recognizer.
///
/// Wire names match the control surface clients already speak
/// (`play/pause`, `volume up`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GestureLabel {
    #[serde(rename = "play/pause")]
    PlayPause,
    #[serde(rename = "next")]
    Next,
    #[serde(rename = "previous")]
    Previous,
    #[serde(rename = "volume up")]
    VolumeUp,
    #[serde(rename = "volume down")]
    VolumeDown,
}

impl GestureLabel {
    pub const ALL: [GestureLabel; 5] = [
        GestureLabel::PlayPause,
        GestureLabel::Next,
        GestureLabel::Previous,
        GestureLabel::VolumeUp,
        GestureLabel::VolumeDown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GestureLabel::PlayPause => "play/pause",
            GestureLabel::Next => "next",
            GestureLabel::Previous => "previous",
            GestureLabel::VolumeUp => "volume up",
            GestureLabel::VolumeDown => "volume down",
        }
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GestureLabel {
    type Err = anyhow::Error;

    /// Accepts the wire names plus the underscore spellings used in URL paths
    /// (`play_pause`, `volume_up`).
    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', " ");
        match normalized.as_str() {
            "play/pause" | "play pause" => Ok(GestureLabel::PlayPause),
            "next" => Ok(GestureLabel::Next),
            "previous" => Ok(GestureLabel::Previous),
            "volume up" => Ok(GestureLabel::VolumeUp),
            "volume down" => Ok(GestureLabel::VolumeDown),
            _ => Err(anyhow!("unknown gesture action '{}'", value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip_through_serde() {
        for label in GestureLabel::ALL {
            let json = serde_json::to_string(&label).expect("serialize");
            assert_eq!(json, format!("\"{}\"", label.as_str()));
            let back: GestureLabel = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(back, label);
        }
    }

    #[test]
    fn parses_path_spellings() {
        assert_eq!("play_pause".parse::<GestureLabel>().unwrap(), GestureLabel::PlayPause);
        assert_eq!("Volume_Up".parse::<GestureLabel>().unwrap(), GestureLabel::VolumeUp);
        assert_eq!("volume down".parse::<GestureLabel>().unwrap(), GestureLabel::VolumeDown);
        assert!("rewind".parse::<GestureLabel>().is_err());
    }
}
