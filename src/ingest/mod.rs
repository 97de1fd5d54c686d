//! Landmark ingestion sources.
//!
//! This module provides the sources that feed the recognizer with one
//! `LandmarkFrame` per captured frame:
//! - Synthetic scripted hand motion (`stub://` URLs, demos and tests)
//! - Replay of recorded landmark frames from a local JSON-lines file
//! - Any pixel source paired with a `PoseEstimator` through `LandmarkNormalizer`
//!
//! The ingestion layer is responsible for:
//! - Producing exactly 21 keypoints per detected hand, or "no hand"
//! - Reporting the pixel dimensions of each frame
//!
//! The ingestion layer MUST NOT:
//! - Decimate frames (the capture loop applies frame skipping)
//! - Hold recognizer state

mod normalize;
pub mod replay;
pub mod synthetic;

use anyhow::{anyhow, Result};

pub use normalize::{normalize_estimate, LandmarkNormalizer, PoseEstimate, PoseEstimator};
pub use replay::ReplaySource;
pub use synthetic::{choreography_len, SyntheticSource};

use crate::landmarks::LandmarkFrame;

/// Configuration for a landmark source.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    /// `stub://<name>` for synthetic motion, otherwise a local replay file path.
    pub url: String,
    /// Frame width reported by synthetic sources.
    pub width: u32,
    /// Frame height reported by synthetic sources.
    pub height: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "stub://groove".to_string(),
            width: 640,
            height: 480,
        }
    }
}

/// Statistics for a landmark source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub frames_with_hand: u64,
    pub source: String,
}

/// Landmark source selected from a URL.
pub struct LandmarkSource {
    backend: SourceBackend,
}

enum SourceBackend {
    Synthetic(SyntheticSource),
    Replay(ReplaySource),
}

impl LandmarkSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(anyhow!("landmark source url must not be empty"));
        }
        if config.url.starts_with("stub://") {
            Ok(Self {
                backend: SourceBackend::Synthetic(SyntheticSource::new(config)),
            })
        } else if config.url.contains("://") {
            Err(anyhow!(
                "unsupported landmark source '{}'; expected stub:// or a local file path",
                config.url
            ))
        } else {
            Ok(Self {
                backend: SourceBackend::Replay(ReplaySource::new(config)),
            })
        }
    }

    /// Open the source.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            SourceBackend::Synthetic(source) => source.connect(),
            SourceBackend::Replay(source) => source.connect(),
        }
    }

    /// Capture the next frame. `None` once a finite source is exhausted.
    pub fn next_frame(&mut self) -> Result<Option<LandmarkFrame>> {
        match &mut self.backend {
            SourceBackend::Synthetic(source) => source.next_frame().map(Some),
            SourceBackend::Replay(source) => source.next_frame(),
        }
    }

    /// Check if the source is healthy.
    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            SourceBackend::Synthetic(source) => source.is_healthy(),
            SourceBackend::Replay(source) => source.is_healthy(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> SourceStats {
        match &self.backend {
            SourceBackend::Synthetic(source) => source.stats(),
            SourceBackend::Replay(source) => source.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_remote_urls() {
        let result = LandmarkSource::new(SourceConfig {
            url: "rtsp://camera/stream".to_string(),
            ..SourceConfig::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn stub_url_selects_synthetic_source() {
        let mut source = LandmarkSource::new(SourceConfig::default()).expect("source");
        source.connect().expect("connect");
        let frame = source.next_frame().expect("frame").expect("synthetic never ends");
        assert_eq!((frame.width, frame.height), (640, 480));
        assert_eq!(source.stats().frames_captured, 1);
    }
}
