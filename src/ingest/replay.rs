//! Recorded landmark replay.
//!
//! Reads a local file with one JSON object per line:
//!
//! ```text
//! {"width":640,"height":480,"landmarks":[[0.51,0.62,0.0], ...21 entries]}
//! {"width":640,"height":480,"landmarks":null}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. A malformed line or a
//! hand with the wrong keypoint count fails the read with the line number.

use std::fs::File;
use std::io::{BufRead, BufReader};

use anyhow::{anyhow, Context, Result};

use super::{SourceConfig, SourceStats};
use crate::landmarks::{LandmarkFrame, LandmarkRecord};

pub struct ReplaySource {
    config: SourceConfig,
    reader: Option<BufReader<File>>,
    line_number: u64,
    frame_count: u64,
    frames_with_hand: u64,
    exhausted: bool,
    last_error: Option<String>,
}

impl ReplaySource {
    pub fn new(config: SourceConfig) -> Self {
        Self {
            config,
            reader: None,
            line_number: 0,
            frame_count: 0,
            frames_with_hand: 0,
            exhausted: false,
            last_error: None,
        }
    }

    pub fn connect(&mut self) -> Result<()> {
        let file = File::open(&self.config.url)
            .with_context(|| format!("open landmark replay {}", self.config.url))?;
        self.reader = Some(BufReader::new(file));
        self.line_number = 0;
        self.exhausted = false;
        self.last_error = None;
        log::info!("ReplaySource: connected to {}", self.config.url);
        Ok(())
    }

    pub fn next_frame(&mut self) -> Result<Option<LandmarkFrame>> {
        let result = self.read_frame();
        if let Err(err) = &result {
            self.last_error = Some(err.to_string());
        }
        result
    }

    fn read_frame(&mut self) -> Result<Option<LandmarkFrame>> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| anyhow!("replay source not connected; call connect() first"))?;
        let mut line = String::new();
        loop {
            line.clear();
            let read = reader
                .read_line(&mut line)
                .with_context(|| format!("read {}", self.config.url))?;
            if read == 0 {
                if !self.exhausted {
                    log::info!(
                        "ReplaySource: {} exhausted after {} frames",
                        self.config.url,
                        self.frame_count
                    );
                }
                self.exhausted = true;
                return Ok(None);
            }
            self.line_number += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let frame = serde_json::from_str::<LandmarkRecord>(trimmed)
                .map_err(anyhow::Error::from)
                .and_then(LandmarkRecord::into_frame)
                .with_context(|| format!("{}:{}", self.config.url, self.line_number))?;
            self.frame_count += 1;
            if frame.landmarks.is_some() {
                self.frames_with_hand += 1;
            }
            return Ok(Some(frame));
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.reader.is_some() && self.last_error.is_none()
    }

    pub fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            frames_with_hand: self.frames_with_hand,
            source: self.config.url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn hand_line(x: f32) -> String {
        let points = vec![format!("[{x},0.5,0.0]"); 21].join(",");
        format!(r#"{{"width":640,"height":480,"landmarks":[{points}]}}"#)
    }

    fn source_for(contents: &str) -> (NamedTempFile, ReplaySource) {
        let mut file = NamedTempFile::new().expect("temp replay");
        file.write_all(contents.as_bytes()).expect("write replay");
        let source = ReplaySource::new(SourceConfig {
            url: file.path().to_string_lossy().to_string(),
            ..SourceConfig::default()
        });
        (file, source)
    }

    #[test]
    fn reads_frames_until_exhausted() {
        let contents = format!(
            "# recorded session\n{}\n\n{{\"width\":640,\"height\":480,\"landmarks\":null}}\n",
            hand_line(0.25)
        );
        let (_file, mut source) = source_for(&contents);
        source.connect().unwrap();

        let first = source.next_frame().unwrap().expect("hand frame");
        assert_eq!(first.landmarks.unwrap().wrist().x, 0.25);
        let second = source.next_frame().unwrap().expect("no-hand frame");
        assert_eq!(second.landmarks, None);
        assert_eq!(source.next_frame().unwrap(), None);

        let stats = source.stats();
        assert_eq!(stats.frames_captured, 2);
        assert_eq!(stats.frames_with_hand, 1);
        assert!(source.is_healthy());
    }

    #[test]
    fn short_hand_reports_line_number() {
        let short = vec!["[0.5,0.5,0.0]"; 20].join(",");
        let contents = format!(
            "{}\n{{\"width\":640,\"height\":480,\"landmarks\":[{}]}}\n",
            hand_line(0.5),
            short
        );
        let (_file, mut source) = source_for(&contents);
        source.connect().unwrap();
        source.next_frame().unwrap();
        let err = source.next_frame().unwrap_err();
        assert!(format!("{:#}", err).contains(":2"));
        assert!(format!("{:#}", err).contains("exactly 21"));
        assert!(!source.is_healthy());
    }

    #[test]
    fn next_frame_requires_connect() {
        let (_file, mut source) = source_for("");
        assert!(source.next_frame().is_err());
    }
}
