use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use crate::ingest::LandmarkSource;
use crate::playback::ActionDispatcher;
use crate::session::{FrameOutcome, GestureSession, SessionSettings, SessionStats};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Passes every Nth raw frame through to the recognizer.
#[derive(Clone, Debug)]
pub struct FrameSkipper {
    every: u32,
    count: u64,
}

impl FrameSkipper {
    pub fn new(every: u32) -> Result<Self> {
        if every == 0 {
            return Err(anyhow!("frame skip must be at least 1"));
        }
        Ok(Self { every, count: 0 })
    }

    /// Count one raw frame; true when it should be processed.
    pub fn should_process(&mut self) -> bool {
        self.count += 1;
        self.count % self.every as u64 == 0
    }

    pub fn every(&self) -> u32 {
        self.every
    }
}

/// Result of pulling one raw frame.
#[derive(Debug)]
pub enum StepOutcome {
    /// The source has no more frames.
    Exhausted,
    /// Frame dropped by decimation.
    Skipped,
    Processed(FrameOutcome),
}

/// Local capture loop: one source, one session, one dispatcher.
pub struct LocalDriver {
    source: LandmarkSource,
    skipper: FrameSkipper,
    session: GestureSession,
    dispatcher: ActionDispatcher,
    frame_interval: Duration,
}

impl LocalDriver {
    pub fn new(
        source: LandmarkSource,
        frame_skip: u32,
        settings: SessionSettings,
        dispatcher: ActionDispatcher,
    ) -> Result<Self> {
        Ok(Self {
            source,
            skipper: FrameSkipper::new(frame_skip)?,
            session: GestureSession::new(settings),
            dispatcher,
            frame_interval: Duration::ZERO,
        })
    }

    /// Pace `run` to roughly `fps` raw frames per second.
    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.frame_interval = if fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / fps
        };
        self
    }

    pub fn connect(&mut self) -> Result<()> {
        self.source.connect()
    }

    /// Pull one raw frame and process it if decimation lets it through.
    /// `now` is the frame's timestamp for the cooldown gate.
    pub fn step_at(&mut self, now: Instant) -> Result<StepOutcome> {
        let Some(frame) = self.source.next_frame()? else {
            return Ok(StepOutcome::Exhausted);
        };
        if !self.skipper.should_process() {
            return Ok(StepOutcome::Skipped);
        }
        let outcome = self.session.process(&frame, now, &self.dispatcher);
        Ok(StepOutcome::Processed(outcome))
    }

    /// Run until `stop` is set, the source is exhausted, or `max_frames`
    /// raw frames were read.
    pub fn run(&mut self, stop: &AtomicBool, max_frames: Option<u64>) -> Result<SessionStats> {
        let mut last_health_log = Instant::now();
        let mut raw_frames = 0u64;

        log::info!(
            "groove running. source={} frame_skip={} backend={} volume_step={}",
            self.source.stats().source,
            self.skipper.every(),
            self.dispatcher.backend_name(),
            self.dispatcher.volume_step()
        );

        while !stop.load(Ordering::SeqCst) {
            if max_frames.is_some_and(|max| raw_frames >= max) {
                break;
            }
            let started = Instant::now();
            match self.step_at(started)? {
                StepOutcome::Exhausted => {
                    log::info!("landmark source exhausted");
                    break;
                }
                StepOutcome::Skipped | StepOutcome::Processed(_) => raw_frames += 1,
            }

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let source_stats = self.source.stats();
                let session_stats = self.session.stats();
                log::info!(
                    "source health={} frames={} with_hand={} gestures={} dispatched={} source={}",
                    self.source.is_healthy(),
                    source_stats.frames_captured,
                    source_stats.frames_with_hand,
                    session_stats.gestures_recognized,
                    session_stats.gestures_admitted,
                    source_stats.source
                );
                last_health_log = Instant::now();
            }

            let elapsed = started.elapsed();
            if elapsed < self.frame_interval {
                std::thread::sleep(self.frame_interval - elapsed);
            }
        }

        Ok(self.session.stats())
    }

    pub fn session(&self) -> &GestureSession {
        &self.session
    }

    pub fn source(&self) -> &LandmarkSource {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{choreography_len, SourceConfig};
    use crate::playback::{InMemoryPlayer, PlayerCall};
    use crate::recognize::GestureLabel;
    use std::sync::Arc;

    #[test]
    fn skipper_passes_every_nth_frame() {
        let mut skipper = FrameSkipper::new(3).unwrap();
        let passed: Vec<bool> = (0..6).map(|_| skipper.should_process()).collect();
        assert_eq!(passed, vec![false, false, true, false, false, true]);
    }

    #[test]
    fn skipper_rejects_zero() {
        assert!(FrameSkipper::new(0).is_err());
    }

    #[test]
    fn synthetic_loop_drives_every_playback_call() {
        let player = InMemoryPlayer::new();
        let dispatcher = ActionDispatcher::new(Arc::new(player.clone()), 30);
        let source = LandmarkSource::new(SourceConfig::default()).unwrap();
        let mut driver =
            LocalDriver::new(source, 3, SessionSettings::default(), dispatcher).unwrap();
        driver.connect().unwrap();

        // Simulated 30 fps clock.
        let start = Instant::now();
        let mut admitted = Vec::new();
        for i in 0..choreography_len() {
            let now = start + Duration::from_millis(i * 1000 / 30);
            if let StepOutcome::Processed(outcome) = driver.step_at(now).unwrap() {
                admitted.extend(outcome.admitted());
            }
        }

        assert_eq!(
            admitted,
            vec![
                GestureLabel::Next,
                GestureLabel::Previous,
                GestureLabel::VolumeUp,
                GestureLabel::VolumeDown,
                GestureLabel::PlayPause,
            ]
        );
        assert_eq!(
            player.calls(),
            vec![
                PlayerCall::Next,
                PlayerCall::Previous,
                PlayerCall::SetVolume(80),
                PlayerCall::SetVolume(50),
                PlayerCall::Play(Some("local-speaker".to_string())),
            ]
        );
    }

    #[test]
    fn run_stops_after_max_frames() {
        let player = InMemoryPlayer::new();
        let dispatcher = ActionDispatcher::new(Arc::new(player), 30);
        let source = LandmarkSource::new(SourceConfig::default()).unwrap();
        let mut driver =
            LocalDriver::new(source, 3, SessionSettings::default(), dispatcher).unwrap();
        driver.connect().unwrap();
        let stop = AtomicBool::new(false);
        let stats = driver.run(&stop, Some(30)).unwrap();
        assert_eq!(stats.frames_processed, 10);
        assert_eq!(driver.source().stats().frames_captured, 30);
    }
}
