//! Per-client gesture session.
//!
//! A `GestureSession` owns one recognizer and one cooldown gate. Sessions are
//! never shared between clients: isolation comes from one session per stream,
//! not from locking. `SharedSession` exists for hosts that must feed a single
//! session from several threads; it serializes the decision and releases the
//! lock before the (possibly slow) playback call.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use crate::landmarks::LandmarkFrame;
use crate::playback::{ActionDispatcher, DispatchError};
use crate::recognize::{CooldownGate, GestureLabel, GestureRecognizer, RecognizerSettings};

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionSettings {
    pub recognizer: RecognizerSettings,
    pub cooldown: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            recognizer: RecognizerSettings::default(),
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

/// What happened to one processed frame.
#[derive(Debug)]
pub enum FrameOutcome {
    /// No gesture this frame.
    Idle,
    /// A gesture was recognized but fell inside the cooldown window.
    Suppressed(GestureLabel),
    /// A gesture passed the gate and the playback call succeeded.
    Dispatched(GestureLabel),
    /// A gesture passed the gate but the playback call failed. The cooldown
    /// still advanced.
    DispatchFailed(GestureLabel, DispatchError),
}

impl FrameOutcome {
    /// The label that passed the cooldown gate, whether or not dispatch worked.
    pub fn admitted(&self) -> Option<GestureLabel> {
        match self {
            FrameOutcome::Dispatched(label) | FrameOutcome::DispatchFailed(label, _) => {
                Some(*label)
            }
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_processed: u64,
    pub frames_without_hand: u64,
    pub gestures_recognized: u64,
    pub gestures_suppressed: u64,
    pub gestures_admitted: u64,
    pub dispatch_failures: u64,
}

/// Outcome of the locked part of frame processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Idle,
    Suppressed(GestureLabel),
    Admitted(GestureLabel),
}

pub struct GestureSession {
    recognizer: GestureRecognizer,
    gate: CooldownGate,
    stats: SessionStats,
}

impl GestureSession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            recognizer: GestureRecognizer::new(settings.recognizer),
            gate: CooldownGate::new(settings.cooldown),
            stats: SessionStats::default(),
        }
    }

    /// Classify the frame and run the cooldown gate. On admission the gate
    /// timestamp is already advanced when this returns.
    pub fn decide(&mut self, frame: &LandmarkFrame, now: Instant) -> Decision {
        self.stats.frames_processed += 1;
        if frame.landmarks.is_none() {
            self.stats.frames_without_hand += 1;
        }

        let label = self
            .recognizer
            .classify(frame.landmarks.as_ref(), frame.width, frame.height);
        let Some(label) = label else {
            return Decision::Idle;
        };
        self.stats.gestures_recognized += 1;

        match self.gate.admit(Some(label), now) {
            Some(admitted) => {
                self.stats.gestures_admitted += 1;
                Decision::Admitted(admitted)
            }
            None => {
                self.stats.gestures_suppressed += 1;
                log::debug!("gesture '{}' suppressed by cooldown", label);
                Decision::Suppressed(label)
            }
        }
    }

    /// Decide, then dispatch an admitted gesture.
    pub fn process(
        &mut self,
        frame: &LandmarkFrame,
        now: Instant,
        dispatcher: &ActionDispatcher,
    ) -> FrameOutcome {
        let decision = self.decide(frame, now);
        let outcome = complete(decision, dispatcher);
        if matches!(outcome, FrameOutcome::DispatchFailed(..)) {
            self.stats.dispatch_failures += 1;
        }
        outcome
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn recognizer(&self) -> &GestureRecognizer {
        &self.recognizer
    }

    pub fn last_action(&self) -> Option<Instant> {
        self.gate.last_action()
    }
}

/// Perform the playback call for a decision. Runs outside any session lock.
fn complete(decision: Decision, dispatcher: &ActionDispatcher) -> FrameOutcome {
    match decision {
        Decision::Idle => FrameOutcome::Idle,
        Decision::Suppressed(label) => FrameOutcome::Suppressed(label),
        Decision::Admitted(label) => match dispatcher.dispatch(label) {
            Ok(()) => {
                log::info!("gesture '{}' dispatched via {}", label, dispatcher.backend_name());
                FrameOutcome::Dispatched(label)
            }
            Err(err) => {
                log::warn!("gesture '{}' dispatch failed: {}", label, err);
                FrameOutcome::DispatchFailed(label, err)
            }
        },
    }
}

/// One session fed by several threads.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<GestureSession>>,
}

impl SharedSession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(GestureSession::new(settings))),
        }
    }

    /// Classification, gate check and timestamp update happen under the lock;
    /// the playback call does not.
    pub fn process(
        &self,
        frame: &LandmarkFrame,
        now: Instant,
        dispatcher: &ActionDispatcher,
    ) -> Result<FrameOutcome> {
        let decision = {
            let mut session = self
                .inner
                .lock()
                .map_err(|_| anyhow!("gesture session lock poisoned"))?;
            session.decide(frame, now)
        };
        let outcome = complete(decision, dispatcher);
        if matches!(outcome, FrameOutcome::DispatchFailed(..)) {
            let mut session = self
                .inner
                .lock()
                .map_err(|_| anyhow!("gesture session lock poisoned"))?;
            session.stats.dispatch_failures += 1;
        }
        Ok(outcome)
    }

    pub fn stats(&self) -> Result<SessionStats> {
        let session = self
            .inner
            .lock()
            .map_err(|_| anyhow!("gesture session lock poisoned"))?;
        Ok(session.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{open_hand_at, pinched_hand_at};
    use crate::playback::{InMemoryPlayer, PlayerCall};

    fn dispatcher(player: &InMemoryPlayer) -> ActionDispatcher {
        ActionDispatcher::new(Arc::new(player.clone()), 30)
    }

    #[test]
    fn idle_frames_do_not_touch_gate() {
        let player = InMemoryPlayer::new();
        let mut session = GestureSession::new(SessionSettings::default());
        let frame = LandmarkFrame::hand(open_hand_at(0.5, 0.5), 640, 480);
        let outcome = session.process(&frame, Instant::now(), &dispatcher(&player));
        assert!(matches!(outcome, FrameOutcome::Idle));
        assert_eq!(session.last_action(), None);
        assert_eq!(session.recognizer().horizontal_history().len(), 1);
    }

    #[test]
    fn failed_dispatch_still_advances_cooldown() {
        let player = InMemoryPlayer::new();
        player.set_failing(true);
        let dispatcher = dispatcher(&player);
        let mut session = GestureSession::new(SessionSettings::default());
        let pinch = LandmarkFrame::hand(pinched_hand_at(0.5, 0.5), 640, 480);
        let start = Instant::now();

        let outcome = session.process(&pinch, start, &dispatcher);
        assert!(matches!(outcome, FrameOutcome::DispatchFailed(GestureLabel::PlayPause, _)));
        assert_eq!(session.last_action(), Some(start));

        player.set_failing(false);
        let outcome = session.process(&pinch, start + Duration::from_millis(200), &dispatcher);
        assert!(matches!(outcome, FrameOutcome::Suppressed(GestureLabel::PlayPause)));
        assert!(player.calls().is_empty());
        assert_eq!(session.stats().dispatch_failures, 1);
    }

    #[test]
    fn shared_session_serializes_decisions() {
        let player = InMemoryPlayer::new();
        let dispatcher = dispatcher(&player);
        let shared = SharedSession::new(SessionSettings::default());
        let start = Instant::now();
        let pinch = LandmarkFrame::hand(pinched_hand_at(0.5, 0.5), 640, 480);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = shared.clone();
                let dispatcher = dispatcher.clone();
                let pinch = pinch.clone();
                std::thread::spawn(move || shared.process(&pinch, start, &dispatcher))
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().expect("thread").expect("process"))
            .filter(|outcome| outcome.admitted().is_some())
            .count();

        assert_eq!(admitted, 1);
        assert_eq!(player.calls(), vec![PlayerCall::Play(Some("local-speaker".to_string()))]);
        let stats = shared.stats().unwrap();
        assert_eq!(stats.gestures_recognized, 8);
        assert_eq!(stats.gestures_suppressed, 7);
    }
}
