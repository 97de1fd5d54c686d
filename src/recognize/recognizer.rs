use crate::landmarks::HandLandmarks;

use super::{GestureLabel, MotionHistory};

pub const DEFAULT_PINCH_THRESHOLD: f32 = 0.05;
pub const DEFAULT_SWIPE_THRESHOLD_PX: f32 = 50.0;
pub const DEFAULT_BUFFER_CAPACITY: usize = 5;

/// Tunables for the per-frame classifier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecognizerSettings {
    /// Normalized thumb-to-index distance below which the hand counts as pinched.
    pub pinch_threshold: f32,
    /// Wrist travel in pixels across a full window needed for a swipe.
    pub swipe_threshold_px: f32,
    /// Samples per motion window.
    pub buffer_capacity: usize,
}

impl Default for RecognizerSettings {
    fn default() -> Self {
        Self {
            pinch_threshold: DEFAULT_PINCH_THRESHOLD,
            swipe_threshold_px: DEFAULT_SWIPE_THRESHOLD_PX,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

/// Stateful gesture classifier.
///
/// # Priority
///
/// Every call runs the rules in a fixed order and returns on the first match:
///
/// 1. no hand: both windows are cleared, nothing is returned
/// 2. pinch (thumb tip to index tip, normalized space) -> `PlayPause`
/// 3. horizontal wrist travel over a full window -> `Next` / `Previous`
/// 4. vertical wrist travel over a full window -> `VolumeUp` / `VolumeDown`
///
/// A pinch frame does not feed either window. A horizontal trigger returns
/// before the vertical window sees the sample. Each window is cleared by the
/// swipe it produced, so one physical swipe cannot fire twice.
#[derive(Clone, Debug)]
pub struct GestureRecognizer {
    settings: RecognizerSettings,
    horizontal: MotionHistory,
    vertical: MotionHistory,
}

impl GestureRecognizer {
    pub fn new(settings: RecognizerSettings) -> Self {
        Self {
            settings,
            horizontal: MotionHistory::new(settings.buffer_capacity),
            vertical: MotionHistory::new(settings.buffer_capacity),
        }
    }

    pub fn classify(
        &mut self,
        landmarks: Option<&HandLandmarks>,
        frame_width: u32,
        frame_height: u32,
    ) -> Option<GestureLabel> {
        let Some(hand) = landmarks else {
            self.reset();
            return None;
        };

        if hand.pinch_distance() < self.settings.pinch_threshold {
            return Some(GestureLabel::PlayPause);
        }

        let wrist = hand.wrist();
        let threshold = self.settings.swipe_threshold_px;

        self.horizontal.push(wrist.x * frame_width as f32);
        if let Some(dx) = self.horizontal.displacement() {
            let swipe = if dx > threshold {
                Some(GestureLabel::Next)
            } else if dx < -threshold {
                Some(GestureLabel::Previous)
            } else {
                None
            };
            if swipe.is_some() {
                self.horizontal.clear();
                return swipe;
            }
        }

        // Pixel y grows downward, so upward travel is oldest - newest.
        self.vertical.push(wrist.y * frame_height as f32);
        if let Some(dy) = self.vertical.displacement().map(|d| -d) {
            let swipe = if dy > threshold {
                Some(GestureLabel::VolumeUp)
            } else if dy < -threshold {
                Some(GestureLabel::VolumeDown)
            } else {
                None
            };
            if swipe.is_some() {
                self.vertical.clear();
                return swipe;
            }
        }

        None
    }

    /// Drop all motion history.
    pub fn reset(&mut self) {
        self.horizontal.clear();
        self.vertical.clear();
    }

    pub fn settings(&self) -> RecognizerSettings {
        self.settings
    }

    pub fn horizontal_history(&self) -> &MotionHistory {
        &self.horizontal
    }

    pub fn vertical_history(&self) -> &MotionHistory {
        &self.vertical
    }
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new(RecognizerSettings::default())
    }
}
