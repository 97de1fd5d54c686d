//! Synthetic landmark source.
//!
//! Replays a fixed choreography of hand motion on a loop: a swipe in each
//! direction and a pinch, separated by stretches without a hand. Keypoints get
//! a small seeded jitter so the recognizer sees noisy input, but runs are
//! reproducible.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{SourceConfig, SourceStats};
use crate::landmarks::{open_hand_at, pinched_hand_at, HandLandmarks, Keypoint, LandmarkFrame};

/// Normalized jitter amplitude applied to every keypoint.
const JITTER: f32 = 0.001;

#[derive(Clone, Copy, Debug)]
enum Segment {
    Absent { frames: u32 },
    Move { from: (f32, f32), to: (f32, f32), frames: u32 },
    Pinch { at: (f32, f32), frames: u32 },
}

impl Segment {
    fn frames(&self) -> u32 {
        match self {
            Segment::Absent { frames }
            | Segment::Move { frames, .. }
            | Segment::Pinch { frames, .. } => *frames,
        }
    }
}

/// One loop of the choreography. At 30 fps the absent stretches are about a
/// second, longer than the default cooldown.
const CHOREOGRAPHY: &[Segment] = &[
    Segment::Absent { frames: 15 },
    // right: next
    Segment::Move { from: (0.3, 0.5), to: (0.7, 0.5), frames: 15 },
    Segment::Absent { frames: 30 },
    // left: previous
    Segment::Move { from: (0.7, 0.5), to: (0.3, 0.5), frames: 15 },
    Segment::Absent { frames: 30 },
    // up: volume up
    Segment::Move { from: (0.5, 0.75), to: (0.5, 0.25), frames: 15 },
    Segment::Absent { frames: 30 },
    // down: volume down
    Segment::Move { from: (0.5, 0.25), to: (0.5, 0.75), frames: 15 },
    Segment::Absent { frames: 30 },
    Segment::Pinch { at: (0.5, 0.5), frames: 9 },
    Segment::Absent { frames: 30 },
];

/// Number of raw frames in one loop of the choreography.
pub fn choreography_len() -> u64 {
    CHOREOGRAPHY.iter().map(|s| s.frames() as u64).sum()
}

pub struct SyntheticSource {
    config: SourceConfig,
    rng: StdRng,
    frame_count: u64,
    frames_with_hand: u64,
}

impl SyntheticSource {
    pub fn new(config: SourceConfig) -> Self {
        let seed = config
            .url
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            frame_count: 0,
            frames_with_hand: 0,
        }
    }

    /// Synthetic sources are always "connected".
    pub fn connect(&mut self) -> Result<()> {
        log::info!("SyntheticSource: connected to {} (synthetic)", self.config.url);
        Ok(())
    }

    pub fn next_frame(&mut self) -> Result<LandmarkFrame> {
        let position = self.frame_count % choreography_len();
        self.frame_count += 1;

        let (width, height) = (self.config.width, self.config.height);
        let Some(hand) = self.pose_at(position) else {
            return Ok(LandmarkFrame::no_hand(width, height));
        };
        self.frames_with_hand += 1;
        Ok(LandmarkFrame::hand(self.jitter(hand), width, height))
    }

    fn pose_at(&self, mut position: u64) -> Option<HandLandmarks> {
        for segment in CHOREOGRAPHY {
            let frames = segment.frames() as u64;
            if position >= frames {
                position -= frames;
                continue;
            }
            return match *segment {
                Segment::Absent { .. } => None,
                Segment::Pinch { at: (x, y), .. } => Some(pinched_hand_at(x, y)),
                Segment::Move { from, to, frames } => {
                    let t = if frames > 1 {
                        position as f32 / (frames - 1) as f32
                    } else {
                        1.0
                    };
                    let x = from.0 + (to.0 - from.0) * t;
                    let y = from.1 + (to.1 - from.1) * t;
                    Some(open_hand_at(x, y))
                }
            };
        }
        None
    }

    fn jitter(&mut self, hand: HandLandmarks) -> HandLandmarks {
        let mut points = *hand.points();
        for point in points.iter_mut() {
            *point = Keypoint::new(
                point.x + self.rng.gen_range(-JITTER..=JITTER),
                point.y + self.rng.gen_range(-JITTER..=JITTER),
                point.z,
            );
        }
        HandLandmarks::new(points)
    }

    pub fn is_healthy(&self) -> bool {
        true
    }

    pub fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            frames_with_hand: self.frames_with_hand,
            source: self.config.url.clone(),
        }
    }
}
