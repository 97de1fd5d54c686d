//! Hand landmark types.
//!
//! A `HandLandmarks` value is the output of the pose-estimation collaborator for
//! one detected hand in one frame: 21 keypoints in the model's fixed anatomical
//! order. The count is part of the type, so a partially populated hand cannot be
//! constructed. Variable-length input (wire messages, replay files) goes through
//! `HandLandmarks::from_points`, which fails fast on a wrong count.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Number of keypoints emitted per hand by the pose model.
pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;

/// One normalized keypoint. `x`/`y` are relative to the frame (0..1), `z` is
/// relative depth with no fixed unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Keypoint {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Planar distance in normalized space. Depth is ignored.
    pub fn planar_distance(&self, other: &Keypoint) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<[f32; 3]> for Keypoint {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Keypoint> for [f32; 3] {
    fn from(point: Keypoint) -> Self {
        [point.x, point.y, point.z]
    }
}

/// 21 ordered keypoints describing one detected hand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandLandmarks {
    points: [Keypoint; LANDMARK_COUNT],
}

impl HandLandmarks {
    pub fn new(points: [Keypoint; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    /// Build from a variable-length list. Anything other than exactly 21
    /// entries is a contract violation of the pose-estimation collaborator.
    pub fn from_points<P: Into<Keypoint>>(points: impl IntoIterator<Item = P>) -> Result<Self> {
        let collected: Vec<Keypoint> = points.into_iter().map(Into::into).collect();
        let count = collected.len();
        let points: [Keypoint; LANDMARK_COUNT] = collected.try_into().map_err(|_| {
            anyhow!(
                "hand landmark frame must have exactly {} keypoints, got {}",
                LANDMARK_COUNT,
                count
            )
        })?;
        Ok(Self { points })
    }

    pub fn wrist(&self) -> Keypoint {
        self.points[WRIST]
    }

    pub fn thumb_tip(&self) -> Keypoint {
        self.points[THUMB_TIP]
    }

    pub fn index_tip(&self) -> Keypoint {
        self.points[INDEX_TIP]
    }

    pub fn points(&self) -> &[Keypoint; LANDMARK_COUNT] {
        &self.points
    }

    /// Normalized thumb-tip to index-tip distance.
    pub fn pinch_distance(&self) -> f32 {
        self.thumb_tip().planar_distance(&self.index_tip())
    }
}

impl std::ops::Index<usize> for HandLandmarks {
    type Output = Keypoint;

    fn index(&self, index: usize) -> &Keypoint {
        &self.points[index]
    }
}

/// One processed frame as seen by the recognizer: optional hand plus the pixel
/// dimensions of the source frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LandmarkFrame {
    pub landmarks: Option<HandLandmarks>,
    pub width: u32,
    pub height: u32,
}

impl LandmarkFrame {
    pub fn hand(landmarks: HandLandmarks, width: u32, height: u32) -> Self {
        Self {
            landmarks: Some(landmarks),
            width,
            height,
        }
    }

    pub fn no_hand(width: u32, height: u32) -> Self {
        Self {
            landmarks: None,
            width,
            height,
        }
    }
}

/// Wire/replay representation: `landmarks` is a list so the count can be
/// validated instead of rejected by the deserializer with an opaque message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LandmarkRecord {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub landmarks: Option<Vec<Keypoint>>,
}

impl LandmarkRecord {
    pub fn into_frame(self) -> Result<LandmarkFrame> {
        if self.width == 0 || self.height == 0 {
            return Err(anyhow!(
                "frame dimensions must be positive, got {}x{}",
                self.width,
                self.height
            ));
        }
        let landmarks = self.landmarks.map(HandLandmarks::from_points).transpose()?;
        Ok(LandmarkFrame {
            landmarks,
            width: self.width,
            height: self.height,
        })
    }
}

impl From<&LandmarkFrame> for LandmarkRecord {
    fn from(frame: &LandmarkFrame) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            landmarks: frame.landmarks.map(|hand| hand.points().to_vec()),
        }
    }
}

/// Hand with every keypoint at the same position, then adjusted by the caller.
/// Handy for building synthetic poses.
pub fn open_hand_at(x: f32, y: f32) -> HandLandmarks {
    let mut points = [Keypoint::new(x, y, 0.0); LANDMARK_COUNT];
    // Spread the fingertips away from the wrist so the pose is not a pinch.
    points[THUMB_CMC] = Keypoint::new(x - 0.03, y - 0.02, 0.0);
    points[THUMB_MCP] = Keypoint::new(x - 0.06, y - 0.04, 0.0);
    points[THUMB_IP] = Keypoint::new(x - 0.08, y - 0.06, 0.0);
    points[THUMB_TIP] = Keypoint::new(x - 0.10, y - 0.08, 0.0);
    points[INDEX_MCP] = Keypoint::new(x - 0.01, y - 0.08, 0.0);
    points[INDEX_PIP] = Keypoint::new(x - 0.01, y - 0.12, 0.0);
    points[INDEX_DIP] = Keypoint::new(x - 0.01, y - 0.15, 0.0);
    points[INDEX_TIP] = Keypoint::new(x - 0.01, y - 0.18, 0.0);
    for (offset, base) in [(0.01f32, 9usize), (0.03, 13), (0.05, 17)] {
        for joint in 0..4 {
            points[base + joint] =
                Keypoint::new(x + offset, y - 0.08 - 0.03 * joint as f32, 0.0);
        }
    }
    HandLandmarks::new(points)
}

/// Same as `open_hand_at`, with the index tip pulled onto the thumb tip.
pub fn pinched_hand_at(x: f32, y: f32) -> HandLandmarks {
    let mut points = *open_hand_at(x, y).points();
    let thumb = points[THUMB_TIP];
    points[INDEX_TIP] = Keypoint::new(thumb.x + 0.01, thumb.y + 0.01, thumb.z);
    HandLandmarks::new(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_points_rejects_wrong_count() {
        let short = vec![[0.5f32, 0.5, 0.0]; 20];
        let err = HandLandmarks::from_points(short).unwrap_err();
        assert!(err.to_string().contains("exactly 21"));

        let long = vec![[0.5f32, 0.5, 0.0]; 22];
        assert!(HandLandmarks::from_points(long).is_err());
    }

    #[test]
    fn from_points_keeps_anatomical_order() {
        let points: Vec<[f32; 3]> = (0..LANDMARK_COUNT)
            .map(|i| [i as f32 / 100.0, 0.0, 0.0])
            .collect();
        let hand = HandLandmarks::from_points(points).expect("21 points");
        assert_eq!(hand.wrist().x, 0.0);
        assert_eq!(hand.thumb_tip().x, 0.04);
        assert_eq!(hand.index_tip().x, 0.08);
        assert_eq!(hand[20].x, 0.20);
    }

    #[test]
    fn pinch_distance_ignores_depth() {
        let mut points = [Keypoint::default(); LANDMARK_COUNT];
        points[THUMB_TIP] = Keypoint::new(0.0, 0.0, 0.0);
        points[INDEX_TIP] = Keypoint::new(0.03, 0.04, 0.9);
        let hand = HandLandmarks::new(points);
        assert!((hand.pinch_distance() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn record_parses_keypoints_as_triples() {
        let json = format!(
            r#"{{"width":640,"height":480,"landmarks":[{}]}}"#,
            vec!["[0.5,0.5,0.0]"; LANDMARK_COUNT].join(",")
        );
        let record: LandmarkRecord = serde_json::from_str(&json).expect("record");
        let frame = record.into_frame().expect("frame");
        assert_eq!(frame.width, 640);
        assert_eq!(frame.landmarks.expect("hand").wrist(), Keypoint::new(0.5, 0.5, 0.0));
    }

    #[test]
    fn record_without_landmarks_is_no_hand() {
        let record: LandmarkRecord =
            serde_json::from_str(r#"{"width":640,"height":480}"#).expect("record");
        assert_eq!(record.into_frame().expect("frame").landmarks, None);
    }

    #[test]
    fn record_rejects_zero_dimensions() {
        let record = LandmarkRecord {
            width: 0,
            height: 480,
            landmarks: None,
        };
        assert!(record.into_frame().is_err());
    }

    #[test]
    fn synthetic_poses_classify_as_expected() {
        assert!(open_hand_at(0.5, 0.5).pinch_distance() > 0.05);
        assert!(pinched_hand_at(0.5, 0.5).pinch_distance() < 0.05);
    }
}
