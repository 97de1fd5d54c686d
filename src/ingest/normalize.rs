use anyhow::{anyhow, Result};

use crate::landmarks::{HandLandmarks, Keypoint, LandmarkFrame};

/// Raw output of a hand-pose model for one frame.
#[derive(Clone, Debug, Default)]
pub struct PoseEstimate {
    pub width: u32,
    pub height: u32,
    /// One keypoint list per detected hand, in model order.
    pub hands: Vec<Vec<Keypoint>>,
}

/// External hand-pose estimation service.
///
/// Implementations receive the pixel slice for the duration of the call only
/// and return normalized keypoints.
pub trait PoseEstimator: Send {
    /// Estimator identifier.
    fn name(&self) -> &'static str;

    /// Run hand-landmark estimation on an RGB frame.
    fn estimate(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<PoseEstimate>;
}

/// Turn a pose estimate into a recognizer frame.
///
/// Only the first detected hand is used. A hand with a keypoint count other
/// than 21 is a contract violation and fails the frame.
pub fn normalize_estimate(estimate: PoseEstimate) -> Result<LandmarkFrame> {
    if estimate.width == 0 || estimate.height == 0 {
        return Err(anyhow!(
            "pose estimate has invalid dimensions {}x{}",
            estimate.width,
            estimate.height
        ));
    }
    let hand = estimate.hands.into_iter().next();
    let landmarks = hand.map(HandLandmarks::from_points).transpose()?;
    Ok(LandmarkFrame {
        landmarks,
        width: estimate.width,
        height: estimate.height,
    })
}

/// Pixel frame in, landmark frame out.
pub struct LandmarkNormalizer<E: PoseEstimator> {
    estimator: E,
}

impl<E: PoseEstimator> LandmarkNormalizer<E> {
    pub fn new(estimator: E) -> Self {
        Self { estimator }
    }

    pub fn process(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<LandmarkFrame> {
        let estimate = self.estimator.estimate(pixels, width, height)?;
        normalize_estimate(estimate).map_err(|e| {
            anyhow!("estimator {} violated landmark contract: {}", self.estimator.name(), e)
        })
    }
}
