use feature_core::{Detector, Keypoint, Raster};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::refinement::sort_by_response;
use crate::segment::{detect_segment_corners, MASK_9_16};

/// FAST-9 corner detector on the 16-pixel Bresenham circle
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FastDetector {
    pub threshold: u8,
    pub nonmax_suppression: bool,
}

impl Default for FastDetector {
    fn default() -> Self {
        Self {
            threshold: 10,
            nonmax_suppression: true,
        }
    }
}

impl FastDetector {
    pub fn new(threshold: u8, nonmax_suppression: bool) -> Self {
        Self {
            threshold,
            nonmax_suppression,
        }
    }
}

impl Detector for FastDetector {
    fn name(&self) -> &'static str {
        "FAST"
    }

    fn detect(&self, image: &Raster) -> Vec<Keypoint> {
        let mut keypoints: Vec<Keypoint> =
            detect_segment_corners(image, self.threshold, &MASK_9_16, self.nonmax_suppression)
                .into_iter()
                .map(|(x, y, score)| Keypoint::new(x as f32, y as f32).with_response(score))
                .collect();
        sort_by_response(&mut keypoints);
        keypoints
    }
}
