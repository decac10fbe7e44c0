use feature_core::{Detector, Keypoint, Raster};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::nonlinear::{NonlinearParams, NonlinearScaleSpace};

/// KAZE detector: nonlinear scale space kept at full resolution
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KazeDetector {
    pub params: NonlinearParams,
}

impl Default for KazeDetector {
    fn default() -> Self {
        Self {
            params: NonlinearParams {
                downsample: false,
                ..NonlinearParams::default()
            },
        }
    }
}

impl KazeDetector {
    pub fn scale_space(&self) -> NonlinearScaleSpace {
        NonlinearScaleSpace::new(self.params.clone())
    }
}

impl Detector for KazeDetector {
    fn name(&self) -> &'static str {
        "KAZE"
    }

    fn detect(&self, image: &Raster) -> Vec<Keypoint> {
        self.scale_space().detect(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nonlinear::test_support::blob_image;

    #[test]
    fn test_defaults() {
        let kaze = KazeDetector::default();
        assert_eq!(kaze.params.octaves, 4);
        assert_eq!(kaze.params.sublevels, 4);
        assert_eq!(kaze.params.threshold, 0.001);
        assert!(!kaze.params.downsample);
    }

    #[test]
    fn test_keypoints_carry_scale_and_orientation() {
        let keypoints = KazeDetector::default().detect(&blob_image(64, 64));
        assert!(!keypoints.is_empty());
        for kp in &keypoints {
            assert!(kp.size > 0.0);
            assert!(kp.angle.is_finite());
            assert!(kp.response > 0.001);
        }
    }
}
