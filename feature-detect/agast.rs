use feature_core::{Detector, Keypoint, Raster};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::refinement::sort_by_response;
use crate::segment::{detect_segment_corners, SegmentMask, MASK_5_8, MASK_7_12, MASK_9_16};

/// Test pattern used by the adaptive segment test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AgastMask {
    /// 8-pixel ring, 5 contiguous
    Agast5_8,
    /// 12-pixel diamond, 7 contiguous
    Agast7_12d,
    /// 16-pixel circle, 9 contiguous
    #[default]
    Oast9_16,
}

impl AgastMask {
    fn mask(self) -> &'static SegmentMask {
        match self {
            AgastMask::Agast5_8 => &MASK_5_8,
            AgastMask::Agast7_12d => &MASK_7_12,
            AgastMask::Oast9_16 => &MASK_9_16,
        }
    }

    /// Keypoint diameter reported for this pattern
    fn size(self) -> f32 {
        (2 * self.mask().radius + 1) as f32
    }
}

/// AGAST corner detector
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AgastDetector {
    pub threshold: u8,
    pub nonmax_suppression: bool,
    pub mask: AgastMask,
}

impl Default for AgastDetector {
    fn default() -> Self {
        Self {
            threshold: 10,
            nonmax_suppression: true,
            mask: AgastMask::default(),
        }
    }
}

impl AgastDetector {
    pub fn with_mask(mut self, mask: AgastMask) -> Self {
        self.mask = mask;
        self
    }
}

impl Detector for AgastDetector {
    fn name(&self) -> &'static str {
        "AGAST"
    }

    fn detect(&self, image: &Raster) -> Vec<Keypoint> {
        let size = self.mask.size();
        let mut keypoints: Vec<Keypoint> =
            detect_segment_corners(image, self.threshold, self.mask.mask(), self.nonmax_suppression)
                .into_iter()
                .map(|(x, y, score)| Keypoint::new(x as f32, y as f32).with_size(size).with_response(score))
                .collect();
        sort_by_response(&mut keypoints);
        keypoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::test_images::squares_image;

    #[test]
    fn test_all_masks_find_square_corners() {
        let img = squares_image(64, 64);
        for mask in [AgastMask::Agast5_8, AgastMask::Agast7_12d, AgastMask::Oast9_16] {
            let keypoints = AgastDetector::default().with_mask(mask).detect(&img);
            assert!(!keypoints.is_empty(), "{:?} found nothing", mask);
        }
    }

    #[test]
    fn test_uniform_image() {
        let img = Raster::filled(40, 40, 90);
        assert!(AgastDetector::default().detect(&img).is_empty());
    }

    #[test]
    fn test_reported_size_follows_mask() {
        let img = squares_image(64, 64);
        let kps = AgastDetector::default().with_mask(AgastMask::Agast7_12d).detect(&img);
        assert!(kps.iter().all(|k| k.size == 5.0));
    }
}
