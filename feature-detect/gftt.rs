use feature_core::{Detector, Keypoint, Raster};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::refinement::{local_maxima_3x3, non_maximum_suppression};
use crate::structure::StructureTensor;

/// Good-features-to-track corner detector (Shi-Tomasi, optionally Harris)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GfttDetector {
    pub max_corners: usize,
    /// Fraction of the strongest response a corner must reach
    pub quality_level: f32,
    pub min_distance: f32,
    pub block_size: usize,
    pub use_harris: bool,
    pub k: f32,
}

impl Default for GfttDetector {
    fn default() -> Self {
        Self {
            max_corners: 1000,
            quality_level: 0.01,
            min_distance: 1.0,
            block_size: 3,
            use_harris: false,
            k: 0.04,
        }
    }
}

impl Detector for GfttDetector {
    fn name(&self) -> &'static str {
        "GFTT"
    }

    fn detect(&self, image: &Raster) -> Vec<Keypoint> {
        let tensor = StructureTensor::compute(image, self.block_size);
        let response = if self.use_harris { tensor.harris(self.k) } else { tensor.min_eigen() };

        let max = response.max_value();
        if max <= 0.0 {
            return Vec::new();
        }

        let threshold = max * self.quality_level;
        let candidates: Vec<Keypoint> = local_maxima_3x3(&response.data, response.width, response.height, threshold)
            .into_iter()
            .map(|(x, y, r)| {
                Keypoint::new(x as f32, y as f32)
                    .with_size(self.block_size as f32)
                    .with_response(r)
            })
            .collect();

        let mut corners = non_maximum_suppression(&candidates, self.min_distance);
        if self.max_corners > 0 {
            corners.truncate(self.max_corners);
        }
        corners
    }
}
