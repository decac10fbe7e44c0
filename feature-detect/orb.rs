use feature_core::{Detector, Keypoint, Raster};
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::pyramid::{ImagePyramid, ScaleLevel};
use crate::refinement::{intensity_centroid_angle, retain_best, sort_by_response};
use crate::segment::{detect_segment_corners, MASK_9_16};
use crate::structure::harris_at;

/// Oriented FAST keypoints over a scale pyramid, ranked by Harris response
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrbDetector {
    pub n_features: usize,
    pub scale_factor: f32,
    pub n_levels: usize,
    pub edge_threshold: usize,
    pub fast_threshold: u8,
    pub patch_size: usize,
}

impl Default for OrbDetector {
    fn default() -> Self {
        Self {
            n_features: 500,
            scale_factor: 1.2,
            n_levels: 8,
            edge_threshold: 31,
            fast_threshold: 20,
            patch_size: 31,
        }
    }
}

impl OrbDetector {
    /// Share of the feature budget assigned to each level (geometric in 1/scale)
    fn features_per_level(&self, levels: usize) -> Vec<usize> {
        if levels == 0 {
            return Vec::new();
        }
        let factor = 1.0 / self.scale_factor;
        let denom = 1.0 - factor.powi(levels as i32);
        let first = if denom.abs() < f32::EPSILON {
            self.n_features as f32 / levels as f32
        } else {
            self.n_features as f32 * (1.0 - factor) / denom
        };

        let mut budget = Vec::with_capacity(levels);
        let mut assigned = 0usize;
        let mut desired = first;
        for _ in 0..levels.saturating_sub(1) {
            let n = desired.round() as usize;
            budget.push(n);
            assigned += n;
            desired *= factor;
        }
        budget.push(self.n_features.saturating_sub(assigned));
        budget
    }

    fn detect_level(&self, img: &Raster, level: &ScaleLevel, budget: usize) -> Vec<Keypoint> {
        let border = self.edge_threshold;
        let (w, h) = img.dimensions();
        if w <= 2 * border || h <= 2 * border || budget == 0 {
            return Vec::new();
        }

        let candidates: Vec<Keypoint> = detect_segment_corners(img, self.fast_threshold, &MASK_9_16, true)
            .into_iter()
            .filter(|&(x, y, _)| x >= border && y >= border && x < w - border && y < h - border)
            .map(|(x, y, _)| {
                let harris = harris_at(img, x, y, 3, 0.04);
                Keypoint::new(x as f32, y as f32).with_response(harris)
            })
            .collect();

        let radius = (self.patch_size / 2) as i32;
        retain_best(candidates, budget)
            .into_iter()
            .map(|kp| {
                let angle = intensity_centroid_angle(img, kp.x as usize, kp.y as usize, radius);
                Keypoint {
                    x: kp.x * level.scale,
                    y: kp.y * level.scale,
                    size: self.patch_size as f32 * level.scale,
                    angle,
                    response: kp.response,
                    octave: level.level as i32,
                }
            })
            .collect()
    }
}

impl Detector for OrbDetector {
    fn name(&self) -> &'static str {
        "ORB"
    }

    fn detect(&self, image: &Raster) -> Vec<Keypoint> {
        let (w, h) = image.dimensions();
        let levels = ImagePyramid::generate_scale_levels(
            w,
            h,
            self.scale_factor,
            self.n_levels,
            2 * self.edge_threshold + 1,
        );
        let pyramid = ImagePyramid::build(image, &levels);
        let budget = self.features_per_level(levels.len());

        let per_level: Vec<Vec<Keypoint>> = levels
            .par_iter()
            .zip(pyramid.par_iter())
            .zip(budget.par_iter())
            .map(|((level, img), &n)| self.detect_level(img, level, n))
            .collect();

        let mut keypoints: Vec<Keypoint> = per_level.into_iter().flatten().collect();
        sort_by_response(&mut keypoints);
        keypoints
    }
}
