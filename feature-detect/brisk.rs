use feature_core::{Detector, FloatImage, Keypoint, Raster};
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::refinement::{local_maxima_3x3, refine_subpixel, sort_by_response};
use crate::segment::{segment_score_map, MASK_9_16};

/// Diameter of a keypoint found on the base layer
const BASIC_SIZE: f32 = 12.0;

/// BRISK scale-space corner detector
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BriskDetector {
    pub threshold: u8,
    pub octaves: usize,
}

impl Default for BriskDetector {
    fn default() -> Self {
        Self {
            threshold: 30,
            octaves: 3,
        }
    }
}

/// One octave or intra-octave layer with its FAST score map
struct Layer {
    scale: f32,
    scores: FloatImage,
}

impl Layer {
    fn new(img: &Raster, scale: f32, threshold: u8) -> Self {
        let (w, h) = img.dimensions();
        Self {
            scale,
            scores: FloatImage {
                data: segment_score_map(img, threshold, &MASK_9_16),
                width: w,
                height: h,
            },
        }
    }

    /// Largest score in the 3x3 window around the point mapped from `other`
    fn max_around(&self, x: f32, y: f32, other_scale: f32) -> f32 {
        let ratio = other_scale / self.scale;
        let cx = (x * ratio).round() as i32;
        let cy = (y * ratio).round() as i32;
        let mut best = 0.0f32;
        for dy in -1..=1 {
            for dx in -1..=1 {
                best = best.max(self.scores.get_clamped(cx + dx, cy + dy));
            }
        }
        best
    }
}

impl BriskDetector {
    /// Octaves c_i at 2^i and intra-octaves d_i at 1.5 * 2^i, ordered by scale
    fn build_layers(&self, image: &Raster) -> Vec<Layer> {
        let (w, h) = image.dimensions();
        let mut specs: Vec<f32> = Vec::with_capacity(self.octaves * 2);
        for i in 0..self.octaves {
            let octave = (1u32 << i) as f32;
            specs.push(octave);
            specs.push(octave * 1.5);
        }

        specs
            .into_par_iter()
            .filter_map(|scale| {
                let lw = (w as f32 / scale).round() as usize;
                let lh = (h as f32 / scale).round() as usize;
                if lw < 7 || lh < 7 {
                    return None;
                }
                let level = if scale == 1.0 { image.clone() } else { image.resized(lw, lh) };
                Some(Layer::new(&level, scale, self.threshold))
            })
            .collect()
    }
}

impl Detector for BriskDetector {
    fn name(&self) -> &'static str {
        "BRISK"
    }

    fn detect(&self, image: &Raster) -> Vec<Keypoint> {
        let layers = self.build_layers(image);
        let mut keypoints = Vec::new();

        for (i, layer) in layers.iter().enumerate() {
            let peaks = local_maxima_3x3(&layer.scores.data, layer.scores.width, layer.scores.height, 0.0);
            for (x, y, score) in peaks {
                let (fx, fy) = (x as f32, y as f32);
                let below = i.checked_sub(1).map(|j| layers[j].max_around(fx, fy, layer.scale));
                let above = layers.get(i + 1).map(|l| l.max_around(fx, fy, layer.scale));
                if below.is_some_and(|s| s > score) || above.is_some_and(|s| s > score) {
                    continue;
                }

                let (rx, ry) = refine_subpixel(&layer.scores, x, y);
                keypoints.push(Keypoint {
                    x: rx * layer.scale,
                    y: ry * layer.scale,
                    size: BASIC_SIZE * layer.scale,
                    angle: 0.0,
                    response: score,
                    octave: i as i32,
                });
            }
        }

        sort_by_response(&mut keypoints);
        keypoints
    }
}
