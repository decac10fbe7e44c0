//! CenSurE-style centre-surround detector on integral images.

use feature_core::{Detector, FloatImage, IntegralImage, Keypoint, Raster};
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::refinement::sort_by_response;

/// Inner half-widths of the bi-level box filters
const FILTER_SIZES: [usize; 7] = [1, 2, 3, 4, 6, 8, 11];

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StarDetector {
    /// Largest outer filter diameter
    pub max_size: usize,
    pub response_threshold: f32,
    /// Maximum allowed trace^2 / det ratio parameter of the gradient tensor
    pub line_threshold: f32,
    pub suppress_nonmax_size: usize,
}

impl Default for StarDetector {
    fn default() -> Self {
        Self {
            max_size: 45,
            response_threshold: 30.0,
            line_threshold: 10.0,
            suppress_nonmax_size: 5,
        }
    }
}

/// Ring mean minus inner mean, 0 where the outer box leaves the image
fn filter_response(ii: &IntegralImage, n: usize) -> FloatImage {
    let (w, h) = (ii.width(), ii.height());
    let outer = 2 * n;
    let mut out = FloatImage::zeros(w, h);
    if w <= 2 * outer || h <= 2 * outer {
        return out;
    }

    let inner_area = ((2 * n + 1) * (2 * n + 1)) as f64;
    let outer_area = ((2 * outer + 1) * (2 * outer + 1)) as f64;
    out.data.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        if y < outer || y >= h - outer {
            return;
        }
        for x in outer..w - outer {
            let (xi, yi) = (x as i64, y as i64);
            let (ni, oi) = (n as i64, outer as i64);
            let inner = ii.box_sum(xi - ni, yi - ni, xi + ni + 1, yi + ni + 1);
            let total = ii.box_sum(xi - oi, yi - oi, xi + oi + 1, yi + oi + 1);
            let ring_mean = (total - inner) / (outer_area - inner_area);
            row[x] = (ring_mean - inner / inner_area) as f32;
        }
    });
    out
}

/// Integral images of the gradient products used by line suppression
struct GradientTensor {
    xx: IntegralImage,
    yy: IntegralImage,
    xy: IntegralImage,
}

impl GradientTensor {
    fn new(img: &Raster) -> Self {
        let (gx, gy) = FloatImage::from_raster(img, 1.0).sobel();
        let (w, h) = img.dimensions();
        Self {
            xx: IntegralImage::from_values(w, h, |x, y| (gx.get(x, y) * gx.get(x, y)) as f64),
            yy: IntegralImage::from_values(w, h, |x, y| (gy.get(x, y) * gy.get(x, y)) as f64),
            xy: IntegralImage::from_values(w, h, |x, y| (gx.get(x, y) * gy.get(x, y)) as f64),
        }
    }

    /// True when the window looks like an edge rather than a blob
    fn is_line(&self, x: usize, y: usize, radius: usize, line_threshold: f32) -> bool {
        let (x0, y0) = (x as i64 - radius as i64, y as i64 - radius as i64);
        let (x1, y1) = (x as i64 + radius as i64 + 1, y as i64 + radius as i64 + 1);
        let a = self.xx.box_sum(x0, y0, x1, y1);
        let b = self.yy.box_sum(x0, y0, x1, y1);
        let c = self.xy.box_sum(x0, y0, x1, y1);
        let det = a * b - c * c;
        if det <= 0.0 {
            return true;
        }
        let r = line_threshold as f64;
        (a + b) * (a + b) / det > (r + 1.0) * (r + 1.0) / r
    }
}

impl StarDetector {
    fn sizes(&self) -> Vec<usize> {
        FILTER_SIZES
            .iter()
            .copied()
            .filter(|&n| 4 * n + 1 <= self.max_size)
            .collect()
    }

    fn is_extremum(&self, responses: &[FloatImage], s: usize, x: usize, y: usize) -> bool {
        let v = responses[s].get(x, y);
        let radius = (self.suppress_nonmax_size / 2).max(1) as i32;
        let lo = s.saturating_sub(1);
        let hi = (s + 1).min(responses.len() - 1);
        for (k, layer) in responses.iter().enumerate().take(hi + 1).skip(lo) {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if k == s && dx == 0 && dy == 0 {
                        continue;
                    }
                    let n = layer.get_clamped(x as i32 + dx, y as i32 + dy);
                    let dominated = if v > 0.0 { n > v } else { n < v };
                    // Plateaus keep the finest scale
                    let tied = n == v && (k < s || (k == s && (dy, dx) < (0, 0)));
                    if dominated || tied {
                        return false;
                    }
                }
            }
        }
        true
    }
}

impl Detector for StarDetector {
    fn name(&self) -> &'static str {
        "Star"
    }

    fn detect(&self, image: &Raster) -> Vec<Keypoint> {
        let sizes = self.sizes();
        if sizes.is_empty() {
            return Vec::new();
        }
        let ii = IntegralImage::from_raster(image);
        let responses: Vec<FloatImage> = sizes.par_iter().map(|&n| filter_response(&ii, n)).collect();
        let tensor = GradientTensor::new(image);
        let (w, h) = image.dimensions();

        let mut keypoints = Vec::new();
        for (s, &n) in sizes.iter().enumerate() {
            for y in 0..h {
                for x in 0..w {
                    let v = responses[s].get(x, y);
                    if v.abs() <= self.response_threshold || !self.is_extremum(&responses, s, x, y) {
                        continue;
                    }
                    if tensor.is_line(x, y, 2 * n, self.line_threshold) {
                        continue;
                    }
                    keypoints.push(
                        Keypoint::new(x as f32, y as f32)
                            .with_size((4 * n + 1) as f32)
                            .with_response(v.abs())
                            .with_octave(s as i32),
                    );
                }
            }
        }

        sort_by_response(&mut keypoints);
        keypoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob_image() -> Raster {
        Raster::from_fn(64, 64, |x, y| {
            if x.abs_diff(32) <= 4 && y.abs_diff(32) <= 4 {
                220
            } else {
                40
            }
        })
    }

    #[test]
    fn test_filter_response_sign() {
        let ii = IntegralImage::from_raster(&blob_image());
        let r = filter_response(&ii, 4);
        assert!((r.get(32, 32) + 180.0).abs() < 1e-3);
        assert_eq!(r.get(2, 2), 0.0);
    }

    #[test]
    fn test_detects_blob_center() {
        let keypoints = StarDetector::default().detect(&blob_image());
        assert!(!keypoints.is_empty());
        let best = &keypoints[0];
        assert!((best.x - 32.0).abs() <= 2.0 && (best.y - 32.0).abs() <= 2.0);
    }

    #[test]
    fn test_edges_are_suppressed() {
        let img = Raster::from_fn(64, 64, |x, _| if x < 32 { 30 } else { 200 });
        assert!(StarDetector::default().detect(&img).is_empty());
    }

    #[test]
    fn test_sizes_limited_by_max_size() {
        let star = StarDetector {
            max_size: 17,
            ..Default::default()
        };
        assert_eq!(star.sizes(), vec![1, 2, 3, 4]);
    }
}
