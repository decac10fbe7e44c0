//! Maximal self-dissimilarity detector.
//!
//! A pixel is salient when even its most similar neighbouring patches differ
//! strongly from the patch centred on it. Patch distances for one search
//! offset at a time come from an integral image of squared differences, so
//! memory stays at one table plus the running k-smallest lists.

use feature_core::{Detector, FloatImage, IntegralImage, Keypoint, Raster};
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::refinement::sort_by_response;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MsdDetector {
    pub patch_radius: usize,
    pub search_radius: usize,
    /// Number of most similar patches averaged into the saliency
    pub knn: usize,
    pub threshold: f32,
    pub nms_radius: usize,
}

impl Default for MsdDetector {
    fn default() -> Self {
        Self {
            patch_radius: 3,
            search_radius: 5,
            knn: 4,
            threshold: 250.0,
            nms_radius: 5,
        }
    }
}

/// Insert `value` into an ascending list, dropping the largest entry
#[inline]
fn insert_smallest(list: &mut [f32], value: f32) {
    let Some(last) = list.last_mut() else {
        return;
    };
    if value >= *last {
        return;
    }
    *last = value;
    let mut i = list.len() - 1;
    while i > 0 && list[i - 1] > list[i] {
        list.swap(i - 1, i);
        i -= 1;
    }
}

impl MsdDetector {
    fn border(&self) -> usize {
        self.patch_radius + self.search_radius
    }

    /// Mean of the `knn` smallest patch distances, 0 outside the valid area
    pub fn saliency_map(&self, img: &Raster) -> FloatImage {
        let (w, h) = img.dimensions();
        let border = self.border();
        let k = self.knn.max(1);
        let mut saliency = FloatImage::zeros(w, h);
        if w <= 2 * border || h <= 2 * border {
            return saliency;
        }

        let pr = self.patch_radius as i64;
        let sr = self.search_radius as i32;
        let mut nearest = vec![f32::MAX; w * h * k];

        for dy in -sr..=sr {
            for dx in -sr..=sr {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let diff = IntegralImage::from_values(w, h, |x, y| {
                    let p = img.get(x, y) as f64;
                    let q = img.get_clamped(x as i32 + dx, y as i32 + dy) as f64;
                    (p - q) * (p - q)
                });
                nearest.par_chunks_mut(w * k).enumerate().for_each(|(y, row)| {
                    if y < border || y >= h - border {
                        return;
                    }
                    let yi = y as i64;
                    for x in border..w - border {
                        let xi = x as i64;
                        let ssd = diff.box_sum(xi - pr, yi - pr, xi + pr + 1, yi + pr + 1) as f32;
                        insert_smallest(&mut row[x * k..(x + 1) * k], ssd);
                    }
                });
            }
        }

        saliency.data.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
            if y < border || y >= h - border {
                return;
            }
            for x in border..w - border {
                let start = (y * w + x) * k;
                row[x] = nearest[start..start + k].iter().sum::<f32>() / k as f32;
            }
        });
        saliency
    }

    fn is_local_max(&self, saliency: &FloatImage, x: usize, y: usize) -> bool {
        let s = saliency.get(x, y);
        let r = self.nms_radius as i32;
        for dy in -r..=r {
            for dx in -r..=r {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let n = saliency.get_clamped(x as i32 + dx, y as i32 + dy);
                let before = dy < 0 || (dy == 0 && dx < 0);
                if n > s || (before && n == s) {
                    return false;
                }
            }
        }
        true
    }
}

impl Detector for MsdDetector {
    fn name(&self) -> &'static str {
        "MSD"
    }

    fn detect(&self, image: &Raster) -> Vec<Keypoint> {
        let saliency = self.saliency_map(image);
        let size = (2 * self.search_radius + 1) as f32;
        let (w, h) = image.dimensions();

        let mut keypoints: Vec<Keypoint> = (0..h)
            .into_par_iter()
            .flat_map_iter(|y| {
                let saliency = &saliency;
                (0..w).filter_map(move |x| {
                    let s = saliency.get(x, y);
                    if s > self.threshold && self.is_local_max(saliency, x, y) {
                        Some(Keypoint::new(x as f32, y as f32).with_size(size).with_response(s))
                    } else {
                        None
                    }
                })
            })
            .collect();
        sort_by_response(&mut keypoints);
        keypoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_smallest() {
        let mut list = [f32::MAX; 3];
        for v in [5.0, 1.0, 9.0, 3.0, 0.5] {
            insert_smallest(&mut list, v);
        }
        assert_eq!(list, [0.5, 1.0, 3.0]);
    }

    #[test]
    fn test_uniform_image_not_salient() {
        let img = Raster::filled(40, 40, 120);
        let detector = MsdDetector::default();
        assert!(detector.saliency_map(&img).data.iter().all(|&s| s == 0.0));
        assert!(detector.detect(&img).is_empty());
    }

    #[test]
    fn test_isolated_dot_is_salient() {
        let img = Raster::from_fn(64, 64, |x, y| {
            if x.abs_diff(32) <= 1 && y.abs_diff(32) <= 1 {
                200
            } else {
                0
            }
        });
        let keypoints = MsdDetector::default().detect(&img);
        assert!(!keypoints.is_empty());
        let best = &keypoints[0];
        assert!((best.x - 32.0).abs() <= 4.0 && (best.y - 32.0).abs() <= 4.0);
        assert!(keypoints.iter().all(|k| k.response > 250.0));
    }

    #[test]
    fn test_small_image() {
        let img = Raster::filled(10, 10, 3);
        assert!(MsdDetector::default().detect(&img).is_empty());
    }
}
