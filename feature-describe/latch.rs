//! LATCH: learned arrangements of three patch codes.
//!
//! Each bit compares the sum of squared differences between an anchor
//! patch and two companion patches inside a 48x48 window.

use feature_core::{Described, DescriptorLayout, Descriptor, FloatImage, Keypoint, Raster};
use once_cell::sync::Lazy;

use crate::sampling::{describe_binary, pack_bits, uniform_points, Frame};

const DESCRIPTOR_SIZE: usize = 32;
const WINDOW: i32 = 48;

#[derive(Debug, Clone, Copy)]
struct Triplet {
    anchor: (i32, i32),
    first: (i32, i32),
    second: (i32, i32),
}

fn triplets(half_ssd: i32) -> Vec<Triplet> {
    let limit = WINDOW / 2 - half_ssd - 1;
    let points = uniform_points(DESCRIPTOR_SIZE * 8 * 3, limit, 0x1A7C);
    points
        .chunks_exact(3)
        .map(|c| Triplet {
            anchor: c[0],
            first: c[1],
            second: c[2],
        })
        .collect()
}

static TRIPLETS: Lazy<Vec<Triplet>> = Lazy::new(|| triplets(3));

#[derive(Debug, Clone)]
pub struct LatchDescriptor {
    pub rotation_invariance: bool,
    pub half_ssd_size: i32,
}

impl Default for LatchDescriptor {
    fn default() -> Self {
        Self {
            rotation_invariance: true,
            half_ssd_size: 3,
        }
    }
}

impl LatchDescriptor {
    fn ssd(img: &FloatImage, frame: &Frame, a: (i32, i32), b: (i32, i32), half: i32) -> f32 {
        let mut sum = 0.0;
        for dy in -half..=half {
            for dx in -half..=half {
                let (ax, ay) = frame.map((a.0 + dx) as f32, (a.1 + dy) as f32);
                let (bx, by) = frame.map((b.0 + dx) as f32, (b.1 + dy) as f32);
                let d = img.bilinear(ax, ay) - img.bilinear(bx, by);
                sum += d * d;
            }
        }
        sum
    }
}

impl Descriptor for LatchDescriptor {
    fn name(&self) -> &'static str {
        "LATCH"
    }

    fn layout(&self) -> DescriptorLayout {
        DescriptorLayout::Binary { bytes: DESCRIPTOR_SIZE }
    }

    fn describe(&self, image: &Raster, keypoints: &[Keypoint]) -> Described {
        let img = FloatImage::from_raster(image, 1.0);
        let half = self.half_ssd_size;
        let custom;
        let pattern: &[Triplet] = if half == 3 {
            &TRIPLETS
        } else {
            custom = triplets(half);
            &custom
        };
        let reach = (WINDOW / 2) as f32 * if self.rotation_invariance { std::f32::consts::SQRT_2 } else { 1.0 };

        describe_binary(keypoints, DESCRIPTOR_SIZE, |kp| {
            if !image.contains_patch(kp.x, kp.y, reach + 1.0) {
                return None;
            }
            let frame = Frame::new(kp, 1.0, self.rotation_invariance);
            let bits = pattern.iter().map(|t| {
                Self::ssd(&img, &frame, t.anchor, t.first, half) > Self::ssd(&img, &frame, t.anchor, t.second, half)
            });
            Some(pack_bits(bits, DESCRIPTOR_SIZE))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::test_support::{grid_keypoints, hamming, texture};

    #[test]
    fn test_triplets_inside_window() {
        assert_eq!(TRIPLETS.len(), 256);
        for t in TRIPLETS.iter() {
            for p in [t.anchor, t.first, t.second] {
                assert!(p.0.abs() <= 20 && p.1.abs() <= 20);
            }
        }
    }

    #[test]
    fn test_border_drop() {
        let img = texture(100, 100, (0, 0));
        let kps = vec![Keypoint::new(50.0, 50.0), Keypoint::new(20.0, 50.0)];
        let d = LatchDescriptor::default().describe(&img, &kps);
        assert_eq!(d.keypoints.len(), 1);
        assert!(d.is_aligned());
    }

    #[test]
    fn test_translation() {
        let a = texture(130, 130, (0, 0));
        let b = texture(130, 130, (3, 7));
        let kps_a = grid_keypoints(100, 100, 40, 10, 7.0);
        let kps_b: Vec<Keypoint> = kps_a.iter().map(|k| Keypoint::new(k.x + 3.0, k.y + 7.0)).collect();
        let da = LatchDescriptor::default().describe(&a, &kps_a);
        let db = LatchDescriptor::default().describe(&b, &kps_b);
        assert!(!da.keypoints.is_empty());
        assert_eq!(da.keypoints.len(), db.keypoints.len());
        for (ra, rb) in da.descriptors.binary_rows().zip(db.descriptors.binary_rows()) {
            assert!(hamming(ra, rb) <= 4);
        }
    }
}
