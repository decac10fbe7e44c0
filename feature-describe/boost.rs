//! Boosted gradient descriptor (BinBoost-style, 256 bits).
//!
//! The keypoint neighbourhood is resampled to a 32x32 patch aligned with
//! the keypoint orientation. Every bit is the sign of a weighted sum of weak
//! learners, each pooling one gradient orientation channel over a
//! rectangle of the patch.

use feature_core::{Described, DescriptorLayout, Descriptor, FloatImage, IntegralImage, Keypoint, Raster};
use once_cell::sync::Lazy;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::sampling::{describe_binary, pack_bits, smooth, Frame, OrientationMaps};

const DESCRIPTOR_SIZE: usize = 32;
const PATCH: usize = 32;
const ORIENTATION_BINS: usize = 8;
const LEARNERS_PER_BIT: usize = 4;

#[derive(Debug, Clone, Copy)]
struct WeakLearner {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
    bin: usize,
    weight: f32,
}

static LEARNERS: Lazy<Vec<[WeakLearner; LEARNERS_PER_BIT]>> = Lazy::new(|| {
    let mut rng = StdRng::seed_from_u64(0xB005);
    let mut learner = |sign: f32| {
        let w = rng.gen_range(4..=16i64);
        let h = rng.gen_range(4..=16i64);
        let x0 = rng.gen_range(0..=(PATCH as i64 - w));
        let y0 = rng.gen_range(0..=(PATCH as i64 - h));
        WeakLearner {
            x0,
            y0,
            x1: x0 + w,
            y1: y0 + h,
            bin: rng.gen_range(0..ORIENTATION_BINS),
            weight: sign,
        }
    };
    (0..DESCRIPTOR_SIZE * 8)
        .map(|_| [learner(1.0), learner(-1.0), learner(1.0), learner(-1.0)])
        .collect()
});

#[derive(Debug, Clone)]
pub struct BoostDescriptor {
    pub use_scale_orientation: bool,
    /// Patch side in image pixels per unit of keypoint size
    pub scale_factor: f32,
}

impl Default for BoostDescriptor {
    fn default() -> Self {
        Self {
            use_scale_orientation: true,
            scale_factor: 1.5,
        }
    }
}

impl BoostDescriptor {
    fn patch_scale(&self, kp: &Keypoint) -> f32 {
        if self.use_scale_orientation {
            (kp.size * self.scale_factor / PATCH as f32).max(1.0)
        } else {
            1.0
        }
    }

    /// Orientation channels of the resampled patch, as integral images
    fn pooled_channels(smoothed: &FloatImage, frame: &Frame) -> Vec<IntegralImage> {
        let half = PATCH as f32 / 2.0;
        let mut patch = FloatImage::zeros(PATCH, PATCH);
        for y in 0..PATCH {
            for x in 0..PATCH {
                let (sx, sy) = frame.map(x as f32 + 0.5 - half, y as f32 + 0.5 - half);
                patch.data[y * PATCH + x] = smoothed.bilinear(sx, sy);
            }
        }
        OrientationMaps::compute(&patch, ORIENTATION_BINS)
            .bins
            .iter()
            .map(IntegralImage::from_float)
            .collect()
    }
}

impl Descriptor for BoostDescriptor {
    fn name(&self) -> &'static str {
        "BoostDesc"
    }

    fn layout(&self) -> DescriptorLayout {
        DescriptorLayout::Binary { bytes: DESCRIPTOR_SIZE }
    }

    fn describe(&self, image: &Raster, keypoints: &[Keypoint]) -> Described {
        let smoothed = smooth(image, 1.0);

        describe_binary(keypoints, DESCRIPTOR_SIZE, |kp| {
            let frame = Frame::new(kp, self.patch_scale(kp), self.use_scale_orientation);
            let channels = Self::pooled_channels(&smoothed, &frame);
            let bits = LEARNERS.iter().map(|learners| {
                let response: f32 = learners
                    .iter()
                    .map(|l| l.weight * channels[l.bin].box_mean(l.x0, l.y0, l.x1, l.y1) as f32)
                    .sum();
                response > 0.0
            });
            Some(pack_bits(bits, DESCRIPTOR_SIZE))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::test_support::{hamming, texture};

    #[test]
    fn test_learners_inside_patch() {
        assert_eq!(LEARNERS.len(), 256);
        for learner in LEARNERS.iter().flatten() {
            assert!(learner.x0 >= 0 && learner.x1 <= PATCH as i64);
            assert!(learner.y0 >= 0 && learner.y1 <= PATCH as i64);
            assert!(learner.bin < ORIENTATION_BINS);
        }
    }

    #[test]
    fn test_keeps_every_keypoint() {
        let img = texture(64, 64, (0, 0));
        let kps = vec![Keypoint::new(0.0, 0.0), Keypoint::new(32.0, 32.0), Keypoint::new(63.0, 10.0)];
        let d = BoostDescriptor::default().describe(&img, &kps);
        assert_eq!(d.keypoints, kps);
        assert_eq!(d.descriptors.rows(), 3);
    }

    #[test]
    fn test_flat_patch_has_no_bits_set() {
        let d = BoostDescriptor::default().describe(&Raster::filled(64, 64, 90), &[Keypoint::new(32.0, 32.0)]);
        assert_eq!(d.descriptors.binary_row(0), Some(&[0u8; 32][..]));
    }

    #[test]
    fn test_different_content_differs() {
        let img = texture(128, 128, (0, 0));
        let kps = vec![Keypoint::new(40.0, 40.0), Keypoint::new(90.0, 80.0)];
        let d = BoostDescriptor::default().describe(&img, &kps);
        let (Some(a), Some(b)) = (d.descriptors.binary_row(0), d.descriptors.binary_row(1)) else {
            panic!("both keypoints should be described");
        };
        assert!(hamming(a, b) > 20);
    }
}
