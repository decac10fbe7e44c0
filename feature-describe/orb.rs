use feature_core::{Described, DescriptorLayout, Descriptor, Keypoint, Raster};
use once_cell::sync::Lazy;

use crate::sampling::{describe_binary, gaussian_pairs, pack_bits, smooth, Frame};

const DESCRIPTOR_SIZE: usize = 32;
const PATCH_SIZE: f32 = 31.0;

static PAIRS: Lazy<Vec<[f32; 4]>> = Lazy::new(|| {
    let half = (PATCH_SIZE / 2.0).floor();
    gaussian_pairs(DESCRIPTOR_SIZE * 8, PATCH_SIZE / 5.0, half, 31)
});

/// Steered BRIEF (rBRIEF) over a Gaussian-smoothed image
#[derive(Debug, Clone)]
pub struct OrbDescriptor {
    pub blur_sigma: f32,
}

impl Default for OrbDescriptor {
    fn default() -> Self {
        Self { blur_sigma: 2.0 }
    }
}

impl OrbDescriptor {
    /// Pattern scale for a keypoint, never smaller than the base patch
    fn pattern_scale(kp: &Keypoint) -> f32 {
        (kp.size / PATCH_SIZE).max(1.0)
    }
}

impl Descriptor for OrbDescriptor {
    fn name(&self) -> &'static str {
        "ORB"
    }

    fn layout(&self) -> DescriptorLayout {
        DescriptorLayout::Binary { bytes: DESCRIPTOR_SIZE }
    }

    fn describe(&self, image: &Raster, keypoints: &[Keypoint]) -> Described {
        let smoothed = smooth(image, self.blur_sigma);

        describe_binary(keypoints, DESCRIPTOR_SIZE, |kp| {
            let scale = Self::pattern_scale(kp);
            // rotated pattern must stay inside the image
            let reach = (PATCH_SIZE / 2.0) * std::f32::consts::SQRT_2 * scale + 1.0;
            if !image.contains_patch(kp.x, kp.y, reach) {
                return None;
            }
            let frame = Frame::new(kp, scale, true);
            let bits = PAIRS.iter().map(|&[x1, y1, x2, y2]| {
                let (ax, ay) = frame.map(x1, y1);
                let (bx, by) = frame.map(x2, y2);
                smoothed.bilinear(ax, ay) < smoothed.bilinear(bx, by)
            });
            Some(pack_bits(bits, DESCRIPTOR_SIZE))
        })
    }
}
