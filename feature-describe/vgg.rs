//! VGG-style pooled gradient descriptor (120 floats).
//!
//! Gradient orientations of a 64x64 resampled patch are pooled into 15
//! Gaussian regions (a centre disc plus two rings of seven sectors), each
//! holding an 8-bin histogram. The vector is L2 normalised, clipped and
//! renormalised.

use feature_core::{Described, DescriptorLayout, Descriptor, FloatImage, Keypoint, Raster};
use once_cell::sync::Lazy;
use std::f32::consts::PI;

use crate::sampling::{describe_float, l2_normalize, smooth, Frame, OrientationMaps};

const PATCH: usize = 64;
const BINS: usize = 8;
const SECTORS: usize = 7;
const DESCRIPTOR_LEN: usize = (1 + 2 * SECTORS) * BINS;

/// Pooling region centres and spreads in patch coordinates
static REGIONS: Lazy<Vec<(f32, f32, f32)>> = Lazy::new(|| {
    let mut regions = vec![(0.0, 0.0, 6.0)];
    for (radius, sigma) in [(14.0f32, 6.0f32), (26.0, 8.0)] {
        for s in 0..SECTORS {
            let theta = 2.0 * PI * s as f32 / SECTORS as f32;
            regions.push((radius * theta.cos(), radius * theta.sin(), sigma));
        }
    }
    regions
});

#[derive(Debug, Clone)]
pub struct VggDescriptor {
    /// Patch side in image pixels per unit of keypoint size
    pub scale_factor: f32,
    pub use_scale_orientation: bool,
    pub clip: f32,
}

impl Default for VggDescriptor {
    fn default() -> Self {
        Self {
            scale_factor: 0.75,
            use_scale_orientation: true,
            clip: 0.2,
        }
    }
}

impl VggDescriptor {
    fn sample_patch(&self, smoothed: &FloatImage, kp: &Keypoint) -> FloatImage {
        let scale = if self.use_scale_orientation {
            (kp.size * self.scale_factor * 6.0 / PATCH as f32).max(0.5)
        } else {
            1.0
        };
        let frame = Frame::new(kp, scale, self.use_scale_orientation);
        let half = PATCH as f32 / 2.0;
        let mut patch = FloatImage::zeros(PATCH, PATCH);
        for y in 0..PATCH {
            for x in 0..PATCH {
                let (sx, sy) = frame.map(x as f32 + 0.5 - half, y as f32 + 0.5 - half);
                patch.data[y * PATCH + x] = smoothed.bilinear(sx, sy);
            }
        }
        patch
    }

    fn pool(maps: &OrientationMaps) -> Vec<f32> {
        let half = PATCH as f32 / 2.0;
        let mut row = vec![0.0f32; DESCRIPTOR_LEN];
        for (r, &(cx, cy, sigma)) in REGIONS.iter().enumerate() {
            let inv = 1.0 / (2.0 * sigma * sigma);
            for y in 0..PATCH {
                for x in 0..PATCH {
                    let dx = x as f32 + 0.5 - half - cx;
                    let dy = y as f32 + 0.5 - half - cy;
                    let weight = (-(dx * dx + dy * dy) * inv).exp();
                    if weight < 1e-3 {
                        continue;
                    }
                    for (b, channel) in maps.bins.iter().enumerate() {
                        row[r * BINS + b] += weight * channel.data[y * PATCH + x];
                    }
                }
            }
        }
        row
    }
}

impl Descriptor for VggDescriptor {
    fn name(&self) -> &'static str {
        "VGG"
    }

    fn layout(&self) -> DescriptorLayout {
        DescriptorLayout::Float { len: DESCRIPTOR_LEN }
    }

    fn describe(&self, image: &Raster, keypoints: &[Keypoint]) -> Described {
        let smoothed = smooth(image, 1.0);

        describe_float(keypoints, DESCRIPTOR_LEN, |kp| {
            let patch = self.sample_patch(&smoothed, kp);
            let mut row = Self::pool(&OrientationMaps::compute(&patch, BINS));
            l2_normalize(&mut row);
            row.iter_mut().for_each(|v| *v = v.min(self.clip));
            l2_normalize(&mut row);
            Some(row)
        })
    }
}
