//! M-SURF descriptor (64 floats) on the KAZE nonlinear scale space.
//!
//! A 24s x 24s window around the keypoint is split into 4x4 overlapping
//! subregions. Each subregion sums the Gaussian-weighted, frame-aligned
//! first derivatives as (dx, dy, |dx|, |dy|); the subregion vectors are
//! weighted again by their distance to the centre and the whole row is L2
//! normalised.

use feature_core::{Described, DescriptorLayout, Descriptor, Keypoint, Raster};
use feature_detect::nonlinear::{keypoint_sigma, nearest_level, Evolution};
use feature_detect::KazeDetector;
use log::debug;

use crate::sampling::{describe_float, l2_normalize, Frame};

const DESCRIPTOR_LEN: usize = 64;
/// Subregion centres in units of the level sigma
const CENTRES: [f32; 4] = [-7.5, -2.5, 2.5, 7.5];
/// Samples per subregion side, spaced one sigma apart
const SAMPLES: i32 = 9;

#[derive(Debug, Clone, Default)]
pub struct KazeDescriptor {
    pub detector: KazeDetector,
}

fn gaussian(dx: f32, dy: f32, sigma: f32) -> f32 {
    (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()
}

fn msurf_row(ev: &Evolution, kp: &Keypoint) -> Vec<f32> {
    let (lx, ly) = ev.to_level(kp.x, kp.y);
    let s = ev.level_sigma().max(1.0);
    let frame = Frame::with_angle(&Keypoint::new(lx, ly), s, kp.angle);
    let img = &ev.image;

    let mut row = Vec::with_capacity(DESCRIPTOR_LEN);
    for &cy in &CENTRES {
        for &cx in &CENTRES {
            let mut sums = [0.0f32; 4];
            for j in 0..SAMPLES {
                for i in 0..SAMPLES {
                    let u = cx + (i - SAMPLES / 2) as f32;
                    let v = cy + (j - SAMPLES / 2) as f32;
                    let (x, y) = frame.map(u, v);
                    let dx = 0.5 * (img.bilinear(x + s, y) - img.bilinear(x - s, y));
                    let dy = 0.5 * (img.bilinear(x, y + s) - img.bilinear(x, y - s));
                    let (rx, ry) = frame.unrotate(dx, dy);
                    let w = gaussian(u - cx, v - cy, 2.5);
                    sums[0] += w * rx;
                    sums[1] += w * ry;
                    sums[2] += w * rx.abs();
                    sums[3] += w * ry.abs();
                }
            }
            let w = gaussian(cx, cy, 1.5 * 3.3);
            row.extend(sums.iter().map(|v| v * w));
        }
    }
    l2_normalize(&mut row);
    row
}

impl Descriptor for KazeDescriptor {
    fn name(&self) -> &'static str {
        "KAZE"
    }

    fn layout(&self) -> DescriptorLayout {
        DescriptorLayout::Float { len: DESCRIPTOR_LEN }
    }

    fn describe(&self, image: &Raster, keypoints: &[Keypoint]) -> Described {
        if keypoints.is_empty() {
            return Described::empty(self.layout());
        }
        let evolutions = self.detector.scale_space().build(image);
        debug!("M-SURF: {} evolution levels", evolutions.len());

        describe_float(keypoints, DESCRIPTOR_LEN, |kp| {
            let ev = nearest_level(&evolutions, keypoint_sigma(kp))?;
            Some(msurf_row(ev, kp))
        })
    }
}
