//! Modified local difference binary (M-LDB) descriptor on the AKAZE
//! nonlinear scale space.

use feature_core::{Described, DescriptorLayout, Descriptor, Keypoint, Raster};
use feature_detect::nonlinear::{keypoint_sigma, nearest_level, Evolution};
use feature_detect::AkazeDetector;
use log::debug;

use crate::sampling::{describe_binary, pack_bits, Frame};

/// 2x2, 3x3 and 4x4 grids: (6 + 36 + 120) cell pairs x 3 channels
const DESCRIPTOR_BITS: usize = 486;
const DESCRIPTOR_SIZE: usize = (DESCRIPTOR_BITS + 7) / 8;
const PATTERN_SIZE: f32 = 10.0;
const GRIDS: [usize; 3] = [2, 3, 4];
/// Samples per cell side
const CELL_SAMPLES: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct AkazeDescriptor {
    pub detector: AkazeDetector,
}

/// Mean intensity and mean frame-aligned derivatives of one grid cell
fn cell_means(ev: &Evolution, frame: &Frame, x0: f32, y0: f32, side: f32) -> [f32; 3] {
    let step = side / CELL_SAMPLES as f32;
    let mut sums = [0.0f32; 3];
    for j in 0..CELL_SAMPLES {
        for i in 0..CELL_SAMPLES {
            let u = x0 + (i as f32 + 0.5) * step;
            let v = y0 + (j as f32 + 0.5) * step;
            let (x, y) = frame.map(u, v);
            let img = &ev.image;
            let dx = 0.5 * (img.bilinear(x + 1.0, y) - img.bilinear(x - 1.0, y));
            let dy = 0.5 * (img.bilinear(x, y + 1.0) - img.bilinear(x, y - 1.0));
            let (rx, ry) = frame.unrotate(dx, dy);
            sums[0] += img.bilinear(x, y);
            sums[1] += rx;
            sums[2] += ry;
        }
    }
    let n = (CELL_SAMPLES * CELL_SAMPLES) as f32;
    sums.map(|s| s / n)
}

fn mldb_bits(ev: &Evolution, kp: &Keypoint) -> Vec<bool> {
    let (lx, ly) = ev.to_level(kp.x, kp.y);
    let scale = (1.5 * ev.level_sigma()).round().max(1.0);
    let half = PATTERN_SIZE * scale;
    let frame = Frame::with_angle(&Keypoint::new(lx, ly), 1.0, kp.angle);

    let mut bits = Vec::with_capacity(DESCRIPTOR_BITS);
    for &g in &GRIDS {
        let side = 2.0 * half / g as f32;
        let mut cells = Vec::with_capacity(g * g);
        for cy in 0..g {
            for cx in 0..g {
                let x0 = -half + cx as f32 * side;
                let y0 = -half + cy as f32 * side;
                cells.push(cell_means(ev, &frame, x0, y0, side));
            }
        }
        for i in 0..cells.len() {
            for j in (i + 1)..cells.len() {
                for c in 0..3 {
                    bits.push(cells[i][c] > cells[j][c]);
                }
            }
        }
    }
    bits
}

impl Descriptor for AkazeDescriptor {
    fn name(&self) -> &'static str {
        "AKAZE"
    }

    fn layout(&self) -> DescriptorLayout {
        DescriptorLayout::Binary { bytes: DESCRIPTOR_SIZE }
    }

    fn describe(&self, image: &Raster, keypoints: &[Keypoint]) -> Described {
        if keypoints.is_empty() {
            return Described::empty(self.layout());
        }
        let evolutions = self.detector.scale_space().build(image);
        debug!("M-LDB: {} evolution levels", evolutions.len());

        describe_binary(keypoints, DESCRIPTOR_SIZE, |kp| {
            let ev = nearest_level(&evolutions, keypoint_sigma(kp))?;
            Some(pack_bits(mldb_bits(ev, kp), DESCRIPTOR_SIZE))
        })
    }
}
