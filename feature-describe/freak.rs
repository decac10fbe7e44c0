//! FREAK: retina-like sampling with overlapping receptive fields.

use feature_core::{Described, DescriptorLayout, Descriptor, IntegralImage, Keypoint, Raster};
use once_cell::sync::Lazy;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::f32::consts::PI;

use crate::sampling::{box_mean_at, describe_binary, pack_bits, Frame};

const DESCRIPTOR_SIZE: usize = 64;
const PATTERN_SCALE: f32 = 22.0;
const SMALLEST_KP_SIZE: f32 = 7.0;
const POINTS_PER_RING: usize = 6;

struct Pattern {
    /// (x, y, sigma) in pattern units
    points: Vec<(f32, f32, f32)>,
    pairs: Vec<(usize, usize)>,
    orientation_pairs: Vec<(usize, usize)>,
    reach: f32,
}

fn ring_radii() -> [f32; 8] {
    let big = 2.0 / 3.0;
    let small = 2.0 / 24.0;
    let unit = (big - small) / 21.0;
    [
        big,
        big - 6.0 * unit,
        big - 8.0 * unit,
        big - 10.0 * unit,
        big - 11.0 * unit,
        big - 12.0 * unit,
        big - 13.0 * unit,
        0.0,
    ]
}

static PATTERN: Lazy<Pattern> = Lazy::new(|| {
    let radii = ring_radii();
    let mut points = Vec::with_capacity(43);
    let mut ring_of = Vec::with_capacity(43);
    for (ring, &r) in radii.iter().enumerate() {
        let radius = r * PATTERN_SCALE;
        let sigma = radii[ring.min(6)] * PATTERN_SCALE / 2.0;
        let count = if ring == 7 { 1 } else { POINTS_PER_RING };
        let offset = if ring % 2 == 1 { PI / POINTS_PER_RING as f32 } else { 0.0 };
        for k in 0..count {
            let theta = 2.0 * PI * k as f32 / POINTS_PER_RING as f32 + offset;
            points.push((radius * theta.cos(), radius * theta.sin(), sigma));
            ring_of.push(ring);
        }
    }

    let mut all: Vec<(usize, usize)> = Vec::new();
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            all.push((i, j));
        }
    }
    let mut rng = StdRng::seed_from_u64(0xF4EA);
    all.shuffle(&mut rng);
    let mut pairs: Vec<(usize, usize)> = all.into_iter().take(DESCRIPTOR_SIZE * 8).collect();
    // coarse to fine
    pairs.sort_by_key(|&(i, j)| ring_of[i] + ring_of[j]);

    // symmetric pairs between the same angular slot of different rings
    let mut orientation_pairs = Vec::new();
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            let same_slot = i % POINTS_PER_RING == j % POINTS_PER_RING;
            if same_slot && ring_of[i] != ring_of[j] && ring_of[i].abs_diff(ring_of[j]) % 2 == 0 && ring_of[j] < 7 {
                orientation_pairs.push((i, j));
            }
        }
    }

    let reach = points
        .iter()
        .map(|&(x, y, s)| (x * x + y * y).sqrt() + s)
        .fold(0.0, f32::max);
    Pattern {
        points,
        pairs,
        orientation_pairs,
        reach,
    }
});

#[derive(Debug, Clone)]
pub struct FreakDescriptor {
    pub orientation_normalized: bool,
    pub scale_normalized: bool,
}

impl Default for FreakDescriptor {
    fn default() -> Self {
        Self {
            orientation_normalized: true,
            scale_normalized: true,
        }
    }
}

impl FreakDescriptor {
    fn scale(&self, kp: &Keypoint) -> f32 {
        if self.scale_normalized {
            (kp.size / SMALLEST_KP_SIZE).max(1.0)
        } else {
            1.0
        }
    }

    fn sample_all(ii: &IntegralImage, frame: &Frame) -> Vec<f32> {
        PATTERN
            .points
            .iter()
            .map(|&(px, py, sigma)| {
                let (x, y) = frame.map(px, py);
                box_mean_at(ii, x, y, sigma * frame.scale())
            })
            .collect()
    }

    fn orientation(ii: &IntegralImage, kp: &Keypoint, scale: f32) -> f32 {
        let values = Self::sample_all(ii, &Frame::new(kp, scale, false));
        let (mut gx, mut gy) = (0.0f32, 0.0f32);
        for &(i, j) in &PATTERN.orientation_pairs {
            let (xi, yi, _) = PATTERN.points[i];
            let (xj, yj, _) = PATTERN.points[j];
            let (dx, dy) = (xi - xj, yi - yj);
            let norm = (dx * dx + dy * dy).sqrt();
            let delta = values[i] - values[j];
            gx += delta * dx / norm;
            gy += delta * dy / norm;
        }
        gy.atan2(gx)
    }
}

impl Descriptor for FreakDescriptor {
    fn name(&self) -> &'static str {
        "FREAK"
    }

    fn layout(&self) -> DescriptorLayout {
        DescriptorLayout::Binary { bytes: DESCRIPTOR_SIZE }
    }

    fn describe(&self, image: &Raster, keypoints: &[Keypoint]) -> Described {
        let ii = IntegralImage::from_raster(image);

        describe_binary(keypoints, DESCRIPTOR_SIZE, |kp| {
            let scale = self.scale(kp);
            if !image.contains_patch(kp.x, kp.y, PATTERN.reach * scale + 1.0) {
                return None;
            }
            let angle = if self.orientation_normalized {
                Self::orientation(&ii, kp, scale)
            } else {
                0.0
            };
            let values = Self::sample_all(&ii, &Frame::with_angle(kp, scale, angle));
            let bits = PATTERN.pairs.iter().map(|&(i, j)| values[i] > values[j]);
            Some(pack_bits(bits, DESCRIPTOR_SIZE))
        })
    }
}
