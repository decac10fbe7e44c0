//! BRISK: concentric sampling rings, long pairs for orientation, short pairs
//! for the bit string.

use feature_core::{Described, DescriptorLayout, Descriptor, IntegralImage, Keypoint, Raster};
use once_cell::sync::Lazy;
use std::f32::consts::PI;

use crate::sampling::{box_mean_at, describe_binary, pack_bits, Frame};

const DESCRIPTOR_SIZE: usize = 64;
const RING_SCALE: f32 = 0.85;
const RADII: [f32; 5] = [0.0, 2.9, 4.9, 7.4, 10.8];
const COUNTS: [usize; 5] = [1, 10, 14, 15, 20];
const LONG_PAIR_MIN: f32 = 8.2 * RING_SCALE;
/// Keypoint size that maps to the unscaled pattern
const BASIC_SIZE: f32 = 12.0;

#[derive(Debug, Clone, Copy)]
struct PatternPoint {
    x: f32,
    y: f32,
    sigma: f32,
}

struct Pattern {
    points: Vec<PatternPoint>,
    short_pairs: Vec<(usize, usize)>,
    long_pairs: Vec<(usize, usize)>,
    reach: f32,
}

static PATTERN: Lazy<Pattern> = Lazy::new(|| {
    let mut points = Vec::new();
    for (ring, (&r, &n)) in RADII.iter().zip(&COUNTS).enumerate() {
        let radius = r * RING_SCALE;
        let sigma = if ring == 0 { 0.5 } else { (PI * radius / (2.0 * n as f32)).max(0.5) };
        // odd rings are offset by half a step
        let offset = if ring % 2 == 1 { PI / n as f32 } else { 0.0 };
        for k in 0..n {
            let theta = 2.0 * PI * k as f32 / n as f32 + offset;
            points.push(PatternPoint {
                x: radius * theta.cos(),
                y: radius * theta.sin(),
                sigma,
            });
        }
    }

    let mut pairs: Vec<(usize, usize, f32)> = Vec::new();
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            let d = ((points[i].x - points[j].x).powi(2) + (points[i].y - points[j].y).powi(2)).sqrt();
            pairs.push((i, j, d));
        }
    }
    let long_pairs = pairs
        .iter()
        .filter(|p| p.2 > LONG_PAIR_MIN)
        .map(|p| (p.0, p.1))
        .collect();
    pairs.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));
    let short_pairs = pairs.iter().take(DESCRIPTOR_SIZE * 8).map(|p| (p.0, p.1)).collect();

    let reach = points
        .iter()
        .map(|p| (p.x * p.x + p.y * p.y).sqrt() + p.sigma)
        .fold(0.0, f32::max);
    Pattern {
        points,
        short_pairs,
        long_pairs,
        reach,
    }
});

#[derive(Debug, Clone, Default)]
pub struct BriskDescriptor;

impl BriskDescriptor {
    fn sample(ii: &IntegralImage, frame: &Frame, p: &PatternPoint) -> f32 {
        let (x, y) = frame.map(p.x, p.y);
        box_mean_at(ii, x, y, p.sigma * frame.scale())
    }

    /// Gradient direction averaged over the long pairs
    fn orientation(ii: &IntegralImage, kp: &Keypoint, scale: f32) -> f32 {
        let frame = Frame::new(kp, scale, false);
        let values: Vec<f32> = PATTERN.points.iter().map(|p| Self::sample(ii, &frame, p)).collect();
        let (mut gx, mut gy) = (0.0f32, 0.0f32);
        for &(i, j) in &PATTERN.long_pairs {
            let (pi, pj) = (&PATTERN.points[i], &PATTERN.points[j]);
            let (dx, dy) = (pj.x - pi.x, pj.y - pi.y);
            let weight = (values[j] - values[i]) / (dx * dx + dy * dy);
            gx += weight * dx;
            gy += weight * dy;
        }
        gy.atan2(gx)
    }
}

impl Descriptor for BriskDescriptor {
    fn name(&self) -> &'static str {
        "BRISK"
    }

    fn layout(&self) -> DescriptorLayout {
        DescriptorLayout::Binary { bytes: DESCRIPTOR_SIZE }
    }

    fn describe(&self, image: &Raster, keypoints: &[Keypoint]) -> Described {
        let ii = IntegralImage::from_raster(image);

        describe_binary(keypoints, DESCRIPTOR_SIZE, |kp| {
            let scale = (kp.size / BASIC_SIZE).max(1.0);
            if !image.contains_patch(kp.x, kp.y, PATTERN.reach * scale + 1.0) {
                return None;
            }
            let angle = Self::orientation(&ii, kp, scale);
            let frame = Frame::with_angle(kp, scale, angle);
            let values: Vec<f32> = PATTERN.points.iter().map(|p| Self::sample(&ii, &frame, p)).collect();
            let bits = PATTERN.short_pairs.iter().map(|&(i, j)| values[i] > values[j]);
            Some(pack_bits(bits, DESCRIPTOR_SIZE))
        })
    }
}
