//! Helpers shared by the descriptor extractors: sampling frames, seeded
//! test patterns, bit packing and the parallel describe loop.

use feature_core::{Described, DescriptorMatrix, FloatImage, IntegralImage, Keypoint, Raster};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use rayon::prelude::*;
use std::f32::consts::PI;

/// Maps pattern coordinates into the image around a keypoint
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    cx: f32,
    cy: f32,
    cos: f32,
    sin: f32,
    scale: f32,
}

impl Frame {
    /// Pattern frame at the keypoint, rotated by its angle when `steered`
    pub fn new(kp: &Keypoint, scale: f32, steered: bool) -> Self {
        let (sin, cos) = if steered { kp.angle.sin_cos() } else { (0.0, 1.0) };
        Self {
            cx: kp.x,
            cy: kp.y,
            cos,
            sin,
            scale,
        }
    }

    pub fn with_angle(kp: &Keypoint, scale: f32, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            cx: kp.x,
            cy: kp.y,
            cos,
            sin,
            scale,
        }
    }

    #[inline]
    pub fn map(&self, dx: f32, dy: f32) -> (f32, f32) {
        (
            self.cx + self.scale * (self.cos * dx - self.sin * dy),
            self.cy + self.scale * (self.sin * dx + self.cos * dy),
        )
    }

    /// Rotate an image-space vector into the pattern frame
    #[inline]
    pub fn unrotate(&self, vx: f32, vy: f32) -> (f32, f32) {
        (self.cos * vx + self.sin * vy, -self.sin * vx + self.cos * vy)
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}

/// Point pairs drawn from an isotropic Gaussian and clipped to `limit`
pub fn gaussian_pairs(count: usize, sigma: f32, limit: f32, seed: u64) -> Vec<[f32; 4]> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut draw = || {
        let v: f32 = rng.sample(StandardNormal);
        (v * sigma).round().clamp(-limit, limit)
    };
    (0..count).map(|_| [draw(), draw(), draw(), draw()]).collect()
}

/// Integer points drawn uniformly from [-limit, limit]^2
pub fn uniform_points(count: usize, limit: i32, seed: u64) -> Vec<(i32, i32)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (rng.gen_range(-limit..=limit), rng.gen_range(-limit..=limit)))
        .collect()
}

/// Pack bits LSB-first into `bytes` bytes, extra bits are ignored
pub fn pack_bits(bits: impl IntoIterator<Item = bool>, bytes: usize) -> Vec<u8> {
    let mut d = vec![0u8; bytes];
    for (i, bit) in bits.into_iter().enumerate().take(bytes * 8) {
        d[i / 8] |= (bit as u8) << (i % 8);
    }
    d
}

/// Mean of the square of half-size `radius` (at least 1) centred on (x, y)
pub fn box_mean_at(ii: &IntegralImage, x: f32, y: f32, radius: f32) -> f32 {
    let half = radius.round().max(1.0) as i64;
    let (cx, cy) = (x.round() as i64, y.round() as i64);
    ii.box_mean(cx - half, cy - half, cx + half + 1, cy + half + 1) as f32
}

pub fn smooth(img: &Raster, sigma: f32) -> FloatImage {
    FloatImage::from_raster(img, 1.0).gaussian_blur(sigma)
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Describe every keypoint in parallel, dropping those `f` rejects
pub fn describe_binary<F>(keypoints: &[Keypoint], bytes: usize, f: F) -> Described
where
    F: Fn(&Keypoint) -> Option<Vec<u8>> + Sync,
{
    let rows: Vec<(Keypoint, Vec<u8>)> = keypoints
        .par_iter()
        .filter_map(|kp| f(kp).map(|row| (*kp, row)))
        .collect();
    let (keypoints, rows): (Vec<Keypoint>, Vec<Vec<u8>>) = rows.into_iter().unzip();
    Described {
        keypoints,
        descriptors: DescriptorMatrix::from_binary_rows(bytes, rows),
    }
}

/// Float counterpart of [`describe_binary`]
pub fn describe_float<F>(keypoints: &[Keypoint], len: usize, f: F) -> Described
where
    F: Fn(&Keypoint) -> Option<Vec<f32>> + Sync,
{
    let rows: Vec<(Keypoint, Vec<f32>)> = keypoints
        .par_iter()
        .filter_map(|kp| f(kp).map(|row| (*kp, row)))
        .collect();
    let (keypoints, rows): (Vec<Keypoint>, Vec<Vec<f32>>) = rows.into_iter().unzip();
    Described {
        keypoints,
        descriptors: DescriptorMatrix::from_float_rows(len, rows),
    }
}

/// Gradient magnitude split over `bins` orientation channels.
///
/// Each pixel votes into the two nearest bins with linear weights.
pub struct OrientationMaps {
    pub bins: Vec<FloatImage>,
}

impl OrientationMaps {
    pub fn compute(img: &FloatImage, n_bins: usize) -> Self {
        let (gx, gy) = img.sobel();
        let (w, h) = (img.width, img.height);
        let mut bins = vec![FloatImage::zeros(w, h); n_bins];
        let bin_width = 2.0 * PI / n_bins as f32;

        for i in 0..w * h {
            let (dx, dy) = (gx.data[i], gy.data[i]);
            let magnitude = (dx * dx + dy * dy).sqrt();
            if magnitude <= 0.0 {
                continue;
            }
            let mut angle = dy.atan2(dx);
            if angle < 0.0 {
                angle += 2.0 * PI;
            }
            let pos = angle / bin_width;
            let lower = pos.floor() as usize % n_bins;
            let upper = (lower + 1) % n_bins;
            let frac = pos - pos.floor();
            bins[lower].data[i] += magnitude * (1.0 - frac);
            bins[upper].data[i] += magnitude * frac;
        }
        Self { bins }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use feature_core::{Keypoint, Raster};

    /// Deterministic blocky texture, `shift` translates the content right/down
    pub fn texture(width: usize, height: usize, shift: (usize, usize)) -> Raster {
        Raster::from_fn(width, height, |x, y| {
            let (sx, sy) = ((x + 1000 - shift.0) / 5, (y + 1000 - shift.1) / 5);
            let mut v = (sx as u32).wrapping_mul(2_654_435_761) ^ (sy as u32).wrapping_mul(40_503);
            v ^= v >> 13;
            v = v.wrapping_mul(0x5bd1_e995);
            v ^= v >> 15;
            (v & 0xff) as u8
        })
    }

    /// Grid of keypoints well inside the image
    pub fn grid_keypoints(width: usize, height: usize, margin: usize, step: usize, size: f32) -> Vec<Keypoint> {
        let mut kps = Vec::new();
        let mut y = margin;
        while y + margin < height {
            let mut x = margin;
            while x + margin < width {
                kps.push(Keypoint::new(x as f32, y as f32).with_size(size));
                x += step;
            }
            y += step;
        }
        kps
    }

    pub fn hamming(a: &[u8], b: &[u8]) -> u32 {
        a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
    }

    pub fn l2(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
    }
}
