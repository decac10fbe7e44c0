//! Nonlinear diffusion scale space shared by KAZE and AKAZE.
//!
//! Each evolution level is obtained from the previous one by a single
//! additive operator splitting (AOS) step of Perona-Malik diffusion with the
//! g2 conductance, which is unconditionally stable for any time step.
//! Keypoints are scale-normalised determinant-of-Hessian extrema.

use feature_core::{FloatImage, Keypoint, Raster};
use log::debug;
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::refinement::{dominant_orientation, local_maxima_3x3, refine_subpixel, sort_by_response};

/// Ratio between the integration scale and the reported keypoint radius
const DERIVATIVE_FACTOR: f32 = 1.5;
/// Smallest side length an evolution level may have
const MIN_LEVEL_SIZE: usize = 8;

/// Scale-space layout and detection threshold
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NonlinearParams {
    pub octaves: usize,
    pub sublevels: usize,
    pub base_sigma: f32,
    pub threshold: f32,
    /// Percentile of the gradient histogram used as contrast factor
    pub contrast_percentile: f32,
    /// Halve the resolution at each new octave (AKAZE) or keep it (KAZE)
    pub downsample: bool,
}

impl Default for NonlinearParams {
    fn default() -> Self {
        Self {
            octaves: 4,
            sublevels: 4,
            base_sigma: 1.6,
            threshold: 0.001,
            contrast_percentile: 0.7,
            downsample: false,
        }
    }
}

/// One level of the nonlinear scale space
#[derive(Debug, Clone)]
pub struct Evolution {
    pub image: FloatImage,
    /// Scale in base-image pixels
    pub sigma: f32,
    pub octave: usize,
    /// Base-image pixels per level pixel
    pub ratio: f32,
}

impl Evolution {
    /// Scale expressed in this level's pixels
    pub fn level_sigma(&self) -> f32 {
        self.sigma / self.ratio
    }

    /// Map a base-image coordinate into this level
    pub fn to_level(&self, x: f32, y: f32) -> (f32, f32) {
        ((x + 0.5) / self.ratio - 0.5, (y + 0.5) / self.ratio - 0.5)
    }

    /// Map a level coordinate back to the base image
    pub fn to_base(&self, x: f32, y: f32) -> (f32, f32) {
        ((x + 0.5) * self.ratio - 0.5, (y + 0.5) * self.ratio - 0.5)
    }
}

/// Gradient magnitude at the given percentile of a 300-bin histogram
pub fn contrast_factor(img: &FloatImage, percentile: f32) -> f32 {
    const BINS: usize = 300;
    const FALLBACK: f32 = 0.03;

    let (gx, gy) = img.gaussian_blur(1.0).scharr(1);
    let (w, h) = (img.width, img.height);
    if w < 3 || h < 3 {
        return FALLBACK;
    }

    let mut magnitudes = Vec::with_capacity((w - 2) * (h - 2));
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let (dx, dy) = (gx.get(x, y), gy.get(x, y));
            magnitudes.push((dx * dx + dy * dy).sqrt());
        }
    }
    let max = magnitudes.iter().copied().fold(0.0f32, f32::max);
    if max <= f32::EPSILON {
        return FALLBACK;
    }

    let mut histogram = [0usize; BINS];
    let mut populated = 0usize;
    for &m in &magnitudes {
        if m > 0.0 {
            let bin = ((m / max) * BINS as f32).min(BINS as f32 - 1.0) as usize;
            histogram[bin] += 1;
            populated += 1;
        }
    }

    let target = (populated as f32 * percentile) as usize;
    let mut cumulative = 0usize;
    let mut bin = 0usize;
    while bin < BINS {
        cumulative += histogram[bin];
        if cumulative > target {
            break;
        }
        bin += 1;
    }
    let k = max * (bin as f32 + 1.0) / BINS as f32;
    if k > f32::EPSILON {
        k
    } else {
        FALLBACK
    }
}

/// Perona-Malik g2 conductance of the smoothed image
pub fn conductance_g2(img: &FloatImage, k: f32) -> FloatImage {
    let (gx, gy) = img.gaussian_blur(1.0).scharr(1);
    let inv_k2 = 1.0 / (k * k);
    FloatImage {
        data: gx
            .data
            .iter()
            .zip(&gy.data)
            .map(|(dx, dy)| 1.0 / (1.0 + (dx * dx + dy * dy) * inv_k2))
            .collect(),
        width: img.width,
        height: img.height,
    }
}

fn transpose(img: &FloatImage) -> FloatImage {
    let (w, h) = (img.width, img.height);
    let mut data = vec![0.0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            data[x * h + y] = img.data[y * w + x];
        }
    }
    FloatImage {
        data,
        width: h,
        height: w,
    }
}

/// Solve (I - t A) u = rhs along one line with Neumann borders (Thomas algorithm)
fn solve_line(values: &[f32], g: &[f32], t: f32, out: &mut [f32]) {
    let n = values.len();
    if n == 0 {
        return;
    }
    let mut c_prime = vec![0.0f32; n];
    let mut d_prime = vec![0.0f32; n];

    let coupling = |j: usize| if j + 1 < n { 0.5 * (g[j] + g[j + 1]) } else { 0.0 };
    for j in 0..n {
        let left = if j > 0 { coupling(j - 1) } else { 0.0 };
        let right = coupling(j);
        let sub = -t * left;
        let diag = 1.0 + t * (left + right);
        let sup = -t * right;

        let denom = if j > 0 { diag - sub * c_prime[j - 1] } else { diag };
        c_prime[j] = sup / denom;
        d_prime[j] = if j > 0 {
            (values[j] - sub * d_prime[j - 1]) / denom
        } else {
            values[j] / denom
        };
    }

    out[n - 1] = d_prime[n - 1];
    for j in (0..n - 1).rev() {
        out[j] = d_prime[j] - c_prime[j] * out[j + 1];
    }
}

fn diffuse_rows(img: &FloatImage, g: &FloatImage, t: f32) -> FloatImage {
    let w = img.width;
    let mut out = FloatImage::zeros(img.width, img.height);
    out.data.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let range = y * w..(y + 1) * w;
        solve_line(&img.data[range.clone()], &g.data[range], t, row);
    });
    out
}

/// One AOS step of length `tau`
pub fn aos_step(img: &FloatImage, g: &FloatImage, tau: f32) -> FloatImage {
    let t = 2.0 * tau;
    let rows = diffuse_rows(img, g, t);
    let cols = transpose(&diffuse_rows(&transpose(img), &transpose(g), t));
    FloatImage {
        data: rows.data.iter().zip(&cols.data).map(|(a, b)| 0.5 * (a + b)).collect(),
        width: img.width,
        height: img.height,
    }
}

/// Scale-normalised Hessian determinant plus first derivatives of a level
struct HessianResponse {
    det: FloatImage,
    lx: FloatImage,
    ly: FloatImage,
    step: usize,
}

impl HessianResponse {
    fn compute(ev: &Evolution) -> Self {
        let step = ev.level_sigma().round().max(1.0) as usize;
        let (lx, ly) = ev.image.scharr(step);
        let (lxx, lxy) = lx.scharr(step);
        let (_, lyy) = ly.scharr(step);
        let det = FloatImage {
            data: lxx
                .data
                .iter()
                .zip(&lyy.data)
                .zip(&lxy.data)
                .map(|((a, b), c)| a * b - c * c)
                .collect(),
            width: lxx.width,
            height: lxx.height,
        };
        Self { det, lx, ly, step }
    }

    /// Largest determinant in the 3x3 window around a base-image point
    fn max_around(&self, ev: &Evolution, x: f32, y: f32) -> f32 {
        let (lx, ly) = ev.to_level(x, y);
        let (cx, cy) = (lx.round() as i32, ly.round() as i32);
        let mut best = f32::MIN;
        for dy in -1..=1 {
            for dx in -1..=1 {
                best = best.max(self.det.get_clamped(cx + dx, cy + dy));
            }
        }
        best
    }
}

/// Nonlinear scale space builder and Hessian detector
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NonlinearScaleSpace {
    pub params: NonlinearParams,
}

impl NonlinearScaleSpace {
    pub fn new(params: NonlinearParams) -> Self {
        Self { params }
    }

    /// Build every evolution level, stopping early when levels get too small
    pub fn build(&self, img: &Raster) -> Vec<Evolution> {
        let p = &self.params;
        let unit = FloatImage {
            data: img.to_unit_f32(),
            width: img.width(),
            height: img.height(),
        };
        let base = unit.gaussian_blur(p.base_sigma);
        let mut k = contrast_factor(&base, p.contrast_percentile);
        debug!("nonlinear scale space: contrast factor {:.5}", k);

        let total = p.octaves * p.sublevels.max(1);
        let mut evolutions = Vec::with_capacity(total);
        evolutions.push(Evolution {
            image: base,
            sigma: p.base_sigma,
            octave: 0,
            ratio: 1.0,
        });

        for i in 1..total {
            let octave = i / p.sublevels.max(1);
            let sublevel = i % p.sublevels.max(1);
            let sigma = p.base_sigma * 2f32.powf(octave as f32 + sublevel as f32 / p.sublevels.max(1) as f32);

            let Some(prev) = evolutions.last() else {
                break;
            };
            let mut source = prev.image.clone();
            let mut ratio = prev.ratio;
            if p.downsample && sublevel == 0 {
                source = source.half_sample();
                ratio *= 2.0;
                k *= 0.75;
            }
            if source.width < MIN_LEVEL_SIZE || source.height < MIN_LEVEL_SIZE {
                break;
            }

            let tau = 0.5 * (sigma * sigma - prev.sigma * prev.sigma) / (ratio * ratio);
            let g = conductance_g2(&source, k);
            evolutions.push(Evolution {
                image: aos_step(&source, &g, tau),
                sigma,
                octave,
                ratio,
            });
        }
        evolutions
    }

    /// Determinant-of-Hessian extrema over space and adjacent levels
    pub fn detect(&self, img: &Raster) -> Vec<Keypoint> {
        let evolutions = self.build(img);
        let responses: Vec<HessianResponse> = evolutions.par_iter().map(HessianResponse::compute).collect();

        let mut keypoints = Vec::new();
        for (i, (ev, resp)) in evolutions.iter().zip(&responses).enumerate() {
            let (w, h) = (resp.det.width, resp.det.height);
            for (x, y, value) in local_maxima_3x3(&resp.det.data, w, h, self.params.threshold) {
                let border = resp.step;
                if x < border || y < border || x + border >= w || y + border >= h {
                    continue;
                }
                let (bx, by) = ev.to_base(x as f32, y as f32);
                let below = i.checked_sub(1).map(|j| responses[j].max_around(&evolutions[j], bx, by));
                let above = responses
                    .get(i + 1)
                    .map(|r| r.max_around(&evolutions[i + 1], bx, by));
                if below.is_some_and(|v| v > value) || above.is_some_and(|v| v > value) {
                    continue;
                }

                let (rx, ry) = refine_subpixel(&resp.det, x, y);
                let angle = dominant_orientation(&resp.lx, &resp.ly, rx, ry, ev.level_sigma());
                let (kx, ky) = ev.to_base(rx, ry);
                keypoints.push(Keypoint {
                    x: kx,
                    y: ky,
                    size: 2.0 * DERIVATIVE_FACTOR * ev.sigma,
                    angle,
                    response: value,
                    octave: ev.octave as i32,
                });
            }
        }

        sort_by_response(&mut keypoints);
        keypoints
    }
}

/// Evolution level whose scale is closest to `sigma`
pub fn nearest_level(evolutions: &[Evolution], sigma: f32) -> Option<&Evolution> {
    evolutions.iter().min_by(|a, b| {
        let da = (a.sigma - sigma).abs();
        let db = (b.sigma - sigma).abs();
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    })
}

/// Smoothing scale that produced a keypoint of the given size
pub fn keypoint_sigma(kp: &Keypoint) -> f32 {
    kp.size / (2.0 * DERIVATIVE_FACTOR)
}

#[cfg(test)]
pub(crate) mod test_support {
    use feature_core::Raster;

    pub fn blob_image(width: usize, height: usize) -> Raster {
        let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
        Raster::from_fn(width, height, |x, y| {
            let d2 = (x as f32 - cx).powi(2) + (y as f32 - cy).powi(2);
            if d2 <= 25.0 {
                220
            } else {
                40
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::blob_image;
    use super::*;

    #[test]
    fn test_aos_preserves_constant_image() {
        let img = FloatImage::from_raster(&Raster::filled(12, 9, 50), 1.0 / 255.0);
        let g = conductance_g2(&img, 0.05);
        let out = aos_step(&img, &g, 3.0);
        assert!(out.data.iter().all(|v| (v - 50.0 / 255.0).abs() < 1e-5));
    }

    #[test]
    fn test_aos_preserves_mass_and_smooths() {
        let mut img = FloatImage::zeros(16, 16);
        img.data[8 * 16 + 8] = 1.0;
        let g = FloatImage {
            data: vec![1.0; 256],
            width: 16,
            height: 16,
        };
        let out = aos_step(&img, &g, 1.0);
        let mass: f32 = out.data.iter().sum();
        assert!((mass - 1.0).abs() < 1e-4);
        assert!(out.get(8, 8) < 1.0 && out.get(9, 8) > 0.0);
    }

    #[test]
    fn test_contrast_factor_positive() {
        let img = FloatImage::from_raster(&blob_image(40, 40), 1.0 / 255.0);
        let k = contrast_factor(&img, 0.7);
        assert!(k > 0.0 && k.is_finite());
        let flat = FloatImage::zeros(20, 20);
        assert_eq!(contrast_factor(&flat, 0.7), 0.03);
    }

    #[test]
    fn test_full_resolution_levels() {
        let space = NonlinearScaleSpace::default();
        let levels = space.build(&blob_image(48, 48));
        assert_eq!(levels.len(), 16);
        assert!(levels.iter().all(|l| l.ratio == 1.0 && l.image.width == 48));
        for pair in levels.windows(2) {
            assert!(pair[1].sigma > pair[0].sigma);
        }
    }

    #[test]
    fn test_downsampled_levels() {
        let space = NonlinearScaleSpace::new(NonlinearParams {
            downsample: true,
            ..Default::default()
        });
        let levels = space.build(&blob_image(64, 64));
        assert_eq!(levels.len(), 16);
        assert_eq!(levels[4].image.width, 32);
        assert_eq!(levels[12].ratio, 8.0);
    }

    #[test]
    fn test_detects_blob() {
        let keypoints = NonlinearScaleSpace::default().detect(&blob_image(64, 64));
        assert!(!keypoints.is_empty());
        assert!(keypoints
            .iter()
            .any(|k| (k.x - 32.0).abs() < 3.0 && (k.y - 32.0).abs() < 3.0));
    }

    #[test]
    fn test_uniform_image() {
        let img = Raster::filled(32, 32, 10);
        assert!(NonlinearScaleSpace::default().detect(&img).is_empty());
    }

    #[test]
    fn test_nearest_level() {
        let levels = NonlinearScaleSpace::default().build(&blob_image(32, 32));
        let level = nearest_level(&levels, 3.3).map(|l| l.sigma);
        assert_eq!(level, Some(1.6 * 2f32.powf(1.0)));
    }
}
