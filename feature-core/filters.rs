//! Small numeric building blocks shared by detectors and descriptors.

use crate::raster::Raster;
use rayon::prelude::*;

/// Row-major single-channel float image
#[derive(Debug, Clone, PartialEq)]
pub struct FloatImage {
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
}

impl FloatImage {
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            data: vec![0.0; width * height],
            width,
            height,
        }
    }

    /// Converts a raster, multiplying every pixel by `scale`
    pub fn from_raster(img: &Raster, scale: f32) -> Self {
        Self {
            data: img.data().iter().map(|&p| p as f32 * scale).collect(),
            width: img.width(),
            height: img.height(),
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn get_clamped(&self, x: i32, y: i32) -> f32 {
        let xx = x.clamp(0, self.width as i32 - 1) as usize;
        let yy = y.clamp(0, self.height as i32 - 1) as usize;
        self.data[yy * self.width + xx]
    }

    /// Bilinear sample with clamped borders
    pub fn bilinear(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor() as i32;
        let y0 = y.floor() as i32;
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;
        let p00 = self.get_clamped(x0, y0);
        let p10 = self.get_clamped(x0 + 1, y0);
        let p01 = self.get_clamped(x0, y0 + 1);
        let p11 = self.get_clamped(x0 + 1, y0 + 1);
        let top = p00 * (1.0 - fx) + p10 * fx;
        let bottom = p01 * (1.0 - fx) + p11 * fx;
        top * (1.0 - fy) + bottom * fy
    }

    /// Separable Gaussian blur, kernel radius ceil(3 sigma)
    pub fn gaussian_blur(&self, sigma: f32) -> Self {
        if sigma <= 0.0 {
            return self.clone();
        }
        let kernel = gaussian_kernel(sigma);
        self.convolve_separable(&kernel, &kernel)
    }

    /// Mean filter over a (2r+1)x(2r+1) window
    pub fn box_blur(&self, radius: usize) -> Self {
        let kernel = vec![1.0 / (2 * radius + 1) as f32; 2 * radius + 1];
        self.convolve_separable(&kernel, &kernel)
    }

    /// Horizontal then vertical convolution with odd-length kernels
    pub fn convolve_separable(&self, kx: &[f32], ky: &[f32]) -> Self {
        let (w, h) = (self.width, self.height);
        let rx = (kx.len() / 2) as i32;
        let ry = (ky.len() / 2) as i32;

        let horizontal: Vec<f32> = (0..h)
            .into_par_iter()
            .flat_map_iter(|y| {
                (0..w).map(move |x| {
                    kx.iter()
                        .enumerate()
                        .map(|(i, k)| k * self.get_clamped(x as i32 + i as i32 - rx, y as i32))
                        .sum::<f32>()
                })
            })
            .collect();
        let tmp = FloatImage {
            data: horizontal,
            width: w,
            height: h,
        };

        let data = (0..h)
            .into_par_iter()
            .flat_map_iter(|y| {
                let tmp = &tmp;
                (0..w).map(move |x| {
                    ky.iter()
                        .enumerate()
                        .map(|(i, k)| k * tmp.get_clamped(x as i32, y as i32 + i as i32 - ry))
                        .sum::<f32>()
                })
            })
            .collect();
        FloatImage { data, width: w, height: h }
    }

    /// Sobel derivatives (normalised by 1/8)
    pub fn sobel(&self) -> (FloatImage, FloatImage) {
        let gx = self.convolve_separable(&[-0.5, 0.0, 0.5], &[0.25, 0.5, 0.25]);
        let gy = self.convolve_separable(&[0.25, 0.5, 0.25], &[-0.5, 0.0, 0.5]);
        (gx, gy)
    }

    /// Scharr derivatives with step `scale` between samples
    pub fn scharr(&self, scale: usize) -> (FloatImage, FloatImage) {
        let s = scale.max(1);
        let mut diff = vec![0.0; 2 * s + 1];
        diff[0] = -0.5;
        diff[2 * s] = 0.5;
        let mut smooth = vec![0.0; 2 * s + 1];
        smooth[0] = 3.0 / 16.0;
        smooth[s] = 10.0 / 16.0;
        smooth[2 * s] = 3.0 / 16.0;
        let gx = self.convolve_separable(&diff, &smooth);
        let gy = self.convolve_separable(&smooth, &diff);
        (gx, gy)
    }

    /// Halve both dimensions by averaging 2x2 blocks
    pub fn half_sample(&self) -> Self {
        let w = (self.width / 2).max(1);
        let h = (self.height / 2).max(1);
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                let (sx, sy) = (2 * x as i32, 2 * y as i32);
                let sum = self.get_clamped(sx, sy)
                    + self.get_clamped(sx + 1, sy)
                    + self.get_clamped(sx, sy + 1)
                    + self.get_clamped(sx + 1, sy + 1);
                data.push(sum * 0.25);
            }
        }
        FloatImage { data, width: w, height: h }
    }

    pub fn max_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::MIN, f32::max)
    }
}

/// Normalised 1D Gaussian kernel
pub fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (3.0 * sigma).ceil().max(1.0) as i32;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= sum);
    kernel
}

/// Summed-area table with one row/column of zero padding
#[derive(Debug, Clone)]
pub struct IntegralImage {
    sums: Vec<f64>,
    width: usize,
    height: usize,
}

impl IntegralImage {
    pub fn from_raster(img: &Raster) -> Self {
        Self::from_values(img.width(), img.height(), |x, y| img.get(x, y) as f64)
    }

    pub fn from_float(img: &FloatImage) -> Self {
        Self::from_values(img.width, img.height, |x, y| img.get(x, y) as f64)
    }

    pub fn from_values(width: usize, height: usize, value: impl Fn(usize, usize) -> f64) -> Self {
        let stride = width + 1;
        let mut sums = vec![0.0f64; stride * (height + 1)];
        for y in 0..height {
            let mut row = 0.0;
            for x in 0..width {
                row += value(x, y);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row;
            }
        }
        Self { sums, width, height }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Sum over the half-open box [x0, x1) x [y0, y1), clamped to the image
    pub fn box_sum(&self, x0: i64, y0: i64, x1: i64, y1: i64) -> f64 {
        let cx = |v: i64| v.clamp(0, self.width as i64) as usize;
        let cy = |v: i64| v.clamp(0, self.height as i64) as usize;
        let (x0, x1, y0, y1) = (cx(x0), cx(x1), cy(y0), cy(y1));
        if x1 <= x0 || y1 <= y0 {
            return 0.0;
        }
        let stride = self.width + 1;
        self.sums[y1 * stride + x1] - self.sums[y0 * stride + x1] - self.sums[y1 * stride + x0]
            + self.sums[y0 * stride + x0]
    }

    /// Mean over the half-open box, 0 when the clamped box is empty
    pub fn box_mean(&self, x0: i64, y0: i64, x1: i64, y1: i64) -> f64 {
        let w = (x1.min(self.width as i64) - x0.max(0)).max(0);
        let h = (y1.min(self.height as i64) - y0.max(0)).max(0);
        if w == 0 || h == 0 {
            return 0.0;
        }
        self.box_sum(x0, y0, x1, y1) / (w * h) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_kernel_normalised() {
        let k = gaussian_kernel(1.6);
        let sum: f32 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(k.len() % 2, 1);
    }

    #[test]
    fn test_blur_preserves_constant_image() {
        let img = FloatImage::from_raster(&Raster::filled(16, 12, 100), 1.0);
        let blurred = img.gaussian_blur(2.0);
        assert!(blurred.data.iter().all(|v| (v - 100.0).abs() < 1e-3));
    }

    #[test]
    fn test_sobel_on_ramp() {
        let ramp = Raster::from_fn(10, 10, |x, _| (x * 10) as u8);
        let (gx, gy) = FloatImage::from_raster(&ramp, 1.0).sobel();
        assert!((gx.get(5, 5) - 10.0).abs() < 1e-4);
        assert!(gy.get(5, 5).abs() < 1e-4);
    }

    #[test]
    fn test_integral_box_sum() {
        let img = Raster::from_fn(4, 4, |x, y| (x + y) as u8);
        let ii = IntegralImage::from_raster(&img);
        let total: u32 = img.data().iter().map(|&p| p as u32).sum();
        assert_eq!(ii.box_sum(0, 0, 4, 4) as u32, total);
        assert_eq!(ii.box_sum(1, 1, 2, 2) as u32, 2);
        // Clamped outside the image
        assert_eq!(ii.box_sum(-3, -3, 10, 10) as u32, total);
        assert_eq!(ii.box_mean(1, 1, 3, 3), 3.0);
    }

    #[test]
    fn test_half_sample() {
        let img = FloatImage::from_raster(&Raster::filled(9, 7, 40), 1.0);
        let half = img.half_sample();
        assert_eq!((half.width, half.height), (4, 3));
        assert!(half.data.iter().all(|v| (v - 40.0).abs() < 1e-5));
    }
}
