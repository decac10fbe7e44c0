//! DAISY: orientation histograms sampled on concentric rings of
//! progressively blurred gradient channels.

use feature_core::{Described, DescriptorLayout, Descriptor, FloatImage, Keypoint, Raster};
use rayon::prelude::*;
use std::f32::consts::PI;

use crate::sampling::{describe_float, l2_normalize, Frame};

#[derive(Debug, Clone)]
pub struct DaisyDescriptor {
    pub radius: f32,
    pub q_radius: usize,
    pub q_theta: usize,
    pub q_hist: usize,
    pub use_orientation: bool,
}

impl Default for DaisyDescriptor {
    fn default() -> Self {
        Self {
            radius: 15.0,
            q_radius: 3,
            q_theta: 8,
            q_hist: 8,
            use_orientation: true,
        }
    }
}

impl DaisyDescriptor {
    pub fn len(&self) -> usize {
        (self.q_radius * self.q_theta + 1) * self.q_hist
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Positive directional derivatives, one channel per histogram bin
    fn gradient_layers(&self, image: &Raster) -> Vec<FloatImage> {
        let base = FloatImage::from_raster(image, 1.0 / 255.0).gaussian_blur(0.5);
        let (gx, gy) = base.sobel();
        (0..self.q_hist)
            .into_par_iter()
            .map(|o| {
                let theta = 2.0 * PI * o as f32 / self.q_hist as f32;
                let (s, c) = theta.sin_cos();
                FloatImage {
                    data: gx.data.iter().zip(&gy.data).map(|(dx, dy)| (c * dx + s * dy).max(0.0)).collect(),
                    width: gx.width,
                    height: gx.height,
                }
            })
            .collect()
    }

    /// One stack of layers per ring, each blurred to that ring's sigma
    fn convolved(&self, layers: Vec<FloatImage>) -> Vec<Vec<FloatImage>> {
        let mut levels = Vec::with_capacity(self.q_radius);
        let mut current = layers;
        let mut sigma_prev = 0.0f32;
        for ring in 0..self.q_radius {
            let sigma = self.radius * (ring + 1) as f32 / (2.0 * self.q_radius as f32);
            let increment = (sigma * sigma - sigma_prev * sigma_prev).sqrt();
            current = current.par_iter().map(|l| l.gaussian_blur(increment)).collect();
            levels.push(current.clone());
            sigma_prev = sigma;
        }
        levels
    }

    fn histogram(&self, level: &[FloatImage], x: f32, y: f32, shift: usize, out: &mut Vec<f32>) {
        let start = out.len();
        for b in 0..self.q_hist {
            out.push(level[(b + shift) % self.q_hist].bilinear(x, y));
        }
        l2_normalize(&mut out[start..]);
    }
}

impl Descriptor for DaisyDescriptor {
    fn name(&self) -> &'static str {
        "DAISY"
    }

    fn layout(&self) -> DescriptorLayout {
        DescriptorLayout::Float { len: self.len() }
    }

    fn describe(&self, image: &Raster, keypoints: &[Keypoint]) -> Described {
        if keypoints.is_empty() || self.q_radius == 0 {
            return Described::empty(self.layout());
        }
        let levels = self.convolved(self.gradient_layers(image));
        let len = self.len();

        describe_float(keypoints, len, |kp| {
            let frame = Frame::new(kp, 1.0, self.use_orientation);
            let mut angle = if self.use_orientation { kp.angle } else { 0.0 };
            if angle < 0.0 {
                angle += 2.0 * PI;
            }
            // rotate the histogram bins along with the grid
            let shift = (angle / (2.0 * PI) * self.q_hist as f32).round() as usize % self.q_hist;

            let mut row = Vec::with_capacity(len);
            self.histogram(&levels[0], kp.x, kp.y, shift, &mut row);
            for (ring, level) in levels.iter().enumerate() {
                let r = self.radius * (ring + 1) as f32 / self.q_radius as f32;
                for t in 0..self.q_theta {
                    let theta = 2.0 * PI * t as f32 / self.q_theta as f32;
                    let (x, y) = frame.map(r * theta.cos(), r * theta.sin());
                    self.histogram(level, x, y, shift, &mut row);
                }
            }
            Some(row)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::test_support::{l2, texture};

    #[test]
    fn test_default_length() {
        assert_eq!(DaisyDescriptor::default().len(), 200);
        assert_eq!(DaisyDescriptor::default().layout(), DescriptorLayout::Float { len: 200 });
    }

    #[test]
    fn test_histograms_normalised() {
        let img = texture(80, 80, (0, 0));
        let d = DaisyDescriptor::default().describe(&img, &[Keypoint::new(40.0, 40.0)]);
        let Some(row) = d.descriptors.float_row(0) else {
            panic!("keypoint should be described");
        };
        for hist in row.chunks(8) {
            let norm: f32 = hist.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-3 || norm == 0.0);
        }
    }

    #[test]
    fn test_translation() {
        let a = texture(100, 100, (0, 0));
        let b = texture(100, 100, (5, 0));
        let da = DaisyDescriptor::default().describe(&a, &[Keypoint::new(45.0, 50.0)]);
        let db = DaisyDescriptor::default().describe(&b, &[Keypoint::new(50.0, 50.0)]);
        let other = DaisyDescriptor::default().describe(&a, &[Keypoint::new(60.0, 30.0)]);
        let (Some(ra), Some(rb), Some(ro)) = (
            da.descriptors.float_row(0),
            db.descriptors.float_row(0),
            other.descriptors.float_row(0),
        ) else {
            panic!("keypoints should be described");
        };
        assert!(l2(ra, rb) < 0.1);
        assert!(l2(ra, ro) > l2(ra, rb));
    }

    #[test]
    fn test_keeps_border_keypoints() {
        let img = texture(40, 40, (0, 0));
        let kps = vec![Keypoint::new(0.0, 0.0), Keypoint::new(39.0, 39.0)];
        let d = DaisyDescriptor::default().describe(&img, &kps);
        assert_eq!(d.keypoints.len(), 2);
        assert!(d.is_aligned());
    }
}
