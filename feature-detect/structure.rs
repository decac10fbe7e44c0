//! Second-moment (structure tensor) responses: Harris and Shi-Tomasi.

use feature_core::{FloatImage, Raster};

/// Box-smoothed gradient products (Ixx, Iyy, Ixy)
pub struct StructureTensor {
    pub ixx: FloatImage,
    pub iyy: FloatImage,
    pub ixy: FloatImage,
}

impl StructureTensor {
    pub fn compute(img: &Raster, block_size: usize) -> Self {
        let (gx, gy) = FloatImage::from_raster(img, 1.0).sobel();
        let product = |a: &FloatImage, b: &FloatImage| FloatImage {
            data: a.data.iter().zip(&b.data).map(|(p, q)| p * q).collect(),
            width: a.width,
            height: a.height,
        };
        let radius = block_size / 2;
        Self {
            ixx: product(&gx, &gx).box_blur(radius),
            iyy: product(&gy, &gy).box_blur(radius),
            ixy: product(&gx, &gy).box_blur(radius),
        }
    }

    /// Harris response det(M) - k * trace(M)^2
    pub fn harris(&self, k: f32) -> FloatImage {
        self.map(|a, b, c| a * b - c * c - k * (a + b) * (a + b))
    }

    /// Smaller eigenvalue of M (Shi-Tomasi)
    pub fn min_eigen(&self) -> FloatImage {
        self.map(|a, b, c| {
            let half_trace = (a + b) * 0.5;
            let diff = (a - b) * 0.5;
            half_trace - (diff * diff + c * c).sqrt()
        })
    }

    fn map(&self, f: impl Fn(f32, f32, f32) -> f32) -> FloatImage {
        let data = self
            .ixx
            .data
            .iter()
            .zip(&self.iyy.data)
            .zip(&self.ixy.data)
            .map(|((&a, &b), &c)| f(a, b, c))
            .collect();
        FloatImage {
            data,
            width: self.ixx.width,
            height: self.ixx.height,
        }
    }
}

/// Harris response on a (2r+1)^2 window around (x, y), computed directly
pub fn harris_at(img: &Raster, x: usize, y: usize, radius: i32, k: f32) -> f32 {
    let mut ixx = 0.0f64;
    let mut ixy = 0.0f64;
    let mut iyy = 0.0f64;

    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let (gx, gy) = sobel_at(img, x as i32 + dx, y as i32 + dy);
            ixx += (gx * gx) as f64;
            ixy += (gx * gy) as f64;
            iyy += (gy * gy) as f64;
        }
    }

    let det = ixx * iyy - ixy * ixy;
    let trace = ixx + iyy;
    (det - k as f64 * trace * trace) as f32
}

/// Image gradients using the Sobel operator, clamped at the border
fn sobel_at(img: &Raster, x: i32, y: i32) -> (f32, f32) {
    let p = |dx: i32, dy: i32| img.get_clamped(x + dx, y + dy) as f32;

    // Sobel X kernel: [-1, 0, 1; -2, 0, 2; -1, 0, 1]
    let gx = p(1, -1) + 2.0 * p(1, 0) + p(1, 1) - p(-1, -1) - 2.0 * p(-1, 0) - p(-1, 1);
    // Sobel Y kernel: [-1, -2, -1; 0, 0, 0; 1, 2, 1]
    let gy = p(-1, 1) + 2.0 * p(0, 1) + p(1, 1) - p(-1, -1) - 2.0 * p(0, -1) - p(1, -1);

    (gx / 8.0, gy / 8.0)
}
