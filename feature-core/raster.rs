use crate::error::{FeatureError, FeatureResult};

/// Row-major 8-bit grayscale image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl Raster {
    /// Wraps a row-major buffer, validating its size
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> FeatureResult<Self> {
        if width == 0 || height == 0 {
            return Err(FeatureError::InvalidImageSize { width, height });
        }
        let expected_len = width * height;
        if data.len() != expected_len {
            return Err(FeatureError::InvalidImageData {
                expected_len,
                actual_len: data.len(),
            });
        }
        Ok(Self { data, width, height })
    }

    /// Uniform image of the given value
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            data: vec![value; width * height],
            width,
            height,
        }
    }

    /// Builds an image by evaluating `f(x, y)` for every pixel
    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> u8) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { data, width, height }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    /// Pixel lookup with coordinates clamped to the image
    #[inline]
    pub fn get_clamped(&self, x: i32, y: i32) -> u8 {
        let xx = x.clamp(0, self.width as i32 - 1) as usize;
        let yy = y.clamp(0, self.height as i32 - 1) as usize;
        self.data[yy * self.width + xx]
    }

    /// True when the square of half-size `radius` around (x, y) is inside the image
    pub fn contains_patch(&self, x: f32, y: f32, radius: f32) -> bool {
        x - radius >= 0.0
            && y - radius >= 0.0
            && x + radius < self.width as f32
            && y + radius < self.height as f32
    }

    /// Bilinear interpolation for subpixel sampling
    pub fn bilinear(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let x1 = x0 + 1.0;
        let y1 = y0 + 1.0;

        // Clamp to image bounds for boundary samples
        if x0 < 0.0 || y0 < 0.0 || x1 >= self.width as f32 || y1 >= self.height as f32 {
            return self.get_clamped(x.round() as i32, y.round() as i32) as f32;
        }

        let dx = x - x0;
        let dy = y - y0;
        let (x0, y0, x1, y1) = (x0 as usize, y0 as usize, x1 as usize, y1 as usize);

        let p00 = self.get(x0, y0) as f32;
        let p10 = self.get(x1, y0) as f32;
        let p01 = self.get(x0, y1) as f32;
        let p11 = self.get(x1, y1) as f32;

        let top = p00 * (1.0 - dx) + p10 * dx;
        let bottom = p01 * (1.0 - dx) + p11 * dx;
        top * (1.0 - dy) + bottom * dy
    }

    /// Photometric negative, used for dark-on-bright region detection
    pub fn inverted(&self) -> Self {
        Self {
            data: self.data.iter().map(|&p| 255 - p).collect(),
            width: self.width,
            height: self.height,
        }
    }

    /// Resample to the target size using bilinear interpolation
    pub fn resized(&self, target_width: usize, target_height: usize) -> Self {
        let target_width = target_width.max(1);
        let target_height = target_height.max(1);
        let x_ratio = self.width as f32 / target_width as f32;
        let y_ratio = self.height as f32 / target_height as f32;

        Self::from_fn(target_width, target_height, |x, y| {
            self.bilinear(x as f32 * x_ratio, y as f32 * y_ratio).round() as u8
        })
    }

    /// Normalized copy in [0, 1]
    pub fn to_unit_f32(&self) -> Vec<f32> {
        self.data.iter().map(|&p| p as f32 / 255.0).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rejects_zero_dimensions() {
        let result = Raster::new(Vec::new(), 0, 10);
        assert!(matches!(result, Err(FeatureError::InvalidImageSize { .. })));
    }

    #[test]
    fn test_rejects_wrong_length() {
        let result = Raster::new(vec![0; 50], 10, 10);
        assert!(matches!(
            result,
            Err(FeatureError::InvalidImageData { expected_len: 100, actual_len: 50 })
        ));
    }

    #[test]
    fn test_bilinear_midpoint() {
        let img = Raster::new(vec![0, 100, 0, 100], 2, 2).unwrap();
        assert_eq!(img.bilinear(0.0, 0.0), 0.0);
        assert!((img.bilinear(0.5, 0.5) - 50.0).abs() < 1e-4);
        let wide = Raster::from_fn(4, 4, |x, _| (x * 10) as u8);
        assert!((wide.bilinear(1.5, 1.0) - 15.0).abs() < 1e-4);
    }

    #[test]
    fn test_clamped_lookup() {
        let img = Raster::from_fn(3, 3, |x, y| (y * 3 + x) as u8);
        assert_eq!(img.get_clamped(-5, -5), 0);
        assert_eq!(img.get_clamped(10, 10), 8);
    }

    #[test]
    fn test_resized_dimensions() {
        let img = Raster::filled(40, 30, 7);
        let small = img.resized(20, 15);
        assert_eq!(small.dimensions(), (20, 15));
        assert!(small.data().iter().all(|&p| p == 7));
    }

    #[test]
    fn test_inverted() {
        let img = Raster::new(vec![0, 255, 10, 200], 2, 2).unwrap();
        assert_eq!(img.inverted().data(), &[255, 0, 245, 55]);
    }

    proptest! {
        #[test]
        fn prop_from_fn_lookup(w in 1usize..40, h in 1usize..40, x in -50i32..90, y in -50i32..90) {
            let img = Raster::from_fn(w, h, |x, y| ((x * 7 + y * 13) % 256) as u8);
            let cx = x.clamp(0, w as i32 - 1) as usize;
            let cy = y.clamp(0, h as i32 - 1) as usize;
            prop_assert_eq!(img.get_clamped(x, y), img.get(cx, cy));
            prop_assert_eq!(img.get(cx, cy), ((cx * 7 + cy * 13) % 256) as u8);
            prop_assert_eq!(img.data().len(), w * h);
        }
    }
}
