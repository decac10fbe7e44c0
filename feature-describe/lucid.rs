use feature_core::{Described, DescriptorLayout, Descriptor, FloatImage, Keypoint, Raster};

use crate::sampling::describe_binary;

/// Locally uniform comparison image descriptor.
///
/// The row is the rank order of the blurred intensities in the
/// (2 * lucid_kernel + 1)^2 neighbourhood, one byte per pixel.
#[derive(Debug, Clone)]
pub struct LucidDescriptor {
    pub lucid_kernel: usize,
    pub blur_kernel: usize,
}

impl Default for LucidDescriptor {
    fn default() -> Self {
        Self {
            lucid_kernel: 1,
            blur_kernel: 2,
        }
    }
}

impl LucidDescriptor {
    fn bytes(&self) -> usize {
        let side = 2 * self.lucid_kernel + 1;
        side * side
    }
}

impl Descriptor for LucidDescriptor {
    fn name(&self) -> &'static str {
        "LUCID"
    }

    fn layout(&self) -> DescriptorLayout {
        DescriptorLayout::Binary { bytes: self.bytes() }
    }

    fn describe(&self, image: &Raster, keypoints: &[Keypoint]) -> Described {
        let blurred = FloatImage::from_raster(image, 1.0).box_blur(self.blur_kernel);
        let r = self.lucid_kernel as i32;
        let border = (self.lucid_kernel + self.blur_kernel) as f32;
        let bytes = self.bytes();

        describe_binary(keypoints, bytes, |kp| {
            if !image.contains_patch(kp.x, kp.y, border) {
                return None;
            }
            let (cx, cy) = (kp.x.round() as i32, kp.y.round() as i32);
            let mut values: Vec<(f32, u8)> = Vec::with_capacity(bytes);
            for dy in -r..=r {
                for dx in -r..=r {
                    values.push((blurred.get_clamped(cx + dx, cy + dy), values.len() as u8));
                }
            }
            // stable sort keeps raster order among equal intensities
            values.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
            Some(values.into_iter().map(|(_, index)| index).collect())
        })
    }
}
