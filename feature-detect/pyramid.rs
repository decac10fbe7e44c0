use feature_core::Raster;

/// Scale information for pyramid levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLevel {
    pub level: usize,
    pub scale: f32,
    pub width: usize,
    pub height: usize,
}

/// Image pyramid operations for multi-scale feature detection
pub struct ImagePyramid;

impl ImagePyramid {
    /// Geometric scale levels, stopping before a side drops under `min_size`
    pub fn generate_scale_levels(
        width: usize,
        height: usize,
        scale_factor: f32,
        max_levels: usize,
        min_size: usize,
    ) -> Vec<ScaleLevel> {
        let mut levels = Vec::new();
        let mut current_scale = 1.0f32;

        for level in 0..max_levels {
            let scaled_width = ((width as f32) / current_scale).round() as usize;
            let scaled_height = ((height as f32) / current_scale).round() as usize;

            // Stop when image becomes too small for meaningful detection
            if scaled_width < min_size || scaled_height < min_size {
                break;
            }

            levels.push(ScaleLevel {
                level,
                scale: current_scale,
                width: scaled_width,
                height: scaled_height,
            });
            current_scale *= scale_factor;
        }

        levels
    }

    /// Build image pyramid from base image
    pub fn build(img: &Raster, scale_levels: &[ScaleLevel]) -> Vec<Raster> {
        scale_levels
            .iter()
            .map(|scale_level| {
                if scale_level.level == 0 {
                    img.clone()
                } else {
                    img.resized(scale_level.width, scale_level.height)
                }
            })
            .collect()
    }
}
