use feature_core::{Detector, Keypoint, Raster};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::nonlinear::{NonlinearParams, NonlinearScaleSpace};

/// Accelerated KAZE: each octave is diffused at half the previous resolution
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AkazeDetector {
    pub params: NonlinearParams,
}

impl Default for AkazeDetector {
    fn default() -> Self {
        Self {
            params: NonlinearParams {
                downsample: true,
                ..NonlinearParams::default()
            },
        }
    }
}

impl AkazeDetector {
    pub fn scale_space(&self) -> NonlinearScaleSpace {
        NonlinearScaleSpace::new(self.params.clone())
    }
}

impl Detector for AkazeDetector {
    fn name(&self) -> &'static str {
        "AKAZE"
    }

    fn detect(&self, image: &Raster) -> Vec<Keypoint> {
        self.scale_space().detect(image)
    }
}
