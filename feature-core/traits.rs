use crate::descriptor::{Described, DescriptorLayout};
use crate::keypoint::{Keypoint, Region};
use crate::raster::Raster;

/// Point-keypoint producing algorithm.
///
/// Implementations are bound to their parameters at construction and do no
/// work until `detect` is called.
pub trait Detector: Send + Sync {
    /// Stable algorithm name, e.g. `"FAST"`
    fn name(&self) -> &'static str;

    /// Detect keypoints in a grayscale image, strongest first
    fn detect(&self, image: &Raster) -> Vec<Keypoint>;
}

/// Algorithm turning keypoints into descriptor rows.
///
/// The keypoints must come from a detector run on the same image. A
/// provider may drop keypoints it cannot describe; the returned
/// [`Described`] carries the surviving subset, index-aligned with the rows.
pub trait Descriptor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Row layout produced by this provider, also for zero keypoints
    fn layout(&self) -> DescriptorLayout;

    fn describe(&self, image: &Raster, keypoints: &[Keypoint]) -> Described;
}

/// Algorithm producing connected regions instead of point keypoints
pub trait RegionDetector: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect_regions(&self, image: &Raster) -> Vec<Region>;
}
