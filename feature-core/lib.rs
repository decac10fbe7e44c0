//! Shared vocabulary for the feature2d workspace: rasters, keypoints,
//! regions, descriptor matrices and the traits every algorithm provider
//! implements.

pub mod descriptor;
pub mod error;
pub mod filters;
pub mod keypoint;
pub mod raster;
pub mod traits;

pub use descriptor::{Described, DescriptorLayout, DescriptorMatrix};
pub use error::{FeatureError, FeatureResult};
pub use filters::{FloatImage, IntegralImage};
pub use keypoint::{retain_inside, Keypoint, Region};
pub use raster::Raster;
pub use traits::{Descriptor, Detector, RegionDetector};

/// Default number of worker threads used by the providers
pub fn default_threads() -> usize {
    num_cpus::get().max(1)
}

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads.max(1))
        .build_global()
}
