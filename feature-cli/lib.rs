//! High-level entry points: the per-image [`FeaturePipeline`], the
//! region-only [`RegionPipeline`], rendering helpers and the task runner
//! behind the `feature2d` binary.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod render;

use std::path::PathBuf;

use image::RgbImage;

pub use config::CliConfig;
pub use error::{PipelineError, PipelineResult};
pub use feature_core::{self, default_threads, init_thread_pool};
pub use feature_describe::{resolve_descriptor_name, DescriptorKind};
pub use feature_detect::{resolve_detector_name, DetectorKind};
pub use feature_match::{MatchSet, MatcherConfig};
pub use pipeline::{Absence, FeaturePipeline, Output, PipelineState, RegionPipeline, SourceImage};

/// What the command line asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Detect,
    Match,
    Regions,
}

impl TryFrom<i64> for Task {
    type Error = PipelineError;

    fn try_from(id: i64) -> PipelineResult<Self> {
        match id {
            1 => Ok(Task::Detect),
            2 => Ok(Task::Match),
            3 => Ok(Task::Regions),
            other => Err(PipelineError::InvalidTask(other)),
        }
    }
}

/// A validated-on-run description of one invocation
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub task: Task,
    pub detector: Option<i64>,
    pub descriptor: Option<i64>,
    pub input1: PathBuf,
    pub input2: Option<PathBuf>,
}

impl RunRequest {
    fn algorithm_ids(&self) -> PipelineResult<(i64, i64)> {
        let detector = self.detector.ok_or(PipelineError::MissingInput("detector id (-k)"))?;
        let descriptor = self.descriptor.ok_or(PipelineError::MissingInput("descriptor id (-d)"))?;
        // both resolve before either image is opened
        DetectorKind::try_from(detector)?;
        DescriptorKind::try_from(descriptor)?;
        Ok((detector, descriptor))
    }
}

/// Run one task and return the image to write, if any.
///
/// All argument validation happens before the first image is decoded.
pub fn run(request: &RunRequest) -> PipelineResult<Output<RgbImage>> {
    match request.task {
        Task::Detect => {
            let (k, d) = request.algorithm_ids()?;
            let mut pipeline = FeaturePipeline::new(&request.input1, k, d)?;
            pipeline.extract(true)
        }
        Task::Match => {
            let (k, d) = request.algorithm_ids()?;
            let input2 = request
                .input2
                .as_ref()
                .ok_or(PipelineError::MissingInput("second input image for matching (-j)"))?;
            let mut first = FeaturePipeline::new(&request.input1, k, d)?;
            first.extract(false)?;
            let mut second = FeaturePipeline::new(input2, k, d)?;
            second.extract(false)?;
            first.match_with(&second, true)
        }
        Task::Regions => {
            let mut pipeline = RegionPipeline::new(&request.input1)?;
            pipeline.detect(true)
        }
    }
}
