use feature_core::FeatureError;
use feature_match::MatchError;
use thiserror::Error;

/// Failures surfaced to the caller of a pipeline or the CLI.
///
/// Empty results are reported through [`crate::Output::Nothing`] instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid task {0} (expected 1 detect, 2 match, 3 regions)")]
    InvalidTask(i64),

    #[error("missing {0}")]
    MissingInput(&'static str),

    #[error("{0} pipeline has not been extracted yet")]
    NotExtracted(&'static str),

    #[error("not supported: {0}")]
    Unsupported(&'static str),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

impl From<rayon::ThreadPoolBuildError> for PipelineError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        PipelineError::ThreadPool(err.to_string())
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
