use thiserror::Error;

/// Errors raised while binding algorithms or validating inputs.
///
/// Empty results (no keypoints, no descriptors) are not errors and never
/// show up here.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FeatureError {
    #[error("invalid detector id {0} (expected 1-9)")]
    UnknownDetector(i64),

    #[error("invalid descriptor id {0} (expected 1-11)")]
    UnknownDescriptor(i64),

    #[error("invalid image dimensions: {width}x{height} (must be > 0)")]
    InvalidImageSize { width: usize, height: usize },

    #[error("image data length mismatch: expected {expected_len}, got {actual_len}")]
    InvalidImageData { expected_len: usize, actual_len: usize },

    #[error("descriptor provider {name} returned {rows} rows for {keypoints} keypoints")]
    Misaligned {
        name: &'static str,
        rows: usize,
        keypoints: usize,
    },
}

pub type FeatureResult<T> = Result<T, FeatureError>;
