use feature_core::DescriptorLayout;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchError {
    #[error("LSH matching needs binary descriptors of equal width, got {query} and {train}")]
    IncompatibleDescriptors {
        query: DescriptorLayout,
        train: DescriptorLayout,
    },

    #[error("invalid matcher configuration: {0}")]
    InvalidConfig(String),
}

pub type MatchResult<T> = Result<T, MatchError>;
