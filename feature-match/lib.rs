//! Approximate nearest-neighbour matching of binary descriptors.
//!
//! A multi-table LSH index answers k = 2 queries and Lowe's ratio test
//! turns the candidates into a boolean mask aligned with them.

pub mod config;
pub mod error;
pub mod lsh;
pub mod matcher;

pub use config::{LshParams, MatcherConfig, SearchParams, DEFAULT_RATIO};
pub use error::{MatchError, MatchResult};
pub use lsh::{hamming, LshIndex};
pub use matcher::{ratio_mask, ratio_test, MatchCandidate, MatchSet, Matcher, Neighbor, K_NEIGHBORS};
