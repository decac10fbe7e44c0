use feature_core::{DescriptorLayout, DescriptorMatrix};
use log::debug;
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::MatcherConfig;
use crate::error::{MatchError, MatchResult};
use crate::lsh::LshIndex;

/// Neighbours requested per query descriptor
pub const K_NEIGHBORS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Neighbor {
    pub train_index: usize,
    pub distance: f32,
}

/// Up to k nearest train descriptors for one query descriptor, closest first
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchCandidate {
    pub query_index: usize,
    pub neighbors: Vec<Neighbor>,
}

impl MatchCandidate {
    pub fn best(&self) -> Option<&Neighbor> {
        self.neighbors.first()
    }
}

/// Lowe's ratio test: accept iff `nearest < ratio * second` (strict)
#[inline]
pub fn ratio_test(nearest: f32, second: f32, ratio: f32) -> bool {
    nearest < ratio * second
}

/// One flag per candidate, false when fewer than two neighbours were found
pub fn ratio_mask(candidates: &[MatchCandidate], ratio: f32) -> Vec<bool> {
    candidates
        .iter()
        .map(|c| match c.neighbors.as_slice() {
            [first, second, ..] => ratio_test(first.distance, second.distance, ratio),
            _ => false,
        })
        .collect()
}

/// Candidates of one match call and the ratio-test mask aligned with them
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchSet {
    pub candidates: Vec<MatchCandidate>,
    pub mask: Vec<bool>,
}

impl MatchSet {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn accepted_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    /// (query index, train index) of every candidate that passed
    pub fn accepted(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.candidates
            .iter()
            .zip(&self.mask)
            .filter(|(_, keep)| **keep)
            .filter_map(|(c, _)| c.best().map(|n| (c.query_index, n.train_index)))
    }
}

/// Approximate k-NN matcher for binary descriptors
#[derive(Debug, Clone)]
pub struct Matcher {
    config: MatcherConfig,
}

impl Matcher {
    pub fn new(config: MatcherConfig) -> MatchResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    fn binary_width(query: &DescriptorMatrix, train: &DescriptorMatrix) -> MatchResult<usize> {
        match (query.layout(), train.layout()) {
            (DescriptorLayout::Binary { bytes: q }, DescriptorLayout::Binary { bytes: t }) if q == t => Ok(q),
            (query, train) => Err(MatchError::IncompatibleDescriptors { query, train }),
        }
    }

    /// Up to `k` nearest train rows for every query row, in query order
    pub fn knn_match(
        &self,
        query: &DescriptorMatrix,
        train: &DescriptorMatrix,
        k: usize,
    ) -> MatchResult<Vec<MatchCandidate>> {
        let bytes = Self::binary_width(query, train)?;
        let index = LshIndex::build(train.binary_rows().collect(), bytes, &self.config.index);
        let checks = self.config.search.checks;
        let queries: Vec<&[u8]> = query.binary_rows().collect();

        Ok(queries
            .par_iter()
            .enumerate()
            .map(|(query_index, row)| MatchCandidate {
                query_index,
                neighbors: index
                    .knn(row, k, checks)
                    .into_iter()
                    .map(|(train_index, d)| Neighbor {
                        train_index,
                        distance: d as f32,
                    })
                    .collect(),
            })
            .collect())
    }

    /// k = 2 query followed by the ratio test
    pub fn match_descriptors(&self, query: &DescriptorMatrix, train: &DescriptorMatrix) -> MatchResult<MatchSet> {
        let candidates = self.knn_match(query, train, K_NEIGHBORS)?;
        let mask = ratio_mask(&candidates, self.config.ratio);
        let set = MatchSet { candidates, mask };
        debug!(
            "matched {} query rows against {}: {} accepted",
            query.rows(),
            train.rows(),
            set.accepted_count()
        );
        Ok(set)
    }
}
