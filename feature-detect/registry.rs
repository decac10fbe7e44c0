//! Numeric detector ids as used on the command line.

use std::fmt;

use feature_core::{Detector, FeatureError, FeatureResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    AgastDetector, AkazeDetector, BriskDetector, FastDetector, GfttDetector, KazeDetector, MsdDetector,
    OrbDetector, StarDetector,
};

/// Every keypoint detector, in id order starting at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DetectorKind {
    Akaze,
    Kaze,
    Fast,
    Brisk,
    Orb,
    Msd,
    Star,
    Agast,
    Gftt,
}

impl DetectorKind {
    pub const ALL: [DetectorKind; 9] = [
        DetectorKind::Akaze,
        DetectorKind::Kaze,
        DetectorKind::Fast,
        DetectorKind::Brisk,
        DetectorKind::Orb,
        DetectorKind::Msd,
        DetectorKind::Star,
        DetectorKind::Agast,
        DetectorKind::Gftt,
    ];

    pub fn from_id(id: i64) -> Option<Self> {
        if id < 1 {
            return None;
        }
        Self::ALL.get((id - 1) as usize).copied()
    }

    pub fn id(self) -> i64 {
        self as i64 + 1
    }

    pub fn name(self) -> &'static str {
        match self {
            DetectorKind::Akaze => "AKAZE",
            DetectorKind::Kaze => "KAZE",
            DetectorKind::Fast => "FAST",
            DetectorKind::Brisk => "BRISK",
            DetectorKind::Orb => "ORB",
            DetectorKind::Msd => "MSD",
            DetectorKind::Star => "Star",
            DetectorKind::Agast => "AGAST",
            DetectorKind::Gftt => "GFTT",
        }
    }

    /// Instantiate the detector with its default parameters
    pub fn build(self) -> Box<dyn Detector> {
        match self {
            DetectorKind::Akaze => Box::new(AkazeDetector::default()),
            DetectorKind::Kaze => Box::new(KazeDetector::default()),
            DetectorKind::Fast => Box::new(FastDetector::default()),
            DetectorKind::Brisk => Box::new(BriskDetector::default()),
            DetectorKind::Orb => Box::new(OrbDetector::default()),
            DetectorKind::Msd => Box::new(MsdDetector::default()),
            DetectorKind::Star => Box::new(StarDetector::default()),
            DetectorKind::Agast => Box::new(AgastDetector::default()),
            DetectorKind::Gftt => Box::new(GfttDetector::default()),
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<i64> for DetectorKind {
    type Error = FeatureError;

    fn try_from(id: i64) -> FeatureResult<Self> {
        Self::from_id(id).ok_or(FeatureError::UnknownDetector(id))
    }
}

/// Display name for a detector id, "UNKNOWN" outside the registry
pub fn resolve_detector_name(id: i64) -> &'static str {
    DetectorKind::from_id(id).map_or("UNKNOWN", DetectorKind::name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_id_order() {
        let names: Vec<&str> = (1..=9).map(resolve_detector_name).collect();
        assert_eq!(
            names,
            vec!["AKAZE", "KAZE", "FAST", "BRISK", "ORB", "MSD", "Star", "AGAST", "GFTT"]
        );
    }

    #[test]
    fn test_unknown_ids() {
        assert_eq!(resolve_detector_name(0), "UNKNOWN");
        assert_eq!(resolve_detector_name(10), "UNKNOWN");
        assert_eq!(resolve_detector_name(-3), "UNKNOWN");
        assert_eq!(DetectorKind::try_from(12), Err(FeatureError::UnknownDetector(12)));
    }

    #[test]
    fn test_built_detector_reports_registry_name() {
        for kind in DetectorKind::ALL {
            assert_eq!(kind.build().name(), kind.name());
        }
    }

    proptest! {
        #[test]
        fn prop_id_round_trip(id in 1i64..=9) {
            let kind = DetectorKind::from_id(id).unwrap();
            prop_assert_eq!(kind.id(), id);
        }

        #[test]
        fn prop_out_of_range_is_unknown(id in prop_oneof![i64::MIN..1i64, 10i64..i64::MAX]) {
            prop_assert!(DetectorKind::from_id(id).is_none());
            prop_assert_eq!(resolve_detector_name(id), "UNKNOWN");
        }
    }
}
