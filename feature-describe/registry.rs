//! Numeric descriptor ids as used on the command line.

use std::fmt;

use feature_core::{Descriptor, FeatureError, FeatureResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    AkazeDescriptor, BoostDescriptor, BriefDescriptor, BriskDescriptor, DaisyDescriptor, FreakDescriptor,
    KazeDescriptor, LatchDescriptor, LucidDescriptor, OrbDescriptor, VggDescriptor,
};

/// Every descriptor extractor, in id order starting at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DescriptorKind {
    Akaze,
    Kaze,
    Brisk,
    Orb,
    Brief,
    Daisy,
    BoostDesc,
    Freak,
    Latch,
    Lucid,
    Vgg,
}

impl DescriptorKind {
    pub const ALL: [DescriptorKind; 11] = [
        DescriptorKind::Akaze,
        DescriptorKind::Kaze,
        DescriptorKind::Brisk,
        DescriptorKind::Orb,
        DescriptorKind::Brief,
        DescriptorKind::Daisy,
        DescriptorKind::BoostDesc,
        DescriptorKind::Freak,
        DescriptorKind::Latch,
        DescriptorKind::Lucid,
        DescriptorKind::Vgg,
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
            DescriptorKind::Akaze => "AKAZE",
            DescriptorKind::Kaze => "KAZE",
            DescriptorKind::Brisk => "BRISK",
            DescriptorKind::Orb => "ORB",
            DescriptorKind::Brief => "BRIEF",
            DescriptorKind::Daisy => "DAISY",
            DescriptorKind::BoostDesc => "BoostDesc",
            DescriptorKind::Freak => "FREAK",
            DescriptorKind::Latch => "LATCH",
            DescriptorKind::Lucid => "LUCID",
            DescriptorKind::Vgg => "VGG",
        }
    }

    /// Whether rows of this kind are bit strings compared by Hamming distance
    pub fn is_binary(self) -> bool {
        !matches!(self, DescriptorKind::Kaze | DescriptorKind::Daisy | DescriptorKind::Vgg)
    }

    /// Instantiate the extractor with its default parameters
    pub fn build(self) -> Box<dyn Descriptor> {
        match self {
            DescriptorKind::Akaze => Box::new(AkazeDescriptor::default()),
            DescriptorKind::Kaze => Box::new(KazeDescriptor::default()),
            DescriptorKind::Brisk => Box::new(BriskDescriptor),
            DescriptorKind::Orb => Box::new(OrbDescriptor::default()),
            DescriptorKind::Brief => Box::new(BriefDescriptor),
            DescriptorKind::Daisy => Box::new(DaisyDescriptor::default()),
            DescriptorKind::BoostDesc => Box::new(BoostDescriptor::default()),
            DescriptorKind::Freak => Box::new(FreakDescriptor::default()),
            DescriptorKind::Latch => Box::new(LatchDescriptor::default()),
            DescriptorKind::Lucid => Box::new(LucidDescriptor::default()),
            DescriptorKind::Vgg => Box::new(VggDescriptor::default()),
        }
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<i64> for DescriptorKind {
    type Error = FeatureError;

    fn try_from(id: i64) -> FeatureResult<Self> {
        Self::from_id(id).ok_or(FeatureError::UnknownDescriptor(id))
    }
}

/// Display name for a descriptor id, "UNKNOWN" outside the registry
pub fn resolve_descriptor_name(id: i64) -> &'static str {
    DescriptorKind::from_id(id).map_or("UNKNOWN", DescriptorKind::name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_id_order() {
        let names: Vec<&str> = (1..=11).map(resolve_descriptor_name).collect();
        assert_eq!(
            names,
            vec!["AKAZE", "KAZE", "BRISK", "ORB", "BRIEF", "DAISY", "BoostDesc", "FREAK", "LATCH", "LUCID", "VGG"]
        );
    }

    #[test]
    fn test_unknown_ids() {
        assert_eq!(resolve_descriptor_name(0), "UNKNOWN");
        assert_eq!(resolve_descriptor_name(12), "UNKNOWN");
        assert_eq!(DescriptorKind::try_from(-1), Err(FeatureError::UnknownDescriptor(-1)));
    }

    #[test]
    fn test_built_extractor_matches_registry() {
        for kind in DescriptorKind::ALL {
            let extractor = kind.build();
            assert_eq!(extractor.name(), kind.name());
            assert_eq!(extractor.layout().is_binary(), kind.is_binary());
        }
    }

    proptest! {
        #[test]
        fn prop_id_round_trip(id in 1i64..=11) {
            let kind = DescriptorKind::from_id(id).unwrap();
            prop_assert_eq!(kind.id(), id);
        }

        #[test]
        fn prop_out_of_range_is_unknown(id in prop_oneof![i64::MIN..1i64, 12i64..i64::MAX]) {
            prop_assert!(DescriptorKind::try_from(id).is_err());
            prop_assert_eq!(resolve_descriptor_name(id), "UNKNOWN");
        }
    }
}
