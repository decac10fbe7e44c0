//! Descriptor extractors. Binary rows (AKAZE, BRISK, ORB, BRIEF,
//! BoostDesc, FREAK, LATCH, LUCID) are compared by Hamming distance;
//! KAZE, DAISY and VGG produce float rows.

pub mod akaze;
pub mod boost;
pub mod brief;
pub mod brisk;
pub mod daisy;
pub mod freak;
pub mod kaze;
pub mod latch;
pub mod lucid;
pub mod orb;
pub mod registry;
pub mod sampling;
pub mod vgg;

pub use akaze::AkazeDescriptor;
pub use boost::BoostDescriptor;
pub use brief::BriefDescriptor;
pub use brisk::BriskDescriptor;
pub use daisy::DaisyDescriptor;
pub use freak::FreakDescriptor;
pub use kaze::KazeDescriptor;
pub use latch::LatchDescriptor;
pub use lucid::LucidDescriptor;
pub use orb::OrbDescriptor;
pub use registry::{resolve_descriptor_name, DescriptorKind};
pub use vgg::VggDescriptor;
