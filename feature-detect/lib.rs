//! Keypoint detectors (FAST, AGAST, ORB, BRISK, GFTT, Star, MSD, KAZE,
//! AKAZE), the MSER region detector and the id registry used to pick one.

pub mod agast;
pub mod akaze;
pub mod brisk;
pub mod fast;
pub mod gftt;
pub mod kaze;
pub mod msd;
pub mod mser;
pub mod nonlinear;
pub mod orb;
pub mod pyramid;
pub mod refinement;
pub mod registry;
pub mod segment;
pub mod star;
pub mod structure;

pub use agast::{AgastDetector, AgastMask};
pub use akaze::AkazeDetector;
pub use brisk::BriskDetector;
pub use fast::FastDetector;
pub use gftt::GfttDetector;
pub use kaze::KazeDetector;
pub use msd::MsdDetector;
pub use mser::MserDetector;
pub use nonlinear::{Evolution, NonlinearParams, NonlinearScaleSpace};
pub use orb::OrbDetector;
pub use registry::{resolve_detector_name, DetectorKind};
pub use star::StarDetector;
