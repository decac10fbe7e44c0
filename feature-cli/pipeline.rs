//! Per-image orchestration: detection, description, matching and the
//! region-only variant.

use std::fmt;
use std::path::Path;

use feature_core::{Descriptor, DescriptorMatrix, Detector, FeatureError, Keypoint, Raster, Region, RegionDetector};
use feature_describe::DescriptorKind;
use feature_detect::{DetectorKind, MserDetector};
use feature_match::{MatchSet, Matcher, MatcherConfig};
use image::{imageops, RgbImage};
use log::{debug, info, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::render;

/// Why an operation produced nothing. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absence {
    NoDetector,
    NoKeypoints,
    NoRegions,
    NoMatches,
    NotRequested,
}

impl fmt::Display for Absence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Absence::NoDetector => "no detector bound",
            Absence::NoKeypoints => "keypoints not found",
            Absence::NoRegions => "regions not found",
            Absence::NoMatches => "invalid matches",
            Absence::NotRequested => "no rendering requested",
        };
        f.write_str(msg)
    }
}

/// Result of a step that may legitimately have nothing to show
#[derive(Debug, Clone, PartialEq)]
pub enum Output<T> {
    Produced(T),
    Nothing(Absence),
}

impl<T> Output<T> {
    pub fn is_produced(&self) -> bool {
        matches!(self, Output::Produced(_))
    }

    pub fn absence(&self) -> Option<Absence> {
        match self {
            Output::Produced(_) => None,
            Output::Nothing(why) => Some(*why),
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Output::Produced(value) => Some(value),
            Output::Nothing(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    Constructed,
    Extracted,
    Matched,
}

/// Decoded input: the colour image for rendering and its grayscale raster
#[derive(Debug, Clone)]
pub struct SourceImage {
    color: RgbImage,
    gray: Raster,
}

impl SourceImage {
    pub fn open<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let decoded = image::open(path)?;
        debug!("loaded {} ({}x{})", path.display(), decoded.width(), decoded.height());
        Self::from_rgb(decoded.to_rgb8())
    }

    pub fn from_rgb(color: RgbImage) -> PipelineResult<Self> {
        let luma = imageops::grayscale(&color);
        let (w, h) = luma.dimensions();
        let gray = Raster::new(luma.into_raw(), w as usize, h as usize)?;
        Ok(Self { color, gray })
    }

    /// Colour copy of a grayscale raster, mostly for tests and synthetic input
    pub fn from_gray(gray: Raster) -> Self {
        let color = RgbImage::from_fn(gray.width() as u32, gray.height() as u32, |x, y| {
            let v = gray.get(x as usize, y as usize);
            image::Rgb([v, v, v])
        });
        Self { color, gray }
    }

    pub fn color(&self) -> &RgbImage {
        &self.color
    }

    pub fn gray(&self) -> &Raster {
        &self.gray
    }
}

/// One image bound to a detector and a descriptor, matchable against
/// another pipeline with a compatible descriptor.
pub struct FeaturePipeline {
    image: SourceImage,
    detector: Option<Box<dyn Detector>>,
    descriptor: Box<dyn Descriptor>,
    matcher: Option<Matcher>,
    keypoints: Vec<Keypoint>,
    descriptors: DescriptorMatrix,
    matches: Option<MatchSet>,
    state: PipelineState,
}

impl FeaturePipeline {
    /// Resolve both ids, then load the image. Unknown ids fail before any I/O.
    pub fn new<P: AsRef<Path>>(path: P, detector_id: i64, descriptor_id: i64) -> PipelineResult<Self> {
        let detector = DetectorKind::try_from(detector_id)?;
        let descriptor = DescriptorKind::try_from(descriptor_id)?;
        info!("detector: {}, descriptor: {}", detector, descriptor);
        let image = SourceImage::open(path)?;
        Ok(Self::with_kinds(image, detector, descriptor))
    }

    pub fn with_kinds(image: SourceImage, detector: DetectorKind, descriptor: DescriptorKind) -> Self {
        Self::from_parts(image, Some(detector.build()), descriptor.build())
    }

    pub fn from_parts(image: SourceImage, detector: Option<Box<dyn Detector>>, descriptor: Box<dyn Descriptor>) -> Self {
        let descriptors = DescriptorMatrix::empty(descriptor.layout());
        Self {
            image,
            detector,
            descriptor,
            matcher: None,
            keypoints: Vec::new(),
            descriptors,
            matches: None,
            state: PipelineState::Constructed,
        }
    }

    /// Detect and describe, replacing any earlier result.
    ///
    /// Keypoints the descriptor could not describe are dropped so that
    /// keypoint `i` always owns descriptor row `i`.
    pub fn extract(&mut self, render: bool) -> PipelineResult<Output<RgbImage>> {
        let Some(detector) = self.detector.as_ref() else {
            warn!("no detector bound, nothing extracted");
            return Ok(Output::Nothing(Absence::NoDetector));
        };

        let detected = detector.detect(&self.image.gray);
        let described = self.descriptor.describe(&self.image.gray, &detected);
        if !described.is_aligned() {
            return Err(FeatureError::Misaligned {
                name: self.descriptor.name(),
                rows: described.descriptors.rows(),
                keypoints: described.keypoints.len(),
            }
            .into());
        }
        if described.keypoints.len() < detected.len() {
            debug!(
                "{} dropped {} of {} keypoints",
                self.descriptor.name(),
                detected.len() - described.keypoints.len(),
                detected.len()
            );
        }
        info!("keypoints: {}, descriptors: {}", detected.len(), described.descriptors.size());

        self.keypoints = described.keypoints;
        self.descriptors = described.descriptors;
        self.matches = None;
        self.state = PipelineState::Extracted;

        if render {
            Ok(self.render_detections())
        } else {
            Ok(Output::Nothing(Absence::NotRequested))
        }
    }

    /// k = 2 query of every own descriptor among `other`'s, then the ratio
    /// test. `other` is only read.
    pub fn match_with(&mut self, other: &FeaturePipeline, render: bool) -> PipelineResult<Output<RgbImage>> {
        if self.state < PipelineState::Extracted {
            return Err(PipelineError::NotExtracted("query"));
        }
        if other.state < PipelineState::Extracted {
            return Err(PipelineError::NotExtracted("partner"));
        }

        let matcher = match self.matcher.take() {
            Some(matcher) => matcher,
            None => {
                let matcher = Matcher::new(MatcherConfig::default())?;
                debug!("matcher: {}", matcher.config().summary());
                matcher
            }
        };
        let result = matcher.match_descriptors(&self.descriptors, &other.descriptors);
        self.matcher = Some(matcher);
        let set = result?;

        info!("good matches: {} of {}", set.accepted_count(), set.len());
        self.matches = Some(set);
        self.state = PipelineState::Matched;

        if render {
            Ok(self.render_matches(other))
        } else {
            Ok(Output::Nothing(Absence::NotRequested))
        }
    }

    pub fn render_detections(&self) -> Output<RgbImage> {
        if self.keypoints.is_empty() {
            warn!("{}", Absence::NoKeypoints);
            return Output::Nothing(Absence::NoKeypoints);
        }
        Output::Produced(render::draw_keypoints(&self.image.color, &self.keypoints))
    }

    pub fn render_matches(&self, other: &FeaturePipeline) -> Output<RgbImage> {
        if self.keypoints.is_empty() || other.keypoints.is_empty() {
            warn!("{}", Absence::NoKeypoints);
            return Output::Nothing(Absence::NoKeypoints);
        }
        let Some(set) = self.matches.as_ref().filter(|set| !set.is_empty()) else {
            warn!("{}", Absence::NoMatches);
            return Output::Nothing(Absence::NoMatches);
        };
        Output::Produced(render::draw_matches(
            &self.image.color,
            &self.keypoints,
            &other.image.color,
            &other.keypoints,
            &set.candidates,
            &set.mask,
        ))
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn image(&self) -> &SourceImage {
        &self.image
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn descriptors(&self) -> &DescriptorMatrix {
        &self.descriptors
    }

    pub fn matches(&self) -> Option<&MatchSet> {
        self.matches.as_ref()
    }

    pub fn matcher_config(&self) -> Option<&MatcherConfig> {
        self.matcher.as_ref().map(Matcher::config)
    }

    pub fn detector_name(&self) -> Option<&'static str> {
        self.detector.as_ref().map(|d| d.name())
    }

    pub fn descriptor_name(&self) -> &'static str {
        self.descriptor.name()
    }
}

impl fmt::Debug for FeaturePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeaturePipeline")
            .field("detector", &self.detector_name())
            .field("descriptor", &self.descriptor.name())
            .field("state", &self.state)
            .field("keypoints", &self.keypoints.len())
            .field("descriptors", &self.descriptors.layout())
            .finish()
    }
}

/// Region detection on one image. There is no descriptor step and regions
/// cannot be matched.
pub struct RegionPipeline {
    image: SourceImage,
    detector: Box<dyn RegionDetector>,
    regions: Vec<Region>,
}

impl RegionPipeline {
    pub fn new<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        Ok(Self::with_image(SourceImage::open(path)?))
    }

    pub fn with_image(image: SourceImage) -> Self {
        Self::from_parts(image, Box::new(MserDetector::default()))
    }

    pub fn from_parts(image: SourceImage, detector: Box<dyn RegionDetector>) -> Self {
        Self {
            image,
            detector,
            regions: Vec::new(),
        }
    }

    pub fn detect(&mut self, render: bool) -> PipelineResult<Output<RgbImage>> {
        self.regions = self.detector.detect_regions(&self.image.gray);
        info!("{} regions: {}", self.detector.name(), self.regions.len());
        if render {
            Ok(self.render_regions())
        } else {
            Ok(Output::Nothing(Absence::NotRequested))
        }
    }

    pub fn render_regions(&self) -> Output<RgbImage> {
        if self.regions.is_empty() {
            warn!("{}", Absence::NoRegions);
            return Output::Nothing(Absence::NoRegions);
        }
        Output::Produced(render::draw_region_hulls(&self.image.color, &self.regions))
    }

    /// Always fails: regions carry no descriptors to compare
    pub fn match_with(&self, _other: &RegionPipeline, _render: bool) -> PipelineResult<Output<RgbImage>> {
        warn!("{} can't do keypoint matching", self.detector.name());
        Err(PipelineError::Unsupported("matching region pipelines"))
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn image(&self) -> &SourceImage {
        &self.image
    }
}
