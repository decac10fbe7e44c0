use feature_cli::{
    Absence, DescriptorKind, DetectorKind, FeaturePipeline, Output, PipelineError, PipelineState, RegionPipeline,
    SourceImage,
};
use feature_core::{Keypoint, Raster};
use feature_match::MatchError;
use proptest::prelude::*;

/// Blocky pseudo-random texture; `shift` moves the content right/down
fn texture(width: usize, height: usize, seed: u32, shift: (usize, usize)) -> Raster {
    Raster::from_fn(width, height, |x, y| {
        let (bx, by) = (((x + 600 - shift.0) / 6) as u32, ((y + 600 - shift.1) / 6) as u32);
        let mut v = bx.wrapping_mul(73_856_093) ^ by.wrapping_mul(19_349_663) ^ seed.wrapping_mul(83_492_791);
        v ^= v >> 13;
        v = v.wrapping_mul(0x5bd1_e995);
        v ^= v >> 15;
        (v & 0xff) as u8
    })
}

fn pipeline(image: Raster, detector: DetectorKind, descriptor: DescriptorKind) -> FeaturePipeline {
    FeaturePipeline::with_kinds(SourceImage::from_gray(image), detector, descriptor)
}

fn consistent(a: &Keypoint, b: &Keypoint, shift: (f32, f32)) -> bool {
    (b.x - a.x - shift.0).abs() <= 2.0 && (b.y - a.y - shift.1).abs() <= 2.0
}

fn assert_shift_recovered(detector: DetectorKind, descriptor: DescriptorKind) {
    let mut a = pipeline(texture(240, 240, 11, (0, 0)), detector, descriptor);
    let mut b = pipeline(texture(240, 240, 11, (6, 4)), detector, descriptor);
    a.extract(false).unwrap();
    b.extract(false).unwrap();

    let out = a.match_with(&b, true).unwrap();
    assert!(out.is_produced());
    assert_eq!(a.state(), PipelineState::Matched);

    let set = a.matches().unwrap();
    let accepted: Vec<(usize, usize)> = set.accepted().collect();
    let good = accepted
        .iter()
        .filter(|&&(q, t)| consistent(&a.keypoints()[q], &b.keypoints()[t], (6.0, 4.0)))
        .count();
    assert!(accepted.len() > 20, "{}/{}: only {} accepted", detector, descriptor, accepted.len());
    assert!(2 * good > accepted.len(), "{}/{}: {} of {} consistent", detector, descriptor, good, accepted.len());
}

#[test]
fn test_shifted_scene_orb() {
    assert_shift_recovered(DetectorKind::Orb, DescriptorKind::Orb);
}

#[test]
fn test_shifted_scene_fast_brief() {
    assert_shift_recovered(DetectorKind::Fast, DescriptorKind::Brief);
}

#[test]
fn test_uniform_image_has_nothing_to_render() {
    for detector in DetectorKind::ALL {
        let mut p = pipeline(Raster::filled(96, 96, 128), detector, DescriptorKind::Orb);
        let out = p.extract(true).unwrap();
        assert_eq!(out.absence(), Some(Absence::NoKeypoints), "{}", detector);
        assert!(p.keypoints().is_empty());
        assert!(p.descriptors().is_empty());
        assert_eq!(p.descriptors().layout().width(), 32);
    }
}

#[test]
fn test_unrelated_images_match_little() {
    let mut a = pipeline(texture(240, 240, 1, (0, 0)), DetectorKind::Orb, DescriptorKind::Orb);
    let mut b = pipeline(texture(240, 240, 2, (0, 0)), DetectorKind::Orb, DescriptorKind::Orb);
    a.extract(false).unwrap();
    b.extract(false).unwrap();
    a.match_with(&b, false).unwrap();
    let set = a.matches().unwrap();
    assert!(!set.is_empty());
    assert!(set.accepted_count() * 10 <= set.len() + 20, "{} of {}", set.accepted_count(), set.len());
}

#[test]
fn test_unknown_ids_rejected_before_io() {
    for (k, d) in [(0, 1), (10, 1), (12, 1), (1, 0), (1, 12)] {
        let err = FeaturePipeline::new("no/such/image.png", k, d).unwrap_err();
        assert!(matches!(err, PipelineError::Feature(_)), "({}, {}) gave {}", k, d, err);
    }
    assert!(matches!(
        FeaturePipeline::new("no/such/image.png", 1, 1),
        Err(PipelineError::Image(_))
    ));
}

#[test]
fn test_extract_is_idempotent() {
    let mut p = pipeline(texture(128, 128, 4, (0, 0)), DetectorKind::Brisk, DescriptorKind::Freak);
    p.extract(false).unwrap();
    let keypoints = p.keypoints().to_vec();
    let descriptors = p.descriptors().clone();
    p.extract(false).unwrap();
    assert_eq!(p.keypoints(), keypoints.as_slice());
    assert_eq!(p.descriptors(), &descriptors);
}

#[test]
fn test_reextract_clears_matches() {
    let mut a = pipeline(texture(128, 128, 4, (0, 0)), DetectorKind::Fast, DescriptorKind::Orb);
    let mut b = pipeline(texture(128, 128, 4, (3, 0)), DetectorKind::Fast, DescriptorKind::Orb);
    a.extract(false).unwrap();
    b.extract(false).unwrap();
    a.match_with(&b, false).unwrap();
    assert!(a.matches().is_some());
    a.extract(false).unwrap();
    assert!(a.matches().is_none());
    assert_eq!(a.state(), PipelineState::Extracted);
    assert_eq!(a.render_matches(&b), Output::Nothing(Absence::NoMatches));
}

#[test]
fn test_float_descriptors_fail_fast() {
    let mut a = pipeline(texture(96, 96, 5, (0, 0)), DetectorKind::Fast, DescriptorKind::Daisy);
    let mut b = pipeline(texture(96, 96, 5, (2, 2)), DetectorKind::Fast, DescriptorKind::Daisy);
    a.extract(false).unwrap();
    b.extract(false).unwrap();
    assert!(matches!(
        a.match_with(&b, false),
        Err(PipelineError::Match(MatchError::IncompatibleDescriptors { .. }))
    ));
    assert!(a.matches().is_none());
}

#[test]
fn test_mismatched_binary_widths_fail_fast() {
    let mut a = pipeline(texture(96, 96, 6, (0, 0)), DetectorKind::Fast, DescriptorKind::Orb);
    let mut b = pipeline(texture(96, 96, 6, (0, 0)), DetectorKind::Fast, DescriptorKind::Brisk);
    a.extract(false).unwrap();
    b.extract(false).unwrap();
    assert!(matches!(a.match_with(&b, false), Err(PipelineError::Match(_))));
}

#[test]
fn test_region_pipeline() {
    let img = Raster::from_fn(120, 120, |x, y| {
        let inside = (30..70).contains(&x) && (40..80).contains(&y);
        if inside {
            30
        } else {
            200
        }
    });
    let mut regions = RegionPipeline::with_image(SourceImage::from_gray(img));
    let out = regions.detect(true).unwrap();
    assert!(out.is_produced());
    assert!(!regions.regions().is_empty());

    let other = RegionPipeline::with_image(SourceImage::from_gray(Raster::filled(20, 20, 0)));
    assert!(matches!(regions.match_with(&other, true), Err(PipelineError::Unsupported(_))));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_descriptors_never_exceed_keypoints(detector_id in 1i64..=9, descriptor_id in 1i64..=11) {
        let detector = DetectorKind::from_id(detector_id).unwrap().build();
        let descriptor = DescriptorKind::from_id(descriptor_id).unwrap().build();
        let img = texture(96, 96, 9, (0, 0));
        let keypoints = detector.detect(&img);
        let described = descriptor.describe(&img, &keypoints);
        prop_assert!(described.descriptors.rows() <= keypoints.len());
        prop_assert!(described.is_aligned());
        prop_assert_eq!(described.descriptors.layout(), descriptor.layout());
    }

    #[test]
    fn prop_mask_aligned_with_candidates(descriptor_id in prop::sample::select(vec![1i64, 3, 4, 5, 7, 8, 9, 10])) {
        let kind = DescriptorKind::from_id(descriptor_id).unwrap();
        let mut a = pipeline(texture(112, 112, 3, (0, 0)), DetectorKind::Fast, kind);
        let mut b = pipeline(texture(112, 112, 3, (4, 2)), DetectorKind::Fast, kind);
        a.extract(false).unwrap();
        b.extract(false).unwrap();
        a.match_with(&b, false).unwrap();
        let set = a.matches().unwrap();
        prop_assert_eq!(set.mask.len(), set.candidates.len());
        prop_assert_eq!(set.candidates.len(), a.descriptors().rows());
        for (i, candidate) in set.candidates.iter().enumerate() {
            prop_assert_eq!(candidate.query_index, i);
        }
    }
}
