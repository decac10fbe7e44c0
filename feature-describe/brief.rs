use feature_core::{retain_inside, Described, DescriptorLayout, Descriptor, IntegralImage, Keypoint, Raster};
use once_cell::sync::Lazy;

use crate::sampling::{describe_binary, gaussian_pairs, pack_bits};

const DESCRIPTOR_SIZE: usize = 32;
const PATCH_SIZE: usize = 48;
const KERNEL_SIZE: usize = 9;

/// 256 test pairs inside the 48x48 patch, sigma = patch / 5
static PAIRS: Lazy<Vec<[f32; 4]>> = Lazy::new(|| {
    let limit = (PATCH_SIZE / 2 - KERNEL_SIZE / 2 - 1) as f32;
    gaussian_pairs(DESCRIPTOR_SIZE * 8, PATCH_SIZE as f32 / 5.0, limit, 42)
});

/// Unsteered BRIEF on box-smoothed intensities
#[derive(Debug, Clone, Default)]
pub struct BriefDescriptor;

impl BriefDescriptor {
    fn smoothed_sum(ii: &IntegralImage, x: i64, y: i64) -> f64 {
        let r = (KERNEL_SIZE / 2) as i64;
        ii.box_sum(x - r, y - r, x + r + 1, y + r + 1)
    }
}

impl Descriptor for BriefDescriptor {
    fn name(&self) -> &'static str {
        "BRIEF"
    }

    fn layout(&self) -> DescriptorLayout {
        DescriptorLayout::Binary { bytes: DESCRIPTOR_SIZE }
    }

    fn describe(&self, image: &Raster, keypoints: &[Keypoint]) -> Described {
        let border = (PATCH_SIZE / 2 + KERNEL_SIZE / 2) as f32;
        let inside = retain_inside(keypoints, image.width(), image.height(), border);
        let ii = IntegralImage::from_raster(image);

        describe_binary(&inside, DESCRIPTOR_SIZE, |kp| {
            let (cx, cy) = (kp.x.round() as i64, kp.y.round() as i64);
            let bits = PAIRS.iter().map(|&[x1, y1, x2, y2]| {
                let a = Self::smoothed_sum(&ii, cx + x1 as i64, cy + y1 as i64);
                let b = Self::smoothed_sum(&ii, cx + x2 as i64, cy + y2 as i64);
                a < b
            });
            Some(pack_bits(bits, DESCRIPTOR_SIZE))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::test_support::{grid_keypoints, hamming, texture};

    #[test]
    fn test_border_keypoints_dropped() {
        let img = texture(80, 80, (0, 0));
        let kps = vec![Keypoint::new(5.0, 5.0), Keypoint::new(40.0, 40.0), Keypoint::new(79.0, 10.0)];
        let described = BriefDescriptor.describe(&img, &kps);
        assert!(described.is_aligned());
        assert_eq!(described.keypoints, vec![Keypoint::new(40.0, 40.0)]);
        assert_eq!(described.descriptors.layout(), DescriptorLayout::Binary { bytes: 32 });
    }

    #[test]
    fn test_shift_invariance() {
        let a = texture(110, 110, (0, 0));
        let b = texture(110, 110, (4, 3));
        let kps_a = grid_keypoints(100, 100, 30, 10, 7.0);
        let kps_b: Vec<Keypoint> = kps_a.iter().map(|k| Keypoint::new(k.x + 4.0, k.y + 3.0)).collect();
        let da = BriefDescriptor.describe(&a, &kps_a);
        let db = BriefDescriptor.describe(&b, &kps_b);
        assert_eq!(da.descriptors.rows(), db.descriptors.rows());
        for (ra, rb) in da.descriptors.binary_rows().zip(db.descriptors.binary_rows()) {
            assert_eq!(ra, rb);
        }
    }

    #[test]
    fn test_distinct_locations_differ() {
        let img = texture(100, 100, (0, 0));
        let kps = vec![Keypoint::new(35.0, 35.0), Keypoint::new(65.0, 60.0)];
        let d = BriefDescriptor.describe(&img, &kps);
        let (Some(r0), Some(r1)) = (d.descriptors.binary_row(0), d.descriptors.binary_row(1)) else {
            panic!("both keypoints should be described");
        };
        assert!(hamming(r0, r1) > 20);
    }

    #[test]
    fn test_no_keypoints() {
        let d = BriefDescriptor.describe(&Raster::filled(50, 50, 0), &[]);
        assert!(d.descriptors.is_empty());
        assert_eq!(d.descriptors.layout().width(), 32);
    }
}
