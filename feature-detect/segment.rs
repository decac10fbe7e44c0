//! Accelerated segment test shared by FAST, AGAST and the pyramid detectors.

use feature_core::Raster;
use rayon::prelude::*;

use crate::refinement::local_maxima_3x3;

/// Circle of pixels tested around a candidate plus the required arc length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentMask {
    pub offsets: &'static [(i32, i32)],
    pub arc: usize,
    pub radius: i32,
}

/// Bresenham circle of radius 3 (16 pixels), 9 contiguous
pub const MASK_9_16: SegmentMask = SegmentMask {
    offsets: &[
        (0, -3), (1, -3), (2, -2), (3, -1),
        (3, 0), (3, 1), (2, 2), (1, 3),
        (0, 3), (-1, 3), (-2, 2), (-3, 1),
        (-3, 0), (-3, -1), (-2, -2), (-1, -3),
    ],
    arc: 9,
    radius: 3,
};

/// Diamond of radius 2 (12 pixels), 7 contiguous
pub const MASK_7_12: SegmentMask = SegmentMask {
    offsets: &[
        (0, -2), (1, -2), (2, -1), (2, 0),
        (2, 1), (1, 2), (0, 2), (-1, 2),
        (-2, 1), (-2, 0), (-2, -1), (-1, -2),
    ],
    arc: 7,
    radius: 2,
};

/// 8-neighbourhood ring, 5 contiguous
pub const MASK_5_8: SegmentMask = SegmentMask {
    offsets: &[(0, -1), (1, -1), (1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1)],
    arc: 5,
    radius: 1,
};

/// Check for at least `arc` consecutive set bits in an `n`-bit circular mask
pub fn has_arc(mask: u32, n: usize, arc: usize) -> bool {
    if arc == 0 || arc > n || n > 32 {
        return false;
    }
    let full = if n == 32 { u32::MAX } else { (1u32 << n) - 1 };
    let mask = mask & full;
    let mut test_mask = mask;
    for i in 1..arc {
        // Rotate left with wrap-around inside n bits
        let shifted = ((mask << i) | (mask >> (n - i))) & full;
        test_mask &= shifted;
        if test_mask == 0 {
            return false;
        }
    }
    test_mask != 0
}

/// Segment-test score at (x, y), `None` when the pixel is not a corner.
///
/// The score is the summed absolute difference beyond the threshold over
/// the ring pixels of the winning polarity.
#[inline]
pub fn segment_score(img: &Raster, x: usize, y: usize, threshold: u8, mask: &SegmentMask) -> Option<f32> {
    let center = img.get(x, y) as i32;
    let t = threshold as i32;
    let mut bright = 0u32;
    let mut dark = 0u32;
    let mut bright_sum = 0i32;
    let mut dark_sum = 0i32;

    for (i, &(dx, dy)) in mask.offsets.iter().enumerate() {
        let q = img.get((x as i32 + dx) as usize, (y as i32 + dy) as usize) as i32;
        if q > center + t {
            bright |= 1 << i;
            bright_sum += q - center - t;
        } else if q < center - t {
            dark |= 1 << i;
            dark_sum += center - q - t;
        }
    }

    let n = mask.offsets.len();
    let is_bright = has_arc(bright, n, mask.arc);
    let is_dark = has_arc(dark, n, mask.arc);
    match (is_bright, is_dark) {
        (true, true) => Some(bright_sum.max(dark_sum) as f32),
        (true, false) => Some(bright_sum as f32),
        (false, true) => Some(dark_sum as f32),
        (false, false) => None,
    }
}

/// Dense score map (0 where the segment test fails or near the border)
pub fn segment_score_map(img: &Raster, threshold: u8, mask: &SegmentMask) -> Vec<f32> {
    let (w, h) = img.dimensions();
    let r = mask.radius as usize;
    let mut scores = vec![0.0f32; w * h];
    if w <= 2 * r || h <= 2 * r {
        return scores;
    }

    scores.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        if y < r || y >= h - r {
            return;
        }
        for x in r..w - r {
            if let Some(score) = segment_score(img, x, y, threshold, mask) {
                row[x] = score;
            }
        }
    });
    scores
}

/// Corner locations with their scores, optionally thinned by 3x3 suppression
pub fn detect_segment_corners(
    img: &Raster,
    threshold: u8,
    mask: &SegmentMask,
    nonmax: bool,
) -> Vec<(usize, usize, f32)> {
    let (w, h) = img.dimensions();
    let scores = segment_score_map(img, threshold, mask);
    if nonmax {
        local_maxima_3x3(&scores, w, h, 0.0)
    } else {
        let mut corners = Vec::new();
        for y in 0..h {
            for x in 0..w {
                let s = scores[y * w + x];
                if s > 0.0 {
                    corners.push((x, y, s));
                }
            }
        }
        corners
    }
}

#[cfg(test)]
pub(crate) mod test_images {
    use feature_core::Raster;

    /// Dark background with bright squares, each square corner is a FAST corner
    pub fn squares_image(width: usize, height: usize) -> Raster {
        Raster::from_fn(width, height, |x, y| {
            let in_square = |cx: usize, cy: usize| x.abs_diff(cx) <= 4 && y.abs_diff(cy) <= 4;
            if in_square(width / 4, height / 4)
                || in_square(3 * width / 4, height / 4)
                || in_square(width / 2, 3 * height / 4)
            {
                220
            } else {
                40
            }
        })
    }

    /// Deterministic pseudo-random blocky texture
    pub fn textured_image(width: usize, height: usize, seed: u32) -> Raster {
        Raster::from_fn(width, height, |x, y| {
            let (bx, by) = ((x / 6) as u32, (y / 6) as u32);
            let mut v = bx.wrapping_mul(73_856_093) ^ by.wrapping_mul(19_349_663) ^ seed.wrapping_mul(83_492_791);
            v ^= v >> 13;
            v = v.wrapping_mul(0x5bd1_e995);
            v ^= v >> 15;
            (v & 0xff) as u8
        })
    }
}
