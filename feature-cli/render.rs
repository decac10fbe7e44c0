//! Drawing of keypoints, match pairs and region hulls onto colour images.

use feature_core::{Keypoint, Region};
use feature_match::MatchCandidate;
use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_hollow_polygon_mut, draw_line_segment_mut};
use imageproc::geometry::convex_hull;
use imageproc::point::Point;

pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

const MARKER_RADIUS: i32 = 3;

fn mark(canvas: &mut RgbImage, kp: &Keypoint, dx: f32, color: Rgb<u8>) {
    draw_hollow_circle_mut(
        canvas,
        ((kp.x + dx).round() as i32, kp.y.round() as i32),
        MARKER_RADIUS,
        color,
    );
}

/// Copy of `image` with a green circle on every keypoint
pub fn draw_keypoints(image: &RgbImage, keypoints: &[Keypoint]) -> RgbImage {
    let mut canvas = image.clone();
    for kp in keypoints {
        mark(&mut canvas, kp, 0.0, GREEN);
    }
    canvas
}

/// Both images side by side. Every keypoint is marked in blue; candidates
/// whose mask flag is set are joined to their nearest neighbour in green.
pub fn draw_matches(
    a: &RgbImage,
    keypoints_a: &[Keypoint],
    b: &RgbImage,
    keypoints_b: &[Keypoint],
    candidates: &[MatchCandidate],
    mask: &[bool],
) -> RgbImage {
    let offset = a.width();
    let mut canvas = RgbImage::new(a.width() + b.width(), a.height().max(b.height()));
    imageops::replace(&mut canvas, a, 0, 0);
    imageops::replace(&mut canvas, b, i64::from(offset), 0);
    let dx = offset as f32;

    for kp in keypoints_a {
        mark(&mut canvas, kp, 0.0, BLUE);
    }
    for kp in keypoints_b {
        mark(&mut canvas, kp, dx, BLUE);
    }

    for (candidate, _) in candidates.iter().zip(mask).filter(|(_, keep)| **keep) {
        let Some(best) = candidate.best() else {
            continue;
        };
        let (Some(pa), Some(pb)) = (keypoints_a.get(candidate.query_index), keypoints_b.get(best.train_index)) else {
            continue;
        };
        mark(&mut canvas, pa, 0.0, GREEN);
        mark(&mut canvas, pb, dx, GREEN);
        draw_line_segment_mut(&mut canvas, (pa.x, pa.y), (pb.x + dx, pb.y), GREEN);
    }
    canvas
}

/// Copy of `image` with the convex hull of every region outlined in green
pub fn draw_region_hulls(image: &RgbImage, regions: &[Region]) -> RgbImage {
    let mut canvas = image.clone();
    for region in regions {
        let points: Vec<Point<i32>> = region
            .points
            .iter()
            .map(|&(x, y)| Point::new(x as i32, y as i32))
            .collect();
        let hull = convex_hull(&points[..]);
        match hull.as_slice() {
            [] => {}
            [p] => {
                canvas.put_pixel(p.x as u32, p.y as u32, GREEN);
            }
            [p, q] => {
                draw_line_segment_mut(&mut canvas, (p.x as f32, p.y as f32), (q.x as f32, q.y as f32), GREEN);
            }
            _ => {
                let polygon: Vec<Point<f32>> = hull.iter().map(|p| Point::new(p.x as f32, p.y as f32)).collect();
                draw_hollow_polygon_mut(&mut canvas, &polygon, GREEN);
            }
        }
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_match::Neighbor;

    fn gray_canvas(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([100, 100, 100]))
    }

    #[test]
    fn test_draw_keypoints_marks_circle() {
        let out = draw_keypoints(&gray_canvas(20, 20), &[Keypoint::new(10.0, 10.0)]);
        assert_eq!(*out.get_pixel(13, 10), GREEN);
        assert_eq!(*out.get_pixel(10, 10), Rgb([100, 100, 100]));
    }

    #[test]
    fn test_draw_matches_layout() {
        let a = gray_canvas(30, 20);
        let b = gray_canvas(40, 25);
        let kps_a = vec![Keypoint::new(10.0, 10.0), Keypoint::new(20.0, 5.0)];
        let kps_b = vec![Keypoint::new(10.0, 10.0)];
        let candidates = vec![
            MatchCandidate {
                query_index: 0,
                neighbors: vec![Neighbor { train_index: 0, distance: 1.0 }],
            },
            MatchCandidate {
                query_index: 1,
                neighbors: vec![Neighbor { train_index: 0, distance: 9.0 }],
            },
        ];
        let out = draw_matches(&a, &kps_a, &b, &kps_b, &candidates, &[true, false]);
        assert_eq!(out.dimensions(), (70, 25));
        // the accepted pair is joined by a horizontal line
        assert_eq!(*out.get_pixel(25, 10), GREEN);
        // the rejected query keeps its blue marker
        assert_eq!(*out.get_pixel(23, 5), BLUE);
    }

    #[test]
    fn test_out_of_range_indices_are_skipped() {
        let candidates = vec![MatchCandidate {
            query_index: 5,
            neighbors: vec![Neighbor { train_index: 9, distance: 0.0 }],
        }];
        let out = draw_matches(&gray_canvas(10, 10), &[], &gray_canvas(10, 10), &[], &candidates, &[true]);
        assert!(out.pixels().all(|p| *p == Rgb([100, 100, 100])));
    }

    #[test]
    fn test_region_hull_outline() {
        let mut points = Vec::new();
        for y in 5..15u32 {
            for x in 5..15u32 {
                points.push((x, y));
            }
        }
        let out = draw_region_hulls(&gray_canvas(20, 20), &[Region::new(points), Region::new(vec![(1, 1)])]);
        assert_eq!(*out.get_pixel(5, 10), GREEN);
        assert_eq!(*out.get_pixel(10, 10), Rgb([100, 100, 100]));
        assert_eq!(*out.get_pixel(1, 1), GREEN);
    }
}
