use feature_core::{FloatImage, Keypoint, Raster};
use std::f32::consts::PI;

/// Pixels whose score is a strict 3x3 local maximum above `min_score`.
///
/// Plateaus keep their first pixel in raster order.
pub fn local_maxima_3x3(scores: &[f32], width: usize, height: usize, min_score: f32) -> Vec<(usize, usize, f32)> {
    let mut maxima = Vec::new();
    if width < 3 || height < 3 {
        return maxima;
    }
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let s = scores[y * width + x];
            if s <= min_score {
                continue;
            }
            let mut is_max = true;
            'window: for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let n = scores[(y as i32 + dy) as usize * width + (x as i32 + dx) as usize];
                    let before = dy < 0 || (dy == 0 && dx < 0);
                    if n > s || (before && n == s) {
                        is_max = false;
                        break 'window;
                    }
                }
            }
            if is_max {
                maxima.push((x, y, s));
            }
        }
    }
    maxima
}

/// Greedy suppression keeping the strongest keypoint within `min_distance`
pub fn non_maximum_suppression(keypoints: &[Keypoint], min_distance: f32) -> Vec<Keypoint> {
    if keypoints.is_empty() {
        return Vec::new();
    }

    let mut sorted = keypoints.to_vec();
    sort_by_response(&mut sorted);

    let min_distance_sq = min_distance * min_distance;
    let mut kept: Vec<Keypoint> = Vec::new();
    for candidate in sorted {
        if kept.iter().all(|k| k.distance_sq(&candidate) >= min_distance_sq) {
            kept.push(candidate);
        }
    }
    kept
}

/// Strongest first
pub fn sort_by_response(keypoints: &mut [Keypoint]) {
    keypoints.sort_by(|a, b| b.response.partial_cmp(&a.response).unwrap_or(std::cmp::Ordering::Equal));
}

/// Keep the `n` strongest keypoints (all of them when `n == 0`)
pub fn retain_best(mut keypoints: Vec<Keypoint>, n: usize) -> Vec<Keypoint> {
    sort_by_response(&mut keypoints);
    if n > 0 {
        keypoints.truncate(n);
    }
    keypoints
}

/// Orientation using the intensity centroid of a circular patch
pub fn intensity_centroid_angle(img: &Raster, x: usize, y: usize, radius: i32) -> f32 {
    let (cx, cy) = (x as i32, y as i32);
    let r2 = radius * radius;
    let mut m10 = 0i64;
    let mut m01 = 0i64;

    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > r2 {
                continue;
            }
            let val = img.get_clamped(cx + dx, cy + dy) as i64;
            m10 += dx as i64 * val;
            m01 += dy as i64 * val;
        }
    }

    if m10 == 0 && m01 == 0 {
        0.0
    } else {
        (m01 as f32).atan2(m10 as f32)
    }
}

/// Refine a score-map peak to subpixel accuracy with a quadratic fit
pub fn refine_subpixel(scores: &FloatImage, x: usize, y: usize) -> (f32, f32) {
    if x < 1 || y < 1 || x + 1 >= scores.width || y + 1 >= scores.height {
        return (x as f32, y as f32);
    }
    let s = |dx: i32, dy: i32| scores.get((x as i32 + dx) as usize, (y as i32 + dy) as usize);

    let dx = (s(1, 0) - s(-1, 0)) / 2.0;
    let dy = (s(0, 1) - s(0, -1)) / 2.0;
    let dxx = s(1, 0) - 2.0 * s(0, 0) + s(-1, 0);
    let dyy = s(0, 1) - 2.0 * s(0, 0) + s(0, -1);
    let dxy = (s(1, 1) - s(1, -1) - s(-1, 1) + s(-1, -1)) / 4.0;

    let det = dxx * dyy - dxy * dxy;
    if det.abs() < 1e-12 {
        return (x as f32, y as f32);
    }

    let offset_x = (-(dyy * dx - dxy * dy) / det).clamp(-0.5, 0.5);
    let offset_y = (-(dxx * dy - dxy * dx) / det).clamp(-0.5, 0.5);
    (x as f32 + offset_x, y as f32 + offset_y)
}

/// Dominant gradient direction in a circular window of radius `6 * scale`.
///
/// Gaussian-weighted gradient samples are accumulated over a sliding 60
/// degree sector and the longest resulting vector wins.
pub fn dominant_orientation(gx: &FloatImage, gy: &FloatImage, x: f32, y: f32, scale: f32) -> f32 {
    let step = scale.max(1.0);
    let sigma = 2.5 * step;
    let mut samples: Vec<(f32, f32, f32)> = Vec::with_capacity(109);

    for j in -6i32..=6 {
        for i in -6i32..=6 {
            if i * i + j * j >= 36 {
                continue;
            }
            let sx = x + i as f32 * step;
            let sy = y + j as f32 * step;
            let d2 = (i as f32 * step).powi(2) + (j as f32 * step).powi(2);
            let weight = (-d2 / (2.0 * sigma * sigma)).exp();
            let rx = weight * gx.bilinear(sx, sy);
            let ry = weight * gy.bilinear(sx, sy);
            samples.push((ry.atan2(rx), rx, ry));
        }
    }

    let mut best = 0.0f32;
    let mut best_angle = 0.0f32;
    let window = PI / 3.0;
    let mut start = -PI;
    while start < PI {
        let (mut sum_x, mut sum_y) = (0.0f32, 0.0f32);
        for &(angle, rx, ry) in &samples {
            let mut delta = angle - start;
            if delta < 0.0 {
                delta += 2.0 * PI;
            }
            if delta < window {
                sum_x += rx;
                sum_y += ry;
            }
        }
        let norm = sum_x * sum_x + sum_y * sum_y;
        if norm > best {
            best = norm;
            best_angle = sum_y.atan2(sum_x);
        }
        start += 0.15;
    }
    best_angle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_maxima_single_peak() {
        let mut scores = vec![0.0f32; 25];
        scores[2 * 5 + 2] = 5.0;
        scores[2 * 5 + 1] = 3.0;
        let peaks = local_maxima_3x3(&scores, 5, 5, 0.0);
        assert_eq!(peaks, vec![(2, 2, 5.0)]);
    }

    #[test]
    fn test_local_maxima_plateau_keeps_one() {
        let mut scores = vec![0.0f32; 25];
        scores[2 * 5 + 2] = 4.0;
        scores[2 * 5 + 3] = 4.0;
        let peaks = local_maxima_3x3(&scores, 5, 5, 0.0);
        assert_eq!(peaks.len(), 1);
    }

    #[test]
    fn test_non_maximum_suppression_distance() {
        let kps = vec![
            Keypoint::new(10.0, 10.0).with_response(1.0),
            Keypoint::new(11.0, 10.0).with_response(2.0),
            Keypoint::new(30.0, 30.0).with_response(0.5),
        ];
        let kept = non_maximum_suppression(&kps, 5.0);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].x, 11.0);
        for i in 0..kept.len() {
            for j in (i + 1)..kept.len() {
                assert!(kept[i].distance_sq(&kept[j]).sqrt() >= 5.0);
            }
        }
    }

    #[test]
    fn test_retain_best() {
        let kps: Vec<Keypoint> = (0..10).map(|i| Keypoint::new(i as f32, 0.0).with_response(i as f32)).collect();
        let best = retain_best(kps.clone(), 3);
        assert_eq!(best.len(), 3);
        assert_eq!(best[0].response, 9.0);
        assert_eq!(retain_best(kps, 0).len(), 10);
    }

    #[test]
    fn test_centroid_angle_points_to_bright_side() {
        let img = Raster::from_fn(31, 31, |x, _| if x > 15 { 200 } else { 10 });
        let angle = intensity_centroid_angle(&img, 15, 15, 7);
        assert!(angle.abs() < 0.1, "angle {}", angle);
    }

    #[test]
    fn test_refine_subpixel_stays_within_half_pixel() {
        let mut scores = FloatImage::zeros(5, 5);
        scores.data[2 * 5 + 2] = 4.0;
        scores.data[2 * 5 + 3] = 3.0;
        scores.data[2 * 5 + 1] = 1.0;
        scores.data[5 + 2] = 1.0;
        scores.data[3 * 5 + 2] = 1.0;
        let (x, y) = refine_subpixel(&scores, 2, 2);
        assert!(x > 2.0 && x <= 2.5);
        assert!((y - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_dominant_orientation_on_ramp() {
        let ramp = Raster::from_fn(40, 40, |_, y| (y * 5) as u8);
        let (gx, gy) = FloatImage::from_raster(&ramp, 1.0).sobel();
        let angle = dominant_orientation(&gx, &gy, 20.0, 20.0, 1.0);
        assert!((angle - PI / 2.0).abs() < 0.2, "angle {}", angle);
    }
}
