#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Key-point ≙ detector location + scale, orientation (radians) and response
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keypoint {
    pub x: f32, // Subpixel x coordinate
    pub y: f32, // Subpixel y coordinate
    /// Diameter of the meaningful neighbourhood
    pub size: f32,
    pub angle: f32,
    pub response: f32,
    /// Pyramid level or scale-space octave the point was found on
    pub octave: i32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            size: 7.0,
            angle: 0.0,
            response: 0.0,
            octave: 0,
        }
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_response(mut self, response: f32) -> Self {
        self.response = response;
        self
    }

    pub fn with_octave(mut self, octave: i32) -> Self {
        self.octave = octave;
        self
    }

    /// Squared euclidean distance between two locations
    pub fn distance_sq(&self, other: &Keypoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Connected set of pixels produced by a region detector
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Region {
    pub points: Vec<(u32, u32)>,
}

impl Region {
    pub fn new(points: Vec<(u32, u32)>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// (min_x, min_y, max_x, max_y), `None` for an empty region
    pub fn bounding_box(&self) -> Option<(u32, u32, u32, u32)> {
        let first = self.points.first()?;
        let init = (first.0, first.1, first.0, first.1);
        Some(self.points.iter().fold(init, |(x0, y0, x1, y1), &(x, y)| {
            (x0.min(x), y0.min(y), x1.max(x), y1.max(y))
        }))
    }

    /// Mean pixel position
    pub fn centroid(&self) -> Option<(f32, f32)> {
        if self.points.is_empty() {
            return None;
        }
        let (sx, sy) = self
            .points
            .iter()
            .fold((0u64, 0u64), |(sx, sy), &(x, y)| (sx + x as u64, sy + y as u64));
        let n = self.points.len() as f32;
        Some((sx as f32 / n, sy as f32 / n))
    }
}

/// Drops keypoints whose square support of half-size `radius` leaves the image
pub fn retain_inside(keypoints: &[Keypoint], width: usize, height: usize, radius: f32) -> Vec<Keypoint> {
    keypoints
        .iter()
        .copied()
        .filter(|kp| {
            kp.x - radius >= 0.0
                && kp.y - radius >= 0.0
                && kp.x + radius < width as f32
                && kp.y + radius < height as f32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_methods() {
        let kp = Keypoint::new(1.0, 2.0)
            .with_size(31.0)
            .with_angle(0.5)
            .with_response(9.0)
            .with_octave(2);
        assert_eq!(kp.size, 31.0);
        assert_eq!(kp.angle, 0.5);
        assert_eq!(kp.response, 9.0);
        assert_eq!(kp.octave, 2);
    }

    #[test]
    fn test_region_bounding_box() {
        let region = Region::new(vec![(3, 4), (1, 9), (7, 2)]);
        assert_eq!(region.bounding_box(), Some((1, 2, 7, 9)));
        assert_eq!(Region::default().bounding_box(), None);
    }

    #[test]
    fn test_retain_inside_border() {
        let kps = vec![Keypoint::new(2.0, 2.0), Keypoint::new(20.0, 20.0), Keypoint::new(38.0, 5.0)];
        let kept = retain_inside(&kps, 40, 40, 5.0);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].x, 20.0);
    }
}
