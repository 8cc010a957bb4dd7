//! Shared artifact types carried between stages.

use serde::{Deserialize, Serialize};

/// A detected dot-grid candidate.
///
/// `size` is an estimated diameter in pixels; `confidence` is the
/// detector-specific response strength in [0, 1].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, size: f32, confidence: f32) -> Self {
        Self {
            x,
            y,
            size,
            confidence,
        }
    }

    #[inline]
    pub fn distance_to(&self, other: &Keypoint) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Keypoint::new(0.0, 0.0, 4.0, 1.0);
        let b = Keypoint::new(3.0, 4.0, 4.0, 1.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-6);
    }
}
