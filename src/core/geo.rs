use serde::{Deserialize, Serialize};

use crate::core::constants::DEFAULT_CENTER;

/// A geographical coordinate in engine order: longitude first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    /// Creates a new LngLat coordinate
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Validates that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0 && self.lat <= 90.0 && self.lng >= -180.0 && self.lng <= 180.0
    }

    /// Wraps longitude to [-180, 180] range
    pub fn wrap(&self) -> Self {
        let wrapped = self.lng % 360.0;
        let lng = if wrapped > 180.0 {
            wrapped - 360.0
        } else if wrapped < -180.0 {
            wrapped + 360.0
        } else {
            wrapped
        };
        Self::new(lng, self.lat)
    }
}

impl Default for LngLat {
    fn default() -> Self {
        Self::new(DEFAULT_CENTER.0, DEFAULT_CENTER.1)
    }
}

impl From<(f64, f64)> for LngLat {
    fn from((lng, lat): (f64, f64)) -> Self {
        Self::new(lng, lat)
    }
}

impl From<[f64; 2]> for LngLat {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self::new(lng, lat)
    }
}

impl std::fmt::Display for LngLat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.lng, self.lat)
    }
}

/// Pixel offset applied to markers and popups relative to their anchor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

impl Offset {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lng_lat_wrap() {
        assert_eq!(LngLat::new(190.0, 10.0).wrap(), LngLat::new(-170.0, 10.0));
        assert_eq!(LngLat::new(-190.0, 10.0).wrap(), LngLat::new(170.0, 10.0));
        assert_eq!(LngLat::new(45.0, 10.0).wrap(), LngLat::new(45.0, 10.0));
    }

    #[test]
    fn test_lng_lat_validity() {
        assert!(LngLat::new(0.0, 0.0).is_valid());
        assert!(!LngLat::new(0.0, 91.0).is_valid());
        assert!(LngLat::default().is_valid());
    }

    #[test]
    fn test_lng_lat_from_array() {
        let lng_lat: LngLat = [1.5, -2.5].into();
        assert_eq!(lng_lat.lng, 1.5);
        assert_eq!(lng_lat.lat, -2.5);
        assert_eq!(lng_lat.to_string(), "[1.5, -2.5]");
    }
}
