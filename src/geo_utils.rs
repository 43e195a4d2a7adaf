//! Geodesic distance helpers.

use geo::{Distance, Haversine, Point};

/// Haversine distance in meters between two (lat, lon) coordinates.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    Haversine::distance(Point::new(lon1, lat1), Point::new(lon2, lat2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        assert_eq!(haversine_distance(48.2082, 16.3738, 48.2082, 16.3738), 0.0);
    }

    #[test]
    fn test_known_distance() {
        // One degree of latitude is roughly 111.2 km.
        let d = haversine_distance(48.0, 16.0, 49.0, 16.0);
        assert!((d - 111_195.0).abs() < 500.0, "got {}", d);
    }

    #[test]
    fn test_small_distance() {
        // ~1.4 m northward step at Vienna's latitude.
        let step = 1.4 / 111_320.0;
        let d = haversine_distance(48.2082, 16.3738, 48.2082 + step, 16.3738);
        assert!((d - 1.4).abs() < 0.01, "got {}", d);
    }
}
