//! Web-Mercator projection between geographic degrees and the unit square.
//!
//! All clustering happens in a normalized [0,1]×[0,1] space: longitude maps
//! linearly onto x, latitude maps through the spherical Mercator formula onto
//! y (north at 0, south at 1). Latitudes beyond the Mercator singularity are
//! clamped to the square's edge.

use geo::Point;
use std::f64::consts::PI;

/// Longitude in degrees to normalized x.
pub fn lng_x(lng: f64) -> f64 {
    lng / 360.0 + 0.5
}

/// Latitude in degrees to normalized y, clamped to [0, 1].
pub fn lat_y(lat: f64) -> f64 {
    let sine = (lat * PI / 180.0).sin();
    let y = 0.5 - 0.25 * ((1.0 + sine) / (1.0 - sine)).ln() / PI;
    y.clamp(0.0, 1.0)
}

/// Normalized x back to longitude in degrees.
pub fn x_lng(x: f64) -> f64 {
    (x - 0.5) * 360.0
}

/// Normalized y back to latitude in degrees.
pub fn y_lat(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0) * PI / 180.0;
    360.0 * y2.exp().atan() / PI - 90.0
}

/// Project a geographic point into the unit square.
pub fn project(p: &Point) -> (f64, f64) {
    (lng_x(p.x()), lat_y(p.y()))
}

/// Unproject normalized coordinates back to a geographic point.
pub fn unproject(x: f64, y: f64) -> Point {
    Point::new(x_lng(x), y_lat(y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_anchors() {
        assert_eq!(lng_x(0.0), 0.5);
        assert_eq!(lng_x(-180.0), 0.0);
        assert_eq!(lng_x(180.0), 1.0);
        assert!((lat_y(0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_roundtrip() {
        let samples = [
            (-74.0060, 40.7128),
            (2.3522, 48.8566),
            (151.2093, -33.8688),
            (-179.99, 0.01),
            (0.0, 84.9),
            (0.0, -84.9),
        ];
        for (lng, lat) in samples {
            let (x, y) = project(&Point::new(lng, lat));
            let p = unproject(x, y);
            assert!((p.x() - lng).abs() < 1e-9, "lng roundtrip for {lng}");
            assert!((p.y() - lat).abs() < 1e-9, "lat roundtrip for {lat}");
        }
    }

    #[test]
    fn test_poles_clamp_to_square() {
        assert_eq!(lat_y(90.0), 0.0);
        assert_eq!(lat_y(-90.0), 1.0);
        assert_eq!(lat_y(89.999999), lat_y(89.999999).clamp(0.0, 1.0));
    }

    #[test]
    fn test_y_increases_southward() {
        assert!(lat_y(60.0) < lat_y(0.0));
        assert!(lat_y(0.0) < lat_y(-60.0));
    }
}
