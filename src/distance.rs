//! Geodesic distance between two coordinates.

use geo::{GeodesicDistance, Point};

use crate::types::LatLon;

fn point(p: LatLon) -> Point<f64> {
    Point::new(p.lon, p.lat)
}

/// WGS84 geodesic distance in kilometers (Karney's algorithm).
pub fn geodesic_km(a: LatLon, b: LatLon) -> f64 {
    point(a).geodesic_distance(&point(b)) / 1000.0
}

/// Format a distance the way it is shown on the map, e.g. `"12.34 km"`.
pub fn format_km(km: f64) -> String {
    format!("{km:.2} km")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SONTYAM: LatLon = LatLon {
        lat: 17.8631,
        lon: 83.2486,
    };
    const GAJUWAKA: LatLon = LatLon {
        lat: 17.6905,
        lon: 83.2103,
    };

    #[test]
    fn test_distance_is_symmetric() {
        let there = geodesic_km(SONTYAM, GAJUWAKA);
        let back = geodesic_km(GAJUWAKA, SONTYAM);
        assert!((there - back).abs() < 1e-9);
    }

    #[test]
    fn test_distance_zero_only_for_identical_points() {
        assert!(geodesic_km(SONTYAM, SONTYAM).abs() < 1e-9);
        assert!(geodesic_km(SONTYAM, LatLon::new(17.8632, 83.2486)) > 0.0);
    }

    #[test]
    fn test_known_distance() {
        // roughly 19.5 km apart
        let km = geodesic_km(SONTYAM, GAJUWAKA);
        assert!((19.0..20.5).contains(&km), "got {km}");
    }

    #[test]
    fn test_format_km() {
        assert_eq!(format_km(19.6049), "19.60 km");
        assert_eq!(format_km(0.0), "0.00 km");
    }
}
