use _model::{Coordinate, InvalidCoordinateError};
use geo::{GeodesicDistance, Point};

pub const METRES_PER_FOOT: f64 = 0.3048;

/// Geodesic distance on the WGS84 ellipsoid, in international feet.
pub fn distance_feet(a: &Coordinate, b: &Coordinate) -> Result<f64, InvalidCoordinateError> {
    a.validate()?;
    b.validate()?;
    Ok(point(a).geodesic_distance(&point(b)) / METRES_PER_FOOT)
}

// geo points are x/y, so longitude goes first
fn point(x: &Coordinate) -> Point {
    Point::new(x.longitude, x.latitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(latitude: f64, longitude: f64) -> Coordinate {
        Coordinate::new(latitude, longitude).unwrap()
    }

    #[test]
    fn zero_for_same_point() {
        for x in [coord(32.81, -117.05), coord(0.0, 0.0), coord(-89.9, 179.9)] {
            assert_eq!(distance_feet(&x, &x).unwrap(), 0.0);
        }
    }

    #[test]
    fn symmetric() {
        let a = coord(32.7767, -117.0713);
        let b = coord(32.8328, -117.2713);
        assert_eq!(distance_feet(&a, &b).unwrap(), distance_feet(&b, &a).unwrap());
    }

    #[test]
    fn one_degree_of_latitude_at_equator() {
        // 110574.389 m on the WGS84 ellipsoid
        let d = distance_feet(&coord(0.0, 0.0), &coord(1.0, 0.0)).unwrap();
        assert!((d - 110_574.389 / METRES_PER_FOOT).abs() < 1.0, "{d}");
    }

    #[test]
    fn invalid_input() {
        let a = coord(32.81, -117.05);
        let null = Coordinate {
            latitude: f64::NAN,
            longitude: -117.05,
        };
        assert!(distance_feet(&a, &null).is_err());
        assert!(distance_feet(&null, &a).is_err());
    }
}
