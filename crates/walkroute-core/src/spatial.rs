//! Spherical distance helpers and bounding boxes.

use crate::models::Coordinate;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters (Haversine formula).
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Haversine distance between two coordinates in meters.
pub fn distance_m(a: Coordinate, b: Coordinate) -> f64 {
    haversine_distance(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Total along-path length in meters.
pub fn path_length_m(path: &[Coordinate]) -> f64 {
    path.windows(2).map(|pair| distance_m(pair[0], pair[1])).sum()
}

/// Axis-aligned box in geographic degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Bounds {
    /// Smallest box holding every finite point, or `None` if there are none.
    pub fn from_points(points: &[Coordinate]) -> Option<Self> {
        let mut min_lat = f64::INFINITY;
        let mut max_lat = f64::NEG_INFINITY;
        let mut min_lon = f64::INFINITY;
        let mut max_lon = f64::NEG_INFINITY;
        for point in points {
            if !point.latitude.is_finite() || !point.longitude.is_finite() {
                continue;
            }
            min_lat = min_lat.min(point.latitude);
            max_lat = max_lat.max(point.latitude);
            min_lon = min_lon.min(point.longitude);
            max_lon = max_lon.max(point.longitude);
        }
        if !min_lat.is_finite() || !min_lon.is_finite() {
            return None;
        }
        Some(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    /// Grow each side by `pad_ratio` of the span, never less than `min_pad_deg`.
    pub fn expand(&self, pad_ratio: f64, min_pad_deg: f64) -> Self {
        let lat_span = self.max_lat - self.min_lat;
        let lon_span = self.max_lon - self.min_lon;
        let pad_lat = (lat_span * pad_ratio).max(min_pad_deg);
        let pad_lon = (lon_span * pad_ratio).max(min_pad_deg);
        Self {
            min_lat: (self.min_lat - pad_lat).max(-90.0),
            max_lat: (self.max_lat + pad_lat).min(90.0),
            min_lon: self.min_lon - pad_lon,
            max_lon: self.max_lon + pad_lon,
        }
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lon
            && point.longitude <= self.max_lon
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let dist = haversine_distance(54.1663, -4.4824, 54.1663, -4.4824);
        assert!(dist < 0.001);
    }

    #[test]
    fn bounds_skip_non_finite_points() {
        let points = [
            Coordinate::new(-4.5, 54.1),
            Coordinate::new(f64::NAN, 60.0),
            Coordinate::new(-4.4, 54.2),
        ];
        let bounds = Bounds::from_points(&points).unwrap();
        assert_eq!(bounds.min_lon, -4.5);
        assert_eq!(bounds.max_lat, 54.2);
        assert!(Bounds::from_points(&[]).is_none());
    }

    #[test]
    fn expanded_bounds_keep_minimum_padding() {
        let point = Coordinate::new(-4.48, 54.16);
        let bounds = Bounds::from_points(&[point]).unwrap().expand(0.2, 0.0015);
        assert!(bounds.contains(point));
        assert!((bounds.max_lat - bounds.min_lat - 0.003).abs() < 1e-9);
    }
}
