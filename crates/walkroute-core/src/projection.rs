//! UTM projection on the WGS84 ellipsoid and reference-system bookkeeping.
//!
//! Slopes need a horizontal run in meters, so each segment is projected into
//! the UTM zone covering its first vertex. Building a projection precomputes
//! the meridian-arc series, so [`ProjectionCache`] keeps one per zone.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::Coordinate;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const UTM_K0: f64 = 0.9996;
const FALSE_EASTING_M: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH_M: f64 = 10_000_000.0;

const EPSG_WGS84: u32 = 4326;
const EPSG_UTM_NORTH_BASE: u32 = 32600;
const EPSG_UTM_SOUTH_BASE: u32 = 32700;

/// A UTM zone number (1..=60) and hemisphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UtmZone {
    pub number: u8,
    pub north: bool,
}

impl UtmZone {
    /// Zone covering `coord`: `floor((lon + 180) / 6) + 1`, north when lat >= 0.
    pub fn for_coordinate(coord: Coordinate) -> Self {
        let raw = ((coord.longitude + 180.0) / 6.0).floor() as i64 + 1;
        Self {
            number: raw.clamp(1, 60) as u8,
            north: coord.latitude >= 0.0,
        }
    }

    pub fn epsg(&self) -> u32 {
        let base = if self.north {
            EPSG_UTM_NORTH_BASE
        } else {
            EPSG_UTM_SOUTH_BASE
        };
        base + self.number as u32
    }

    pub fn from_epsg(code: u32) -> Option<Self> {
        let (base, north) = match code {
            32601..=32660 => (EPSG_UTM_NORTH_BASE, true),
            32701..=32760 => (EPSG_UTM_SOUTH_BASE, false),
            _ => return None,
        };
        Some(Self {
            number: (code - base) as u8,
            north,
        })
    }

    pub fn central_meridian_deg(&self) -> f64 {
        (self.number as f64 - 1.0) * 6.0 - 180.0 + 3.0
    }
}

/// Forward transverse Mercator transform for one UTM zone.
#[derive(Debug, Clone)]
pub struct UtmProjection {
    zone: UtmZone,
    lon0_rad: f64,
    false_northing_m: f64,
    e2: f64,
    ep2: f64,
    arc: [f64; 4],
}

impl UtmProjection {
    pub fn new(zone: UtmZone) -> Self {
        let e2 = WGS84_F * (2.0 - WGS84_F);
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let arc = [
            1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0,
            3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0,
            15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0,
            35.0 * e6 / 3072.0,
        ];
        Self {
            zone,
            lon0_rad: zone.central_meridian_deg().to_radians(),
            false_northing_m: if zone.north { 0.0 } else { FALSE_NORTHING_SOUTH_M },
            e2,
            ep2: e2 / (1.0 - e2),
            arc,
        }
    }

    pub fn zone(&self) -> UtmZone {
        self.zone
    }

    fn meridian_arc(&self, phi: f64) -> f64 {
        let [c0, c1, c2, c3] = self.arc;
        WGS84_A
            * (c0 * phi - c1 * (2.0 * phi).sin() + c2 * (4.0 * phi).sin()
                - c3 * (6.0 * phi).sin())
    }

    /// Project a geographic coordinate to (easting, northing) meters.
    pub fn forward(&self, coord: Coordinate) -> (f64, f64) {
        let phi = coord.latitude.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let tan_phi = phi.tan();

        let n = WGS84_A / (1.0 - self.e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = self.ep2 * cos_phi * cos_phi;
        let a = cos_phi * (coord.longitude.to_radians() - self.lon0_rad);
        let m = self.meridian_arc(phi);

        let a2 = a * a;
        let a3 = a2 * a;
        let a4 = a3 * a;
        let a5 = a4 * a;
        let a6 = a5 * a;

        let easting = UTM_K0
            * n
            * (a + (1.0 - t + c) * a3 / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * self.ep2) * a5 / 120.0)
            + FALSE_EASTING_M;
        let northing = UTM_K0
            * (m + n
                * tan_phi
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * self.ep2) * a6 / 720.0))
            + self.false_northing_m;

        (easting, northing)
    }
}

/// Native reference system of an elevation raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RasterCrs {
    /// EPSG:4326, x = longitude, y = latitude.
    #[default]
    Geographic,
    Utm(UtmZone),
}

impl RasterCrs {
    pub fn from_epsg(code: u32) -> Option<Self> {
        if code == EPSG_WGS84 {
            return Some(RasterCrs::Geographic);
        }
        UtmZone::from_epsg(code).map(RasterCrs::Utm)
    }

    pub fn epsg(&self) -> u32 {
        match self {
            RasterCrs::Geographic => EPSG_WGS84,
            RasterCrs::Utm(zone) => zone.epsg(),
        }
    }
}

impl fmt::Display for RasterCrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl FromStr for RasterCrs {
    type Err = Error;

    /// Accepts `EPSG:4326`, `epsg:32630` or a bare code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let code = trimmed
            .get(..5)
            .filter(|prefix| prefix.eq_ignore_ascii_case("epsg:"))
            .map(|_| &trimmed[5..])
            .unwrap_or(trimmed);
        code.parse::<u32>()
            .ok()
            .and_then(RasterCrs::from_epsg)
            .ok_or_else(|| Error::InvalidInput(format!("unsupported raster CRS {trimmed:?}")))
    }
}

/// Per-zone memo of projection transforms.
#[derive(Debug, Default)]
pub struct ProjectionCache {
    projections: HashMap<UtmZone, UtmProjection>,
}

impl ProjectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn projection(&mut self, zone: UtmZone) -> &UtmProjection {
        self.projections
            .entry(zone)
            .or_insert_with(|| UtmProjection::new(zone))
    }

    /// Express `coord` in `crs` as (x, y).
    pub fn to_crs(&mut self, coord: Coordinate, crs: RasterCrs) -> (f64, f64) {
        match crs {
            RasterCrs::Geographic => (coord.longitude, coord.latitude),
            RasterCrs::Utm(zone) => self.projection(zone).forward(coord),
        }
    }

    pub fn len(&self) -> usize {
        self.projections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::distance_m;

    #[test]
    fn zone_for_isle_of_man() {
        let zone = UtmZone::for_coordinate(Coordinate::new(-4.4824, 54.1663));
        assert_eq!(zone, UtmZone { number: 30, north: true });
        assert_eq!(zone.epsg(), 32630);
        assert_eq!(zone.central_meridian_deg(), -3.0);
    }

    #[test]
    fn zone_edges_are_clamped() {
        assert_eq!(UtmZone::for_coordinate(Coordinate::new(-180.0, 0.0)).number, 1);
        assert_eq!(UtmZone::for_coordinate(Coordinate::new(180.0, 0.0)).number, 60);
        assert!(!UtmZone::for_coordinate(Coordinate::new(151.2, -33.9)).north);
    }

    #[test]
    fn central_meridian_on_equator_maps_to_false_origin() {
        let zone = UtmZone { number: 31, north: true };
        let (x, y) = UtmProjection::new(zone).forward(Coordinate::new(3.0, 0.0));
        assert!((x - 500_000.0).abs() < 1e-6);
        assert!(y.abs() < 1e-6);
    }

    #[test]
    fn southern_zone_adds_false_northing() {
        let zone = UtmZone { number: 56, north: false };
        let (_, y) = UtmProjection::new(zone).forward(Coordinate::new(153.0, -0.000001));
        assert!(y < 10_000_000.0 && y > 9_999_999.0);
    }

    #[test]
    fn projected_run_matches_great_circle_distance() {
        let a = Coordinate::new(-4.4824, 54.1663);
        let b = Coordinate::new(-4.4664, 54.2103);
        let projection = UtmProjection::new(UtmZone::for_coordinate(a));
        let (x1, y1) = projection.forward(a);
        let (x2, y2) = projection.forward(b);
        let run = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();
        let expected = distance_m(a, b);
        assert!(
            (run - expected).abs() / expected < 0.005,
            "run {run} vs haversine {expected}"
        );
    }

    #[test]
    fn crs_parsing() {
        assert_eq!("EPSG:4326".parse::<RasterCrs>().unwrap(), RasterCrs::Geographic);
        assert_eq!(
            "epsg:32630".parse::<RasterCrs>().unwrap(),
            RasterCrs::Utm(UtmZone { number: 30, north: true })
        );
        assert_eq!(
            "32755".parse::<RasterCrs>().unwrap(),
            RasterCrs::Utm(UtmZone { number: 55, north: false })
        );
        assert!("EPSG:27700".parse::<RasterCrs>().is_err());
        assert_eq!(RasterCrs::Geographic.to_string(), "EPSG:4326");
    }

    #[test]
    fn cache_builds_one_projection_per_zone() {
        let mut cache = ProjectionCache::new();
        let zone = UtmZone { number: 30, north: true };
        cache.to_crs(Coordinate::new(-4.0, 54.0), RasterCrs::Utm(zone));
        cache.to_crs(Coordinate::new(-4.1, 54.1), RasterCrs::Utm(zone));
        cache.to_crs(Coordinate::new(-4.1, 54.1), RasterCrs::Geographic);
        assert_eq!(cache.len(), 1);
    }
}
