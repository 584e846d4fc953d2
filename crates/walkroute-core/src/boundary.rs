//! Land-boundary polygon used to keep sampled end points on land.

use std::path::Path;

use geo::{Contains, MultiPolygon, Point, Polygon};
use geojson::GeoJson;

use crate::error::{Error, Result};
use crate::models::Coordinate;

/// Polygonal area in geographic degrees. Containment is strict.
#[derive(Debug, Clone)]
pub struct LandBoundary {
    area: MultiPolygon<f64>,
}

impl LandBoundary {
    pub fn from_polygon(polygon: Polygon<f64>) -> Self {
        Self {
            area: MultiPolygon::new(vec![polygon]),
        }
    }

    pub fn from_multi_polygon(area: MultiPolygon<f64>) -> Self {
        Self { area }
    }

    /// Parse a GeoJSON document and keep its first geometry.
    ///
    /// Accepts a bare geometry, a feature or a feature collection; the
    /// geometry must be a Polygon or MultiPolygon.
    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let document: GeoJson = text
            .parse()
            .map_err(|err: geojson::Error| Error::Boundary(err.to_string()))?;

        let geometry = match document {
            GeoJson::Geometry(geometry) => Some(geometry),
            GeoJson::Feature(feature) => feature.geometry,
            GeoJson::FeatureCollection(collection) => collection
                .features
                .into_iter()
                .find_map(|feature| feature.geometry),
        }
        .ok_or_else(|| Error::Boundary("document has no geometry".to_string()))?;

        let geometry = geo::Geometry::<f64>::try_from(geometry.value)
            .map_err(|err| Error::Boundary(err.to_string()))?;

        match geometry {
            geo::Geometry::Polygon(polygon) => Ok(Self::from_polygon(polygon)),
            geo::Geometry::MultiPolygon(area) => Ok(Self::from_multi_polygon(area)),
            _ => Err(Error::Boundary(
                "geometry must be a Polygon or MultiPolygon".to_string(),
            )),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let boundary = Self::from_geojson_str(&text)?;
        tracing::info!(
            "Loaded land boundary from {} ({} polygons)",
            path.as_ref().display(),
            boundary.area.0.len()
        );
        Ok(boundary)
    }

    pub fn contains(&self, coord: Coordinate) -> bool {
        self.area
            .contains(&Point::new(coord.longitude, coord.latitude))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::LineString;

    fn square() -> LandBoundary {
        LandBoundary::from_polygon(Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]),
            vec![],
        ))
    }

    #[test]
    fn containment_is_strict() {
        let boundary = square();
        assert!(boundary.contains(Coordinate::new(0.5, 0.5)));
        assert!(!boundary.contains(Coordinate::new(1.0, 0.5)));
        assert!(!boundary.contains(Coordinate::new(2.0, 0.5)));
    }

    #[test]
    fn parses_first_feature_of_collection() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "name": "island" },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[-4.8, 54.0], [-4.3, 54.0], [-4.3, 54.4], [-4.8, 54.4], [-4.8, 54.0]]]
                    }
                }
            ]
        }"#;
        let boundary = LandBoundary::from_geojson_str(text).unwrap();
        assert!(boundary.contains(Coordinate::new(-4.4824, 54.1663)));
        assert!(!boundary.contains(Coordinate::new(-5.0, 54.1663)));
    }

    #[test]
    fn rejects_non_polygon_geometry() {
        let text = r#"{ "type": "Point", "coordinates": [-4.48, 54.16] }"#;
        let err = LandBoundary::from_geojson_str(text).unwrap_err();
        assert_eq!(err.kind(), "boundary");
        assert!(LandBoundary::from_geojson_str("not json").is_err());
    }
}
