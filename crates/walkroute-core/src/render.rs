//! GeoJSON and Leaflet HTML artifacts for generated routes.

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use plotters::prelude::*;
use serde_json::json;

use crate::color::Rgb;
use crate::error::{Error, Result};
use crate::models::{Coordinate, GeneratedRoute, RouteSet};
use crate::spatial::Bounds;

pub const DEFAULT_OUTPUT_DIR: &str = "routesets";

const LEAFLET_VERSION: &str = "1.9.4";
const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const ROUTE_STROKE_WEIGHT: u32 = 5;

const OVERVIEW_SIZE_PX: u32 = 1200;
const OVERVIEW_BUFFER_DEG: f64 = 0.001;
const OVERVIEW_STROKE_PX: u32 = 6;
const OVERVIEW_MARKER_PX: i32 = 10;

fn position(coord: Coordinate) -> Vec<f64> {
    vec![coord.longitude, coord.latitude]
}

fn line_feature(points: &[Coordinate], properties: JsonObject) -> Feature {
    Feature {
        geometry: Some(Geometry::new(Value::LineString(
            points.iter().copied().map(position).collect(),
        ))),
        properties: Some(properties),
        ..Default::default()
    }
}

fn object(value: serde_json::Value) -> JsonObject {
    match value {
        serde_json::Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}

/// Full route line followed by one feature per graded segment.
pub fn route_feature_collection(route: &GeneratedRoute) -> FeatureCollection {
    let mut features = Vec::with_capacity(route.slopes.len() + 1);
    features.push(line_feature(
        &route.path,
        object(json!({
            "id": route.id,
            "number": route.number,
            "length_m": route.length_m,
            "duration_s": route.duration_s,
        })),
    ));
    for (index, segment) in route.segments().iter().enumerate() {
        features.push(line_feature(
            &[segment.start, segment.end],
            object(json!({
                "segment": index,
                "slope": route.slopes.get(index),
                "color": route.colors.get(index),
            })),
        ));
    }

    let bbox = Bounds::from_points(&route.path)
        .map(|b| vec![b.min_lon, b.min_lat, b.max_lon, b.max_lat]);
    FeatureCollection {
        bbox,
        features,
        foreign_members: None,
    }
}

pub fn route_geojson_string(route: &GeneratedRoute) -> String {
    GeoJson::FeatureCollection(route_feature_collection(route)).to_string()
}

/// `Xm Ys`, rounded to whole seconds.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    format!("{}m {}s", total / 60, total % 60)
}

fn popup_text(route: &GeneratedRoute) -> String {
    format!(
        "Route UUID: {}<br>Route Number: {}<br>Route Length: {:.0} meters<br>Duration: {}",
        route.short_id(),
        route.number,
        route.length_m,
        format_duration(route.duration_s)
    )
}

fn route_layer(route: &GeneratedRoute) -> serde_json::Value {
    let segments: Vec<serde_json::Value> = route
        .segments()
        .iter()
        .zip(&route.colors)
        .map(|(segment, color)| {
            json!({
                "points": [segment.start.lat_lon(), segment.end.lat_lon()],
                "color": color,
            })
        })
        .collect();
    json!({
        "start": route.start.lat_lon(),
        "end": route.end.lat_lon(),
        "popup": popup_text(route),
        "segments": segments,
    })
}

fn leaflet_page(title: &str, center: Coordinate, routes: &[&GeneratedRoute]) -> String {
    let layers: Vec<serde_json::Value> = routes.iter().map(|route| route_layer(route)).collect();
    let data = json!({
        "center": center.lat_lon(),
        "weight": ROUTE_STROKE_WEIGHT,
        "routes": layers,
    });
    // Keep embedded strings from closing the script element.
    let data = data.to_string().replace("</", "<\\/");

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<link rel="stylesheet" href="https://unpkg.com/leaflet@{version}/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@{version}/dist/leaflet.js"></script>
<style>html, body, #map {{ height: 100%; margin: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
const data = {data};
const map = L.map("map").setView(data.center, 14);
L.tileLayer("{tiles}", {{ maxZoom: 19, attribution: "&copy; OpenStreetMap contributors" }}).addTo(map);
const marker = (color) => L.circleMarker([0, 0], {{ radius: 8, color: color, fillColor: color, fillOpacity: 0.9 }});
const extent = L.latLngBounds([]);
for (const route of data.routes) {{
  for (const segment of route.segments) {{
    L.polyline(segment.points, {{ color: segment.color, weight: data.weight, opacity: 0.9 }}).addTo(map);
    extent.extend(segment.points);
  }}
  marker("green").setLatLng(route.start).bindPopup("Start").addTo(map);
  marker("red").setLatLng(route.end).bindPopup(route.popup).addTo(map);
}}
if (extent.isValid()) {{ map.fitBounds(extent); }}
</script>
</body>
</html>
"#,
        title = title,
        version = LEAFLET_VERSION,
        tiles = TILE_URL,
        data = data,
    )
}

/// Interactive map of one route with its segments colored by grade.
pub fn route_webmap_html(route: &GeneratedRoute) -> String {
    leaflet_page(
        &format!("Route {}", route.number),
        route.start,
        &[route],
    )
}

/// Every route of a set on one map.
pub fn routeset_summary_html(set: &RouteSet) -> String {
    let routes: Vec<&GeneratedRoute> = set.routes.iter().collect();
    leaflet_page(&set.id, set.start, &routes)
}

/// Square lon/lat window around `path`, padded by a fixed buffer.
fn overview_extent(path: &[Coordinate]) -> Option<(Range<f64>, Range<f64>)> {
    let bounds = Bounds::from_points(path)?;
    let x_span = bounds.max_lon - bounds.min_lon;
    let y_span = bounds.max_lat - bounds.min_lat;
    let center = bounds.center();
    let half = x_span.max(y_span) / 2.0 + OVERVIEW_BUFFER_DEG;
    Some((
        center.longitude - half..center.longitude + half,
        center.latitude - half..center.latitude + half,
    ))
}

fn render_error<E: std::fmt::Display>(err: E) -> Error {
    Error::Render(err.to_string())
}

/// Static PNG of one route: graded segments plus start and end markers.
pub fn route_overview_png(route: &GeneratedRoute, out: &Path) -> Result<()> {
    let (x_range, y_range) = overview_extent(&route.path)
        .ok_or_else(|| Error::Render("route has no drawable points".to_string()))?;

    let root = BitMapBackend::new(out, (OVERVIEW_SIZE_PX, OVERVIEW_SIZE_PX)).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;
    let mut chart = ChartBuilder::on(&root)
        .build_cartesian_2d(x_range, y_range)
        .map_err(render_error)?;

    chart
        .draw_series(route.segments().iter().zip(&route.colors).map(|(segment, color)| {
            let Rgb(r, g, b) = Rgb::from_hex(color).unwrap_or(Rgb::GREEN);
            PathElement::new(
                vec![
                    (segment.start.longitude, segment.start.latitude),
                    (segment.end.longitude, segment.end.latitude),
                ],
                RGBColor(r, g, b).stroke_width(OVERVIEW_STROKE_PX),
            )
        }))
        .map_err(render_error)?;

    let Rgb(gr, gg, gb) = Rgb::GREEN;
    let Rgb(rr, rg, rb) = Rgb::RED;
    chart
        .draw_series([
            Circle::new(
                (route.start.longitude, route.start.latitude),
                OVERVIEW_MARKER_PX,
                RGBColor(gr, gg, gb).filled(),
            ),
            Circle::new(
                (route.end.longitude, route.end.latitude),
                OVERVIEW_MARKER_PX,
                RGBColor(rr, rg, rb).filled(),
            ),
        ])
        .map_err(render_error)?;

    root.present().map_err(render_error)?;
    Ok(())
}

/// Write a set's artifacts below `root/<set id>/` and return that directory.
pub fn save_route_set(set: &RouteSet, root: impl AsRef<Path>) -> Result<PathBuf> {
    let set_dir = root.as_ref().join(&set.id);
    fs::create_dir_all(&set_dir)?;

    for route in &set.routes {
        let short = route.short_id();
        let route_dir = set_dir.join(format!("route_{short}"));
        fs::create_dir_all(&route_dir)?;
        fs::write(
            route_dir.join(format!("{short}_routeinfo.geojson")),
            route_geojson_string(route),
        )?;
        fs::write(
            route_dir.join(format!("{short}_webmap.html")),
            route_webmap_html(route),
        )?;
        route_overview_png(route, &route_dir.join(format!("{short}_route_overview.png")))?;
    }

    fs::write(
        set_dir.join(format!("{}_routeset_summary.html", set.id)),
        routeset_summary_html(set),
    )?;
    tracing::info!(
        "Saved {} route(s) for {} to {}",
        set.routes.len(),
        set.id,
        set_dir.display()
    );
    Ok(set_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_route() -> GeneratedRoute {
        GeneratedRoute {
            id: Uuid::new_v4(),
            number: 2,
            start: Coordinate::new(-4.4824, 54.1663),
            end: Coordinate::new(-4.4750, 54.1702),
            path: vec![
                Coordinate::new(-4.4824, 54.1663),
                Coordinate::new(-4.4790, 54.1690),
                Coordinate::new(-4.4750, 54.1702),
            ],
            slopes: vec![3.2, -4.1],
            colors: vec!["#ff0000".to_string(), "#008000".to_string()],
            duration_s: 754.0,
            length_m: 1042.0,
        }
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(754.0), "12m 34s");
        assert_eq!(format_duration(59.6), "1m 0s");
        assert_eq!(format_duration(-3.0), "0m 0s");
    }

    #[test]
    fn feature_collection_has_line_plus_segments() {
        let route = sample_route();
        let collection = route_feature_collection(&route);
        assert_eq!(collection.features.len(), 3);

        let head = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(head["number"], 2);
        assert_eq!(head["length_m"], 1042.0);

        let second = collection.features[2].properties.as_ref().unwrap();
        assert_eq!(second["slope"], -4.1);
        assert_eq!(second["color"], "#008000");
        assert_eq!(collection.bbox.as_ref().unwrap().len(), 4);
    }

    #[test]
    fn webmap_embeds_colors_and_popup() {
        let route = sample_route();
        let html = route_webmap_html(&route);
        assert!(html.contains("#ff0000"));
        assert!(html.contains(&format!("Route UUID: {}<br>", route.short_id())));
        assert!(html.contains("Route Length: 1042 meters"));
        assert!(html.contains("Duration: 12m 34s"));
        assert!(!html.contains("</script><"));
    }

    #[test]
    fn overview_extent_is_square_with_buffer() {
        let route = sample_route();
        let (x, y) = overview_extent(&route.path).unwrap();
        assert!(((x.end - x.start) - (y.end - y.start)).abs() < 1e-12);
        // Longitude span 0.0074 dominates the latitude span.
        assert!(((x.end - x.start) - (0.0074 + 0.002)).abs() < 1e-9);
        assert!(overview_extent(&[]).is_none());
    }

    #[test]
    fn overview_png_is_written() {
        let route = sample_route();
        let out = std::env::temp_dir().join(format!("walkroute-overview-{}.png", Uuid::new_v4()));
        route_overview_png(&route, &out).unwrap();
        let bytes = fs::read(&out).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        fs::remove_file(out).unwrap();
    }

    #[test]
    fn saves_expected_layout() {
        let route = sample_route();
        let short = route.short_id();
        let set = RouteSet {
            id: RouteSet::new_id(),
            start: route.start,
            distance_km: 1.0,
            routes: vec![route],
            generated_at: Utc::now(),
        };
        let root = std::env::temp_dir().join(format!("walkroute-render-{}", Uuid::new_v4()));
        let dir = save_route_set(&set, &root).unwrap();

        assert!(dir
            .join(format!("route_{short}"))
            .join(format!("{short}_routeinfo.geojson"))
            .is_file());
        assert!(dir
            .join(format!("route_{short}"))
            .join(format!("{short}_webmap.html"))
            .is_file());
        assert!(dir
            .join(format!("route_{short}"))
            .join(format!("{short}_route_overview.png"))
            .is_file());
        assert!(dir
            .join(format!("{}_routeset_summary.html", set.id))
            .is_file());

        let text = fs::read_to_string(
            dir.join(format!("route_{short}"))
                .join(format!("{short}_routeinfo.geojson")),
        )
        .unwrap();
        assert!(text.parse::<GeoJson>().is_ok());
        fs::remove_dir_all(root).unwrap();
    }
}
