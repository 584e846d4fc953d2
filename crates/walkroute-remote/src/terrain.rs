//! Elevation grids fetched from an Open-Meteo style elevation API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use walkroute_core::spatial::Bounds;
use walkroute_core::{
    Coordinate, ElevationProvider, ElevationSource, Error, RasterCrs, Result,
};

pub const DEFAULT_ELEVATION_URL: &str = "https://api.open-meteo.com/v1/elevation";

const METERS_PER_DEG_LAT: f64 = 111_320.0;
const MIN_PAD_DEG: f64 = 0.0015;
const MAX_SPACING_M: f64 = 2000.0;

#[derive(Debug, Clone)]
pub struct TerrainConfig {
    pub url: String,
    pub sample_spacing_m: f64,
    pub max_grid_points: usize,
    pub max_points_per_request: usize,
    pub request_timeout_s: u64,
    pub pad_ratio: f64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ELEVATION_URL.to_string(),
            sample_spacing_m: 30.0,
            max_grid_points: 4000,
            max_points_per_request: 100,
            request_timeout_s: 10,
            pad_ratio: 0.2,
        }
    }
}

/// Regular lat/lon grid, row 0 at `min_lat`.
#[derive(Debug, Clone)]
pub struct TerrainGrid {
    bounds: Bounds,
    lat_step_deg: f64,
    lon_step_deg: f64,
    rows: usize,
    cols: usize,
    elevations_m: Vec<f64>,
}

impl TerrainGrid {
    pub fn new(
        bounds: Bounds,
        rows: usize,
        cols: usize,
        elevations_m: Vec<f64>,
    ) -> Result<Self> {
        if rows < 2 || cols < 2 || elevations_m.len() != rows * cols {
            return Err(Error::ElevationUnavailable(format!(
                "terrain grid {}x{} cannot hold {} samples",
                rows,
                cols,
                elevations_m.len()
            )));
        }
        Ok(Self {
            lat_step_deg: (bounds.max_lat - bounds.min_lat) / (rows - 1) as f64,
            lon_step_deg: (bounds.max_lon - bounds.min_lon) / (cols - 1) as f64,
            bounds,
            rows,
            cols,
            elevations_m,
        })
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn value_at(&self, row: usize, col: usize) -> f64 {
        let idx = row.min(self.rows - 1) * self.cols + col.min(self.cols - 1);
        self.elevations_m.get(idx).copied().unwrap_or(f64::NAN)
    }
}

impl ElevationSource for TerrainGrid {
    fn crs(&self) -> RasterCrs {
        RasterCrs::Geographic
    }

    /// Bilinear interpolation; `x` is longitude and `y` latitude.
    fn sample(&self, x: f64, y: f64) -> Option<f64> {
        if !self.bounds.contains(Coordinate::new(x, y)) {
            return None;
        }
        let lat_step = self.lat_step_deg.max(1e-12);
        let lon_step = self.lon_step_deg.max(1e-12);
        let gy = ((y - self.bounds.min_lat) / lat_step).clamp(0.0, (self.rows - 1) as f64);
        let gx = ((x - self.bounds.min_lon) / lon_step).clamp(0.0, (self.cols - 1) as f64);

        let y0 = gy.floor() as usize;
        let x0 = gx.floor() as usize;
        let y1 = (y0 + 1).min(self.rows - 1);
        let x1 = (x0 + 1).min(self.cols - 1);
        let dy = gy - y0 as f64;
        let dx = gx - x0 as f64;

        let v00 = self.value_at(y0, x0);
        let v10 = self.value_at(y0, x1);
        let v01 = self.value_at(y1, x0);
        let v11 = self.value_at(y1, x1);

        let v0 = v00 + (v10 - v00) * dx;
        let v1 = v01 + (v11 - v01) * dx;
        let value = v0 + (v1 - v0) * dy;
        value.is_finite().then_some(value)
    }
}

#[derive(Debug, Deserialize)]
struct OpenMeteoElevationResponse {
    elevation: Option<Vec<Option<f64>>>,
}

/// Fetches a fresh grid covering each path.
#[derive(Debug, Clone)]
pub struct TerrainProvider {
    client: Client,
    config: TerrainConfig,
}

impl TerrainProvider {
    pub fn new(client: Client, config: TerrainConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    async fn fetch_chunk(&self, latitudes: &[f64], longitudes: &[f64]) -> Result<Vec<f64>> {
        let url = build_provider_url(
            &self.config.url,
            &join_params(latitudes),
            &join_params(longitudes),
        );
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(self.config.request_timeout_s.max(3)))
            .send()
            .await
            .map_err(|err| Error::ElevationUnavailable(format!("terrain fetch failed: {err}")))?;

        if !response.status().is_success() {
            return Err(Error::ElevationUnavailable(format!(
                "terrain provider HTTP {}",
                response.status()
            )));
        }

        let payload: OpenMeteoElevationResponse = response
            .json()
            .await
            .map_err(|err| Error::ElevationUnavailable(format!("terrain parse failed: {err}")))?;
        let chunk = payload.elevation.ok_or_else(|| {
            Error::ElevationUnavailable("terrain provider missing elevation".to_string())
        })?;
        if chunk.len() != latitudes.len() {
            return Err(Error::ElevationUnavailable(
                "terrain provider returned unexpected sample count".to_string(),
            ));
        }
        Ok(chunk
            .into_iter()
            .map(|value| value.filter(|v| v.is_finite()).unwrap_or(f64::NAN))
            .collect())
    }
}

#[async_trait]
impl ElevationProvider for TerrainProvider {
    async fn open(&self, path: &[Coordinate]) -> Result<Box<dyn ElevationSource>> {
        if self.config.url.trim().is_empty() {
            return Err(Error::ElevationUnavailable(
                "terrain provider URL is empty".to_string(),
            ));
        }
        let bounds = Bounds::from_points(path)
            .ok_or_else(|| Error::ElevationUnavailable("path has no finite points".to_string()))?
            .expand(self.config.pad_ratio, MIN_PAD_DEG);

        let (rows, cols, lat_step_deg, lon_step_deg) = resolve_grid_dims(
            &bounds,
            self.config.sample_spacing_m,
            self.config.max_grid_points,
        );
        let bounds = Bounds {
            max_lat: bounds.min_lat + (rows - 1) as f64 * lat_step_deg,
            max_lon: bounds.min_lon + (cols - 1) as f64 * lon_step_deg,
            ..bounds
        };

        let total = rows * cols;
        let mut latitudes = Vec::with_capacity(total);
        let mut longitudes = Vec::with_capacity(total);
        for row in 0..rows {
            let lat = bounds.min_lat + row as f64 * lat_step_deg;
            for col in 0..cols {
                latitudes.push(lat);
                longitudes.push(bounds.min_lon + col as f64 * lon_step_deg);
            }
        }

        let chunk_size = self.config.max_points_per_request.max(1);
        let mut elevations = Vec::with_capacity(total);
        for (lat_chunk, lon_chunk) in latitudes.chunks(chunk_size).zip(longitudes.chunks(chunk_size)) {
            elevations.extend(self.fetch_chunk(lat_chunk, lon_chunk).await?);
        }
        tracing::debug!(
            "Fetched {}x{} terrain grid from {}",
            rows,
            cols,
            self.config.url
        );

        Ok(Box::new(TerrainGrid::new(bounds, rows, cols, elevations)?))
    }
}

/// Grid rows, columns and step sizes that keep the sample count under `max_points`.
fn resolve_grid_dims(bounds: &Bounds, spacing_m: f64, max_points: usize) -> (usize, usize, f64, f64) {
    let mean_lat = ((bounds.min_lat + bounds.max_lat) / 2.0).to_radians();
    let meters_per_deg_lon = METERS_PER_DEG_LAT * mean_lat.cos().max(0.01);
    let mut spacing = spacing_m.max(5.0);
    let max_points = max_points.max(4);

    loop {
        let lat_step_deg = spacing / METERS_PER_DEG_LAT;
        let lon_step_deg = spacing / meters_per_deg_lon;
        let rows = ((bounds.max_lat - bounds.min_lat) / lat_step_deg).ceil().max(1.0) as usize + 1;
        let cols = ((bounds.max_lon - bounds.min_lon) / lon_step_deg).ceil().max(1.0) as usize + 1;
        let total = rows.saturating_mul(cols);
        if total <= max_points || spacing > MAX_SPACING_M {
            return (rows, cols, lat_step_deg, lon_step_deg);
        }
        spacing *= ((total as f64) / (max_points as f64)).sqrt().max(1.1);
    }
}

fn join_params(values: &[f64]) -> String {
    values
        .iter()
        .map(|value| format!("{:.6}", value))
        .collect::<Vec<_>>()
        .join(",")
}

fn build_provider_url(base: &str, latitudes: &str, longitudes: &str) -> String {
    let separator = if base.contains('?') { "&" } else { "?" };
    format!(
        "{}{}latitude={}&longitude={}",
        base, separator, latitudes, longitudes
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Query, State};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn unit_bounds() -> Bounds {
        Bounds {
            min_lat: 54.0,
            max_lat: 54.01,
            min_lon: -4.5,
            max_lon: -4.49,
        }
    }

    #[test]
    fn bilinear_sampling_between_corners() {
        // Rows run south to north: 0, 10 / 20, 30.
        let grid = TerrainGrid::new(unit_bounds(), 2, 2, vec![0.0, 10.0, 20.0, 30.0]).unwrap();
        assert_eq!(grid.sample(-4.5, 54.0), Some(0.0));
        assert_eq!(grid.sample(-4.49, 54.01), Some(30.0));
        let mid = grid.sample(-4.495, 54.005).unwrap();
        assert!((mid - 15.0).abs() < 1e-6);
    }

    #[test]
    fn outside_coverage_or_missing_sample_is_none() {
        let grid = TerrainGrid::new(unit_bounds(), 2, 2, vec![0.0, f64::NAN, 20.0, 30.0]).unwrap();
        assert_eq!(grid.sample(-4.6, 54.005), None);
        assert_eq!(grid.sample(-4.495, 54.005), None);
        assert_eq!(grid.sample(-4.5, 54.01), Some(20.0));
    }

    #[test]
    fn rejects_mismatched_sample_count() {
        assert!(TerrainGrid::new(unit_bounds(), 2, 2, vec![1.0; 3]).is_err());
        assert!(TerrainGrid::new(unit_bounds(), 1, 4, vec![1.0; 4]).is_err());
    }

    #[test]
    fn grid_dims_respect_point_budget() {
        let bounds = Bounds {
            min_lat: 54.0,
            max_lat: 54.2,
            min_lon: -4.7,
            max_lon: -4.3,
        };
        let (rows, cols, lat_step, lon_step) = resolve_grid_dims(&bounds, 30.0, 500);
        assert!(rows * cols <= 500, "{rows}x{cols}");
        assert!(bounds.min_lat + (rows - 1) as f64 * lat_step >= bounds.max_lat - 1e-9);
        assert!(bounds.min_lon + (cols - 1) as f64 * lon_step >= bounds.max_lon - 1e-9);
    }

    #[test]
    fn provider_url_formatting() {
        assert_eq!(
            build_provider_url("https://example.test/v1/elevation", "54.000000", "-4.500000"),
            "https://example.test/v1/elevation?latitude=54.000000&longitude=-4.500000"
        );
        assert_eq!(
            build_provider_url("https://example.test/e?key=x", "1", "2"),
            "https://example.test/e?key=x&latitude=1&longitude=2"
        );
        assert_eq!(join_params(&[1.0, -2.5]), "1.000000,-2.500000");
    }

    /// Synthetic plane: 10 m per 0.001 degree north, 1 m per 0.001 degree east.
    fn plane(lat: f64, lon: f64) -> f64 {
        (lat - 54.0) * 10_000.0 + (lon + 4.5) * 1_000.0
    }

    async fn elevation_stub() -> (String, Arc<AtomicUsize>) {
        async fn handler(
            State(calls): State<Arc<AtomicUsize>>,
            Query(params): Query<HashMap<String, String>>,
        ) -> axum::Json<serde_json::Value> {
            calls.fetch_add(1, Ordering::SeqCst);
            let parse = |key: &str| -> Vec<f64> {
                params[key].split(',').map(|v| v.parse().unwrap()).collect()
            };
            let elevation: Vec<f64> = parse("latitude")
                .into_iter()
                .zip(parse("longitude"))
                .map(|(lat, lon)| plane(lat, lon))
                .collect();
            axum::Json(serde_json::json!({ "elevation": elevation }))
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let router = axum::Router::new()
            .route("/v1/elevation", axum::routing::get(handler))
            .with_state(calls.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        (format!("http://{addr}/v1/elevation"), calls)
    }

    #[tokio::test]
    async fn chunked_fetch_reassembles_grid_in_order() {
        let (url, calls) = elevation_stub().await;
        let provider = TerrainProvider::new(
            Client::new(),
            TerrainConfig {
                url,
                max_grid_points: 60,
                max_points_per_request: 7,
                ..TerrainConfig::default()
            },
        );
        let path = [Coordinate::new(-4.48, 54.16), Coordinate::new(-4.478, 54.161)];
        let surface = provider.open(&path).await.unwrap();

        assert!(calls.load(Ordering::SeqCst) >= 2, "expected several chunks");
        for point in [path[0], path[1], Coordinate::new(-4.4791, 54.1604)] {
            let value = surface.sample(point.longitude, point.latitude).unwrap();
            let expected = plane(point.latitude, point.longitude);
            assert!((value - expected).abs() < 0.05, "{value} vs {expected}");
        }
    }

    #[tokio::test]
    async fn provider_error_status_is_elevation_unavailable() {
        use axum::http::StatusCode;

        let router = axum::Router::new().fallback(|| async { StatusCode::TOO_MANY_REQUESTS });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

        let provider = TerrainProvider::new(
            Client::new(),
            TerrainConfig {
                url: format!("http://{addr}/v1/elevation"),
                ..TerrainConfig::default()
            },
        );
        let err = provider
            .open(&[Coordinate::new(-4.48, 54.16)])
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), "elevation_unavailable");
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn unreachable_provider_is_elevation_unavailable() {
        let provider = TerrainProvider::new(
            Client::new(),
            TerrainConfig {
                url: "http://127.0.0.1:9/v1/elevation".to_string(),
                request_timeout_s: 3,
                ..TerrainConfig::default()
            },
        );
        let path = [Coordinate::new(-4.48, 54.16), Coordinate::new(-4.47, 54.17)];
        let err = provider.open(&path).await.err().unwrap();
        assert_eq!(err.kind(), "elevation_unavailable");
    }
}
