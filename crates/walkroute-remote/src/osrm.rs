//! OSRM routing engine client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use walkroute_core::{Coordinate, Error, Result, RoutedPath, RoutingService};

pub const DEFAULT_PROFILE: &str = "walking";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the `route/v1` endpoint of an OSRM server.
#[derive(Debug, Clone)]
pub struct OsrmClient {
    client: Client,
    base_url: String,
    profile: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    duration: f64,
    distance: f64,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<Vec<f64>>,
}

impl OsrmClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Reuse an existing connection pool.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            profile: DEFAULT_PROFILE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn route_url(&self, start: Coordinate, end: Coordinate) -> String {
        format!(
            "{}/route/v1/{}/{},{};{},{}?overview=full&geometries=geojson",
            self.base_url,
            self.profile,
            start.longitude,
            start.latitude,
            end.longitude,
            end.latitude
        )
    }
}

fn parse_route(body: &str) -> Result<RoutedPath> {
    let response: OsrmResponse = serde_json::from_str(body)
        .map_err(|err| Error::RoutingResponse(format!("invalid JSON: {err}")))?;

    let route = response.routes.into_iter().next().ok_or_else(|| {
        Error::RoutingResponse(format!(
            "no routes returned (code {})",
            response.code.as_deref().unwrap_or("missing")
        ))
    })?;

    let coordinates = route
        .geometry
        .coordinates
        .iter()
        .map(|position| match position.as_slice() {
            [lon, lat, ..] => Ok(Coordinate::new(*lon, *lat)),
            _ => Err(Error::RoutingResponse(format!(
                "position has {} values",
                position.len()
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    if coordinates.is_empty() {
        return Err(Error::RoutingResponse("route geometry is empty".to_string()));
    }

    Ok(RoutedPath {
        coordinates,
        duration_s: route.duration,
        length_m: route.distance,
    })
}

#[async_trait]
impl RoutingService for OsrmClient {
    async fn route(&self, start: Coordinate, end: Coordinate) -> Result<RoutedPath> {
        let url = self.route_url(start, end);
        tracing::debug!("Requesting route {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| Error::RoutingTransport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Routing engine returned HTTP {}", status);
            return Err(Error::RoutingService {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|err| Error::RoutingTransport(err.to_string()))?;
        parse_route(&body)
    }
}
