//! Shared, read-only server state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use walkroute_core::{
    DsmFile, ElevationProvider, GeneratorConfig, LandBoundary, RouteSetGenerator,
};
use walkroute_remote::{OsrmClient, TerrainConfig, TerrainProvider};

use crate::config::Config;

pub type Generator = RouteSetGenerator<OsrmClient, Arc<dyn ElevationProvider>>;

/// Everything a request needs; nothing here is mutated after startup.
pub struct AppState {
    pub config: Config,
    http: Client,
    boundary: Option<Arc<LandBoundary>>,
    elevation: Arc<dyn ElevationProvider>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        config
            .color_policy
            .validate()
            .context("invalid default color policy")?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_s.max(1)))
            .build()
            .context("failed to build HTTP client")?;

        let boundary = match &config.boundary_path {
            Some(path) => Some(Arc::new(
                LandBoundary::load(path)
                    .with_context(|| format!("failed to load land boundary {path}"))?,
            )),
            None => None,
        };

        let elevation: Arc<dyn ElevationProvider> = match &config.dsm_path {
            Some(path) => {
                tracing::info!("Using DSM {} ({})", path, config.dsm_crs);
                Arc::new(DsmFile::new(PathBuf::from(path), config.dsm_crs))
            }
            None => {
                tracing::info!("Using remote elevation grid from {}", config.elevation_url);
                Arc::new(TerrainProvider::new(
                    http.clone(),
                    TerrainConfig {
                        url: config.elevation_url.clone(),
                        request_timeout_s: config.request_timeout_s,
                        ..TerrainConfig::default()
                    },
                ))
            }
        };

        Ok(Self {
            config,
            http,
            boundary,
            elevation,
        })
    }

    /// A generator for one request, built from the server defaults.
    pub fn generator(&self) -> Generator {
        let routing = OsrmClient::with_client(self.http.clone(), self.config.osrm_url.clone())
            .with_profile(self.config.osrm_profile.clone())
            .with_timeout(Duration::from_secs(self.config.request_timeout_s.max(1)));
        let config = GeneratorConfig {
            sample_max_attempts: self.config.sample_max_attempts,
            color_policy: self.config.color_policy,
            ..GeneratorConfig::default()
        };
        RouteSetGenerator::new(routing, self.elevation.clone(), config)
            .with_boundary(self.boundary.clone())
    }
}
