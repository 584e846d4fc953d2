//! walkroute CLI - generate route sets from the command line.
//!
//! The `walkroute` binary wires the OSRM client and an elevation source into
//! the core generator and writes the resulting artifacts to disk.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use reqwest::Client;
use walkroute_core::render::format_duration;
use walkroute_core::{
    ColorMode, ColorPolicy, DsmFile, ElevationProvider, LandBoundary, RasterCrs, RouteSet,
    SlopeScale,
};
use walkroute_remote::{TerrainConfig, TerrainProvider};

/// DSM file when given, otherwise the remote elevation grid.
pub fn elevation_provider(
    dsm: Option<&Path>,
    dsm_crs: RasterCrs,
    elevation_url: &str,
    client: Client,
) -> Arc<dyn ElevationProvider> {
    match dsm {
        Some(path) => Arc::new(DsmFile::new(path, dsm_crs)),
        None => Arc::new(TerrainProvider::new(
            client,
            TerrainConfig {
                url: elevation_url.to_string(),
                ..TerrainConfig::default()
            },
        )),
    }
}

pub fn load_boundary(path: Option<&Path>) -> walkroute_core::Result<Option<Arc<LandBoundary>>> {
    path.map(|path| LandBoundary::load(path).map(Arc::new))
        .transpose()
}

pub fn build_policy(
    mode: ColorMode,
    slope_min: f64,
    slope_max: f64,
    scale: SlopeScale,
) -> walkroute_core::Result<ColorPolicy> {
    let policy = ColorPolicy {
        mode,
        scale,
        ..ColorPolicy::default()
    }
    .with_domain(slope_min, slope_max);
    policy.validate()?;
    Ok(policy)
}

/// One line per route: number, short id, length, duration, grade range.
pub fn format_summary(set: &RouteSet) -> String {
    let mut out = format!(
        "{}: {} route(s), {} km from ({:.5}, {:.5})\n",
        set.id,
        set.routes.len(),
        set.distance_km,
        set.start.longitude,
        set.start.latitude
    );
    for route in &set.routes {
        let (low, high) = route
            .slopes
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
                (lo.min(*s), hi.max(*s))
            });
        let range = if route.slopes.is_empty() {
            "n/a".to_string()
        } else {
            format!("{low:+.1}% .. {high:+.1}%")
        };
        let _ = writeln!(
            out,
            "  #{} {}  {:.2} km  {}  grade {}",
            route.number,
            route.short_id(),
            route.length_m / 1000.0,
            format_duration(route.duration_s),
            range
        );
    }
    out
}
