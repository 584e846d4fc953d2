//! Generate a set of randomized walking routes and write their artifacts.
//!
//! Usage:
//!   cargo run -p walkroute-cli --bin walkroute -- --lon -4.4824 --lat 54.1663 --distance-km 2

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Client;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkroute_cli::{build_policy, elevation_provider, format_summary, load_boundary};
use walkroute_core::{
    save_route_set, ColorMode, Coordinate, GeneratorConfig, RasterCrs, RouteRequest,
    RouteSetGenerator, SlopeScale, DEFAULT_MAX_ATTEMPTS, DEFAULT_OUTPUT_DIR,
};
use walkroute_remote::{OsrmClient, DEFAULT_ELEVATION_URL, DEFAULT_PROFILE};

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate randomized walking routes graded by slope")]
struct Args {
    /// Start longitude (degrees)
    #[arg(long, default_value_t = -4.4824, allow_hyphen_values = true)]
    lon: f64,

    /// Start latitude (degrees)
    #[arg(long, default_value_t = 54.1663, allow_hyphen_values = true)]
    lat: f64,

    /// Straight-line distance from start to each end point
    #[arg(long, default_value_t = 2.0)]
    distance_km: f64,

    /// Number of routes in the set
    #[arg(long, default_value_t = 1)]
    routes: u32,

    /// Seed for reproducible end points
    #[arg(long)]
    seed: Option<u64>,

    /// OSRM server base URL
    #[arg(long, default_value = "http://localhost:5000")]
    osrm_url: String,

    #[arg(long, default_value = DEFAULT_PROFILE)]
    profile: String,

    /// ESRI ASCII grid DSM; the remote elevation API is used when omitted
    #[arg(long)]
    dsm: Option<PathBuf>,

    /// Reference system of the DSM (e.g. EPSG:32630)
    #[arg(long, default_value = "EPSG:4326")]
    dsm_crs: RasterCrs,

    #[arg(long, default_value = DEFAULT_ELEVATION_URL)]
    elevation_url: String,

    /// GeoJSON polygon end points must fall inside
    #[arg(long)]
    boundary: Option<PathBuf>,

    /// continuous or thresholded
    #[arg(long, default_value = "continuous")]
    policy: ColorMode,

    #[arg(long, default_value_t = -1.0, allow_hyphen_values = true)]
    slope_min: f64,

    #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
    slope_max: f64,

    /// percent or fraction
    #[arg(long, default_value = "percent")]
    scale: SlopeScale,

    /// Output root directory
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    out: PathBuf,

    /// Sampling attempts before giving up on an end point
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("walkroute_core=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let policy = build_policy(args.policy, args.slope_min, args.slope_max, args.scale)
        .context("invalid color policy")?;
    let boundary = load_boundary(args.boundary.as_deref()).context("failed to load boundary")?;

    let client = Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .context("failed to build HTTP client")?;
    let routing = OsrmClient::with_client(client.clone(), args.osrm_url).with_profile(args.profile);
    let elevation = elevation_provider(args.dsm.as_deref(), args.dsm_crs, &args.elevation_url, client);

    let generator = RouteSetGenerator::new(
        routing,
        elevation,
        GeneratorConfig {
            sample_max_attempts: args.max_attempts,
            color_policy: policy,
            ..GeneratorConfig::default()
        },
    )
    .with_boundary(boundary);

    let mut request = RouteRequest::new(Coordinate::new(args.lon, args.lat), args.distance_km, args.routes);
    request.seed = args.seed;

    tracing::info!("Writing artifacts below {}", args.out.display());
    let set = generator
        .generate(&request)
        .await
        .context("route generation failed")?;
    let dir = save_route_set(&set, &args.out).context("failed to write artifacts")?;

    print!("{}", format_summary(&set));
    println!("Artifacts written to {}", dir.display());

    Ok(())
}
