//! Core logic for generating randomized walking routes and grading their terrain.
//!
//! The pieces compose in one direction: the sampler picks route end points,
//! a [`RoutingService`] turns start/end pairs into paths, and the slope
//! estimator grades each path segment against an elevation surface before
//! the color policy maps grades to display colors.

pub mod boundary;
pub mod color;
pub mod elevation;
pub mod error;
pub mod generator;
pub mod geotiff;
pub mod models;
pub mod projection;
pub mod render;
pub mod routing;
pub mod sampler;
pub mod slope;
pub mod spatial;

pub use boundary::LandBoundary;
pub use color::{ColorMode, ColorPolicy, Rgb, SlopeScale};
pub use elevation::{DsmFile, DsmFormat, ElevationGrid, ElevationProvider, ElevationSource};
pub use error::{Error, Result};
pub use generator::{GeneratorConfig, RouteSetGenerator};
pub use models::{segments, Coordinate, GeneratedRoute, PathSegment, RouteRequest, RouteSet};
pub use projection::{ProjectionCache, RasterCrs, UtmProjection, UtmZone};
pub use render::{save_route_set, DEFAULT_OUTPUT_DIR};
pub use routing::{RoutedPath, RoutingService};
pub use sampler::{sample_endpoint, DEFAULT_MAX_ATTEMPTS};
pub use slope::{compute_slopes, DegenerateSegmentPolicy, SlopeEstimator};
pub use spatial::haversine_distance;
