//! HTTP clients for the services route generation depends on.
//!
//! [`OsrmClient`] talks to an OSRM-style routing engine and
//! [`TerrainProvider`] pulls elevation grids from an Open-Meteo style endpoint.

pub mod osrm;
pub mod terrain;

pub use osrm::{OsrmClient, DEFAULT_PROFILE};
pub use terrain::{TerrainConfig, TerrainGrid, TerrainProvider, DEFAULT_ELEVATION_URL};
