//! Seam for the external routing engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Coordinate;

/// Path geometry and summary returned by the routing engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedPath {
    pub coordinates: Vec<Coordinate>,
    pub duration_s: f64,
    pub length_m: f64,
}

/// Anything that can produce a walking path between two points.
#[async_trait]
pub trait RoutingService: Send + Sync {
    async fn route(&self, start: Coordinate, end: Coordinate) -> Result<RoutedPath>;
}
