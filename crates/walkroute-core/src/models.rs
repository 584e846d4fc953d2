//! Core data models for route generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::color::ColorPolicy;
use crate::error::{Error, Result};

/// A geographic position in EPSG:4326 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinate {
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Reject non-finite or out-of-range positions.
    pub fn validate(&self) -> Result<()> {
        if !self.longitude.is_finite() || !self.latitude.is_finite() {
            return Err(Error::InvalidInput(
                "coordinate must be finite".to_string(),
            ));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::InvalidInput(format!(
                "longitude {} outside [-180, 180]",
                self.longitude
            )));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::InvalidInput(format!(
                "latitude {} outside [-90, 90]",
                self.latitude
            )));
        }
        Ok(())
    }

    /// (lat, lon) ordering used by web map libraries.
    pub fn lat_lon(&self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }
}

/// Two consecutive path vertices, in traversal order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSegment {
    pub start: Coordinate,
    pub end: Coordinate,
}

impl PathSegment {
    pub fn new(start: Coordinate, end: Coordinate) -> Self {
        Self { start, end }
    }

    pub fn reversed(&self) -> Self {
        Self {
            start: self.end,
            end: self.start,
        }
    }
}

/// Split a path into its consecutive-pair segments.
pub fn segments(path: &[Coordinate]) -> Vec<PathSegment> {
    path.windows(2)
        .map(|pair| PathSegment::new(pair[0], pair[1]))
        .collect()
}

fn default_num_routes() -> u32 {
    1
}

/// Parameters for one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub start: Coordinate,
    pub distance_km: f64,
    #[serde(default = "default_num_routes")]
    pub num_routes: u32,
    /// Fixed seed for reproducible end-point sampling.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Overrides the generator's color policy for this run only.
    #[serde(default)]
    pub color_policy: Option<ColorPolicy>,
}

impl RouteRequest {
    pub fn new(start: Coordinate, distance_km: f64, num_routes: u32) -> Self {
        Self {
            start,
            distance_km,
            num_routes,
            seed: None,
            color_policy: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.start.validate()?;
        if !self.distance_km.is_finite() || self.distance_km <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "distance_km must be > 0, got {}",
                self.distance_km
            )));
        }
        if self.num_routes == 0 {
            return Err(Error::InvalidInput(
                "num_routes must be at least 1".to_string(),
            ));
        }
        if let Some(policy) = &self.color_policy {
            policy.validate()?;
        }
        Ok(())
    }
}

/// One walking route with its per-segment grades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedRoute {
    pub id: Uuid,
    /// 1-based position within the owning set.
    pub number: u32,
    pub start: Coordinate,
    pub end: Coordinate,
    pub path: Vec<Coordinate>,
    /// Percent grade per segment; `path.len() - 1` entries.
    pub slopes: Vec<f64>,
    pub colors: Vec<String>,
    pub duration_s: f64,
    pub length_m: f64,
}

impl GeneratedRoute {
    /// First eight hex digits of the id, used for artifact names.
    pub fn short_id(&self) -> String {
        short_uuid(&self.id)
    }

    pub fn segments(&self) -> Vec<PathSegment> {
        segments(&self.path)
    }
}

/// A batch of routes generated from a single request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSet {
    pub id: String,
    pub start: Coordinate,
    pub distance_km: f64,
    pub routes: Vec<GeneratedRoute>,
    pub generated_at: DateTime<Utc>,
}

impl RouteSet {
    pub fn new_id() -> String {
        format!("routeset_{}", short_uuid(&Uuid::new_v4()))
    }
}

fn short_uuid(id: &Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}
