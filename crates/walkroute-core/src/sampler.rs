//! Random end-point sampling around a start point.

use std::f64::consts::TAU;

use rand::Rng;

use crate::boundary::LandBoundary;
use crate::error::{Error, Result};
use crate::models::Coordinate;

/// Rejection-sampling budget when a land boundary is supplied.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10_000;

const KM_PER_DEGREE: f64 = 111.0;

/// Pick a point roughly `distance_km` from `start` at a uniform random bearing.
///
/// Uses the flat-earth approximation of 111 km per degree, with the longitude
/// step widened by `1 / cos(latitude)`. When `boundary` is given, candidates
/// outside it are discarded until one lands strictly inside or `max_attempts`
/// candidates have been tried.
pub fn sample_endpoint<R: Rng + ?Sized>(
    rng: &mut R,
    start: Coordinate,
    distance_km: f64,
    boundary: Option<&LandBoundary>,
    max_attempts: u32,
) -> Result<Coordinate> {
    start.validate()?;
    if !distance_km.is_finite() || distance_km <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "distance_km must be > 0, got {distance_km}"
        )));
    }

    let delta_lat = distance_km / KM_PER_DEGREE;
    let cos_lat = start.latitude.to_radians().cos();
    if cos_lat.abs() < 1e-9 {
        return Err(Error::InvalidInput(
            "cannot sample a bearing at the poles".to_string(),
        ));
    }
    let delta_lon = distance_km / (KM_PER_DEGREE * cos_lat);

    let Some(boundary) = boundary else {
        return Ok(candidate(rng, start, delta_lat, delta_lon));
    };

    for attempt in 1..=max_attempts {
        let point = candidate(rng, start, delta_lat, delta_lon);
        if boundary.contains(point) {
            tracing::debug!("Sampled end point on land after {} attempts", attempt);
            return Ok(point);
        }
    }

    tracing::warn!(
        "No end point inside the land boundary after {} attempts",
        max_attempts
    );
    Err(Error::SamplingExhausted {
        attempts: max_attempts,
    })
}

fn candidate<R: Rng + ?Sized>(
    rng: &mut R,
    start: Coordinate,
    delta_lat: f64,
    delta_lon: f64,
) -> Coordinate {
    let angle = rng.random_range(0.0..TAU);
    Coordinate::new(
        wrap_longitude(start.longitude + delta_lon * angle.cos()),
        start.latitude + delta_lat * angle.sin(),
    )
}

/// Bring a longitude back into [-180, 180).
fn wrap_longitude(longitude: f64) -> f64 {
    (longitude + 180.0).rem_euclid(360.0) - 180.0
}
