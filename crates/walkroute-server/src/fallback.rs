//! Canned route set served when generation fails.

use chrono::Utc;
use uuid::Uuid;
use walkroute_core::{ColorPolicy, Coordinate, GeneratedRoute, RouteSet};

const FALLBACK_SET_ID: &str = "routeset_fallback";

/// A short loop around Douglas promenade with fixed grades.
pub fn fallback_route_set(policy: &ColorPolicy) -> RouteSet {
    let path = vec![
        Coordinate::new(-4.4824, 54.1663),
        Coordinate::new(-4.4801, 54.1671),
        Coordinate::new(-4.4779, 54.1685),
        Coordinate::new(-4.4790, 54.1702),
        Coordinate::new(-4.4817, 54.1694),
    ];
    let slopes = vec![1.2, 3.8, -0.6, -2.9];
    let start = path[0];
    let end = path[path.len() - 1];

    RouteSet {
        id: FALLBACK_SET_ID.to_string(),
        start,
        distance_km: 1.0,
        routes: vec![GeneratedRoute {
            id: Uuid::nil(),
            number: 1,
            start,
            end,
            colors: policy.colors(&slopes),
            slopes,
            path,
            duration_s: 840.0,
            length_m: 1020.0,
        }],
        generated_at: Utc::now(),
    }
}
