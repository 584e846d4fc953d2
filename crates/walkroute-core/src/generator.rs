//! Route-set generation: sample, route, grade, classify.

use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::boundary::LandBoundary;
use crate::color::ColorPolicy;
use crate::elevation::ElevationProvider;
use crate::error::{Error, Result};
use crate::models::{segments, GeneratedRoute, RouteRequest, RouteSet};
use crate::routing::RoutingService;
use crate::sampler::{sample_endpoint, DEFAULT_MAX_ATTEMPTS};
use crate::slope::{compute_slopes, DegenerateSegmentPolicy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub sample_max_attempts: u32,
    pub degenerate_policy: DegenerateSegmentPolicy,
    pub color_policy: ColorPolicy,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            sample_max_attempts: DEFAULT_MAX_ATTEMPTS,
            degenerate_policy: DegenerateSegmentPolicy::default(),
            color_policy: ColorPolicy::default(),
        }
    }
}

/// Generates route sets one route at a time.
pub struct RouteSetGenerator<R, E> {
    routing: R,
    elevation: E,
    boundary: Option<Arc<LandBoundary>>,
    config: GeneratorConfig,
}

impl<R: RoutingService, E: ElevationProvider> RouteSetGenerator<R, E> {
    pub fn new(routing: R, elevation: E, config: GeneratorConfig) -> Self {
        Self {
            routing,
            elevation,
            boundary: None,
            config,
        }
    }

    /// Keep sampled end points inside `boundary`.
    pub fn with_boundary(mut self, boundary: Option<Arc<LandBoundary>>) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate `request.num_routes` routes. Any failing route aborts the set.
    pub async fn generate(&self, request: &RouteRequest) -> Result<RouteSet> {
        request.validate()?;
        let policy = request.color_policy.unwrap_or(self.config.color_policy);
        policy.validate()?;

        let mut rng = match request.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let id = RouteSet::new_id();
        tracing::info!(
            "Generating {} ({} routes, {} km from {:.5},{:.5})",
            id,
            request.num_routes,
            request.distance_km,
            request.start.longitude,
            request.start.latitude
        );

        let mut routes = Vec::with_capacity(request.num_routes as usize);
        for number in 1..=request.num_routes {
            let route = self.generate_route(&mut rng, request, number, &policy).await?;
            tracing::info!(
                "Route {} of {}: {} points, {:.0} m, {:.0} s",
                number,
                request.num_routes,
                route.path.len(),
                route.length_m,
                route.duration_s
            );
            routes.push(route);
        }

        Ok(RouteSet {
            id,
            start: request.start,
            distance_km: request.distance_km,
            routes,
            generated_at: Utc::now(),
        })
    }

    async fn generate_route(
        &self,
        rng: &mut StdRng,
        request: &RouteRequest,
        number: u32,
        policy: &ColorPolicy,
    ) -> Result<GeneratedRoute> {
        let end = sample_endpoint(
            rng,
            request.start,
            request.distance_km,
            self.boundary.as_deref(),
            self.config.sample_max_attempts,
        )?;

        let routed = self.routing.route(request.start, end).await?;
        if routed.coordinates.len() < 2 {
            return Err(Error::RoutingResponse(format!(
                "path has {} points, need at least 2",
                routed.coordinates.len()
            )));
        }

        let slopes = {
            let surface = self.elevation.open(&routed.coordinates).await?;
            compute_slopes(
                &segments(&routed.coordinates),
                surface.as_ref(),
                self.config.degenerate_policy,
            )?
        };
        let colors = policy.colors(&slopes);

        Ok(GeneratedRoute {
            id: Uuid::new_v4(),
            number,
            start: request.start,
            end,
            path: routed.coordinates,
            slopes,
            colors,
            duration_s: routed.duration_s,
            length_m: routed.length_m,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevation::ElevationSource;
    use crate::models::Coordinate;
    use crate::projection::RasterCrs;
    use crate::routing::RoutedPath;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const START: Coordinate = Coordinate::new(-4.4824, 54.1663);
    const PATH: [Coordinate; 3] = [
        Coordinate::new(-4.4824, 54.1663),
        Coordinate::new(-4.4790, 54.1690),
        Coordinate::new(-4.4750, 54.1702),
    ];

    struct FixedRouting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RoutingService for FixedRouting {
        async fn route(&self, start: Coordinate, _end: Coordinate) -> Result<RoutedPath> {
            assert_eq!(start, START);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RoutedPath {
                coordinates: PATH.to_vec(),
                duration_s: 1234.5,
                length_m: 1678.9,
            })
        }
    }

    struct FailingRouting;

    #[async_trait]
    impl RoutingService for FailingRouting {
        async fn route(&self, _start: Coordinate, _end: Coordinate) -> Result<RoutedPath> {
            Err(Error::RoutingService { status: 502 })
        }
    }

    /// Elevation 100, 110, 90 at the three path vertices.
    struct KnownPoints;

    impl ElevationSource for KnownPoints {
        fn crs(&self) -> RasterCrs {
            RasterCrs::Geographic
        }

        fn sample(&self, x: f64, y: f64) -> Option<f64> {
            let elevations = [100.0, 110.0, 90.0];
            PATH.iter()
                .position(|p| (p.longitude - x).abs() < 1e-9 && (p.latitude - y).abs() < 1e-9)
                .map(|index| elevations[index])
        }
    }

    struct KnownPointsProvider {
        opened: AtomicUsize,
    }

    #[async_trait]
    impl ElevationProvider for KnownPointsProvider {
        async fn open(&self, _path: &[Coordinate]) -> Result<Box<dyn ElevationSource>> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(KnownPoints))
        }
    }

    fn generator<R: RoutingService>(routing: R) -> RouteSetGenerator<R, KnownPointsProvider> {
        RouteSetGenerator::new(
            routing,
            KnownPointsProvider {
                opened: AtomicUsize::new(0),
            },
            GeneratorConfig::default(),
        )
    }

    #[tokio::test]
    async fn end_to_end_single_route() {
        let generator = generator(FixedRouting {
            calls: AtomicUsize::new(0),
        });
        let request = RouteRequest::new(START, 2.0, 1).with_seed(5);
        let set = generator.generate(&request).await.unwrap();

        assert_eq!(set.routes.len(), 1);
        let route = &set.routes[0];
        assert_eq!(route.number, 1);
        assert_eq!(route.slopes.len(), 2);
        assert!(route.slopes[0] > 0.0);
        assert!(route.slopes[1] < 0.0);
        assert_eq!(route.colors.len(), 2);
        assert_eq!(route.length_m, 1678.9);
        assert_eq!(route.duration_s, 1234.5);
        assert_eq!(route.path, PATH.to_vec());
    }

    #[tokio::test]
    async fn routes_are_generated_sequentially_with_unique_ids() {
        let generator = generator(FixedRouting {
            calls: AtomicUsize::new(0),
        });
        let request = RouteRequest::new(START, 2.0, 3).with_seed(9);
        let set = generator.generate(&request).await.unwrap();

        let numbers: Vec<u32> = set.routes.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_ne!(set.routes[0].id, set.routes[1].id);
        assert_eq!(generator.routing.calls.load(Ordering::SeqCst), 3);
        assert_eq!(generator.elevation.opened.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn seeded_requests_sample_the_same_end_points() {
        let generator = generator(FixedRouting {
            calls: AtomicUsize::new(0),
        });
        let request = RouteRequest::new(START, 2.0, 2).with_seed(77);
        let first = generator.generate(&request).await.unwrap();
        let second = generator.generate(&request).await.unwrap();
        assert_eq!(first.routes[1].end, second.routes[1].end);
        assert_eq!(first.routes[0].slopes, second.routes[0].slopes);
    }

    #[tokio::test]
    async fn routing_failure_propagates() {
        let generator = generator(FailingRouting);
        let err = generator
            .generate(&RouteRequest::new(START, 2.0, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RoutingService { status: 502 }));
    }

    #[tokio::test]
    async fn request_policy_overrides_default() {
        let generator = generator(FixedRouting {
            calls: AtomicUsize::new(0),
        });
        let mut request = RouteRequest::new(START, 2.0, 1).with_seed(1);
        request.color_policy = Some(ColorPolicy::thresholded());
        let set = generator.generate(&request).await.unwrap();
        // The descending segment is always "easy" under the thresholded policy.
        assert_eq!(set.routes[0].colors[1], "#008000");
    }
}
