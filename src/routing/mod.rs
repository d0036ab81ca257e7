//! Route resolution
//!
//! Turns an origin/destination pair into a [`Route`] by calling the routing
//! collaborator, decoding its compact path encoding and converting units.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::error::PlannerError;
use crate::models::{Coordinate, Path, Route};

pub mod osrm;
pub mod polyline;
pub mod sampler;

pub use osrm::OsrmClient;

/// Route as returned by the routing collaborator, in its native units
#[derive(Debug, Clone, PartialEq)]
pub struct RawRoute {
    pub path: Path,
    pub distance_m: f64,
    pub duration_s: f64,
}

/// A routing collaborator able to compute a driving route
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn fetch_route(&self, origin: &Coordinate, destination: &Coordinate) -> Result<RawRoute>;
}

/// Resolves origin/destination pairs into routes
pub struct RouteResolver {
    provider: Arc<dyn RouteProvider>,
}

impl RouteResolver {
    pub fn new(provider: Arc<dyn RouteProvider>) -> Self {
        Self { provider }
    }

    /// Resolve a driving route. Any collaborator failure, or a response
    /// without a usable path, is reported as `RouteUnavailable`.
    #[instrument(skip(self), fields(origin = %origin.format_coordinates(), destination = %destination.format_coordinates()))]
    pub async fn resolve(
        &self,
        origin: &Coordinate,
        destination: &Coordinate,
    ) -> Result<Route, PlannerError> {
        if !origin.is_valid() || !destination.is_valid() {
            return Err(PlannerError::input_invalid(
                "Origin and destination must be valid coordinates",
            ));
        }

        let raw = self.provider.fetch_route(origin, destination).await.map_err(|e| {
            warn!("Routing failed: {:#}", e);
            PlannerError::route_unavailable(e.to_string())
        })?;

        if raw.path.is_empty() || !raw.distance_m.is_finite() || !raw.duration_s.is_finite() {
            return Err(PlannerError::route_unavailable(
                "Routing service returned an empty route",
            ));
        }
        // A single-point geometry only makes sense for a zero-length trip
        if raw.path.len() < 2 && raw.distance_m > 0.0 {
            return Err(PlannerError::route_unavailable(
                "Routing service returned a degenerate path",
            ));
        }

        let route = Route::from_meters_seconds(raw.path, raw.distance_m, raw.duration_s);
        info!(
            "Resolved route: {} in {} ({} path points)",
            route.format_distance(),
            route.format_duration(),
            route.path.len()
        );
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct FixedProvider(Option<RawRoute>);

    #[async_trait]
    impl RouteProvider for FixedProvider {
        async fn fetch_route(&self, _: &Coordinate, _: &Coordinate) -> Result<RawRoute> {
            self.0.clone().ok_or(anyhow!("connection refused"))
        }
    }

    fn origin() -> Coordinate {
        Coordinate::new(-8.05, -34.88)
    }

    fn destination() -> Coordinate {
        Coordinate::new(-9.66, -35.73)
    }

    #[tokio::test]
    async fn test_resolve_converts_units() {
        let resolver = RouteResolver::new(Arc::new(FixedProvider(Some(RawRoute {
            path: vec![origin(), destination()],
            distance_m: 250_000.0,
            duration_s: 10_800.0,
        }))));

        let route = resolver.resolve(&origin(), &destination()).await.unwrap();
        assert_eq!(route.distance_km, 250.0);
        assert_eq!(route.duration_min, 180.0);
        assert_eq!(route.path.len(), 2);
    }

    #[tokio::test]
    async fn test_network_failure_is_route_unavailable() {
        let resolver = RouteResolver::new(Arc::new(FixedProvider(None)));
        let err = resolver.resolve(&origin(), &destination()).await.unwrap_err();
        assert!(matches!(err, PlannerError::RouteUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_empty_path_is_route_unavailable() {
        let resolver = RouteResolver::new(Arc::new(FixedProvider(Some(RawRoute {
            path: vec![],
            distance_m: 1000.0,
            duration_s: 60.0,
        }))));
        let err = resolver.resolve(&origin(), &destination()).await.unwrap_err();
        assert!(matches!(err, PlannerError::RouteUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_invalid_coordinates_rejected_before_call() {
        let resolver = RouteResolver::new(Arc::new(FixedProvider(None)));
        let err = resolver
            .resolve(&Coordinate::new(f64::NAN, 0.0), &destination())
            .await
            .unwrap_err();
        assert!(matches!(err, PlannerError::InputInvalid { .. }));
    }
}
