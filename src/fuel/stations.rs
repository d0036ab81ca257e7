//! Fuel station lookup around the refuel search target

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::config::StationsConfig;
use crate::error::PlannerError;
use crate::models::{Coordinate, FuelStation};

/// Source of fuel stations near a coordinate
#[async_trait]
pub trait StationProvider: Send + Sync {
    /// Stations within `radius_m` of `target`, in the collaborator's order
    async fn stations_near(&self, target: &Coordinate, radius_m: u32) -> Result<Vec<FuelStation>>;
}

pub struct StationLocator {
    provider: Arc<dyn StationProvider>,
    radius_m: u32,
    max_results: usize,
    sort_by_distance: bool,
}

impl StationLocator {
    pub fn new(provider: Arc<dyn StationProvider>, config: &StationsConfig) -> Self {
        Self {
            provider,
            radius_m: config.radius_m,
            max_results: config.max_results,
            sort_by_distance: config.sort_by_distance,
        }
    }

    /// At most `max_results` stations near the target. Lookup failures are
    /// logged and yield an empty list.
    #[instrument(skip(self), fields(target = %target.format_coordinates(), radius_m = self.radius_m))]
    pub async fn locate(&self, target: &Coordinate) -> Vec<FuelStation> {
        let mut stations = match self.provider.stations_near(target, self.radius_m).await {
            Ok(stations) => stations,
            Err(e) => {
                let degraded =
                    PlannerError::enrichment_degraded(format!("Station lookup failed: {e:#}"));
                warn!("{}", degraded);
                return Vec::new();
            }
        };

        if self.sort_by_distance {
            stations.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        }
        stations.truncate(self.max_results);

        info!("Found {} fuel stations", stations.len());
        stations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct FixedStations(Option<Vec<FuelStation>>);

    #[async_trait]
    impl StationProvider for FixedStations {
        async fn stations_near(&self, _: &Coordinate, _: u32) -> Result<Vec<FuelStation>> {
            self.0.clone().ok_or(anyhow!("overpass timeout"))
        }
    }

    fn station(id: u64, distance_km: f64) -> FuelStation {
        FuelStation {
            id,
            coord: Coordinate::new(-8.0, -35.0),
            name: None,
            distance_km,
        }
    }

    fn locator(stations: Option<Vec<FuelStation>>, sort_by_distance: bool) -> StationLocator {
        let config = StationsConfig {
            sort_by_distance,
            ..StationsConfig::default()
        };
        StationLocator::new(Arc::new(FixedStations(stations)), &config)
    }

    fn many() -> Vec<FuelStation> {
        (1..=8).map(|id| station(id, 10.0 - id as f64)).collect()
    }

    #[tokio::test]
    async fn test_truncates_in_collaborator_order() {
        let found = locator(Some(many()), false)
            .locate(&Coordinate::new(-8.0, -35.0))
            .await;
        let ids: Vec<u64> = found.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_sorts_before_truncating() {
        let found = locator(Some(many()), true)
            .locate(&Coordinate::new(-8.0, -35.0))
            .await;
        let ids: Vec<u64> = found.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![8, 7, 6, 5, 4]);
    }

    #[tokio::test]
    async fn test_failure_yields_empty_list() {
        let found = locator(None, false)
            .locate(&Coordinate::new(-8.0, -35.0))
            .await;
        assert!(found.is_empty());
    }
}
