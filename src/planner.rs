//! Trip planning pipeline
//!
//! Composes route resolution, the weather overlay, the rain alert and the
//! fuel plan into one [`PlannedTrip`]. The station lookup is a separate step
//! so callers can publish the preview before it completes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::cache::PersistentCache;
use crate::config::PlannerConfig;
use crate::error::PlannerError;
use crate::fuel::{FuelAutonomyPlanner, FuelPlan, OverpassClient, StationLocator};
use crate::geocoding::PhotonClient;
use crate::models::{Coordinate, FuelStation, RainAlert, Route, VehicleProfile, WeatherSample};
use crate::routing::{OsrmClient, RouteResolver};
use crate::weather::{
    CachingForecastProvider, ForecastProvider, OpenMeteoClient, WeatherOverlayService, alert,
};

/// Everything derived from one successful route resolution. Route, weather
/// and fuel data are always replaced together.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlannedTrip {
    pub route: Route,
    pub samples: Vec<WeatherSample>,
    pub rain_alert: Option<RainAlert>,
    pub fuel_plan: FuelPlan,
}

pub struct TripPlanner {
    resolver: RouteResolver,
    weather: WeatherOverlayService,
    fuel: FuelAutonomyPlanner,
    stations: StationLocator,
}

impl TripPlanner {
    pub fn new(
        resolver: RouteResolver,
        weather: WeatherOverlayService,
        fuel: FuelAutonomyPlanner,
        stations: StationLocator,
    ) -> Self {
        Self {
            resolver,
            weather,
            fuel,
            stations,
        }
    }

    /// Wire the HTTP collaborators described by the configuration
    pub fn from_config(config: &PlannerConfig) -> Result<Self> {
        let open_meteo: Arc<dyn ForecastProvider> = Arc::new(OpenMeteoClient::new(&config.weather)?);
        let forecasts: Arc<dyn ForecastProvider> = if config.cache.enabled {
            let path = PathBuf::from(&config.cache.location);
            let cache = PersistentCache::open(&path).map_err(|e| {
                PlannerError::cache(format!(
                    "Failed to open cache at {}: {e:#}",
                    path.display()
                ))
            })?;
            info!("Forecast cache enabled at {}", path.display());
            Arc::new(CachingForecastProvider::new(
                open_meteo,
                cache,
                Duration::from_secs(u64::from(config.cache.ttl_minutes) * 60),
            ))
        } else {
            open_meteo
        };

        let weather = WeatherOverlayService::new(
            forecasts,
            Arc::new(PhotonClient::new(&config.geocoding)?),
            config.weather.hazard_threshold_pct,
            config.weather.sample_count,
        );

        Ok(Self::new(
            RouteResolver::new(Arc::new(OsrmClient::new(&config.routing)?)),
            weather,
            FuelAutonomyPlanner::new(config.fuel.autonomy_model),
            StationLocator::new(Arc::new(OverpassClient::new(&config.stations)?), &config.stations),
        ))
    }

    /// Resolve the route and derive weather and fuel data for the current hour
    pub async fn plan(
        &self,
        origin: &Coordinate,
        destination: &Coordinate,
        vehicle: &VehicleProfile,
    ) -> Result<PlannedTrip, PlannerError> {
        self.plan_at(origin, destination, vehicle, Utc::now()).await
    }

    #[instrument(skip(self, vehicle), fields(origin = %origin.format_coordinates(), destination = %destination.format_coordinates()))]
    pub async fn plan_at(
        &self,
        origin: &Coordinate,
        destination: &Coordinate,
        vehicle: &VehicleProfile,
        now: DateTime<Utc>,
    ) -> Result<PlannedTrip, PlannerError> {
        vehicle.validate()?;

        let route = self.resolver.resolve(origin, destination).await?;
        let samples = self.weather.sample_route(&route.path, now).await;
        let rain_alert = alert::classify(&samples);
        let fuel_plan = self.fuel.plan(&route, vehicle)?;

        if let Some(alert) = &rain_alert {
            info!(
                "Rain alert: {}% near {}",
                alert.probability_pct,
                alert
                    .location_name
                    .clone()
                    .unwrap_or_else(|| alert.coord.format_coordinates())
            );
        }

        Ok(PlannedTrip {
            route,
            samples,
            rain_alert,
            fuel_plan,
        })
    }

    /// Stations around the fuel plan's search target, empty when no fuel stop
    /// is needed
    pub async fn find_stations(&self, fuel_plan: &FuelPlan) -> Vec<FuelStation> {
        match fuel_plan.search_target {
            Some(target) if fuel_plan.needs_fuel => self.stations.locate(&target).await,
            _ => Vec::new(),
        }
    }
}
