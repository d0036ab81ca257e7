//! Weather overlay along a route
//!
//! Samples the route at evenly spaced points, fetches the hourly forecast for
//! each point concurrently and keeps the entry for the current local hour.
//! Points whose precipitation probability meets the hazard threshold are
//! reverse-geocoded so the rider sees a place name in the rain alert.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeDelta, Timelike, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::cache::{self, PersistentCache};
use crate::error::PlannerError;
use crate::geocoding::ReverseGeocoder;
use crate::models::{Coordinate, WeatherCondition, WeatherSample};
use crate::routing::sampler;

pub mod alert;
pub mod open_meteo;

pub use open_meteo::OpenMeteoClient;

/// One hour of forecast, timestamped in the forecast location's local time
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HourlyEntry {
    pub local_time: NaiveDateTime,
    pub temperature_c: Option<f32>,
    pub precipitation_probability_pct: Option<u8>,
    /// WMO weather code
    pub weather_code: Option<u8>,
}

/// Hourly forecast for a single coordinate
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HourlyForecast {
    /// Offset of the location's local time from UTC
    pub utc_offset_seconds: i32,
    pub hours: Vec<HourlyEntry>,
}

impl HourlyForecast {
    /// The entry covering `now`, expressed in the location's local time
    #[must_use]
    pub fn entry_at(&self, now: DateTime<Utc>) -> Option<&HourlyEntry> {
        let local = now.naive_utc() + TimeDelta::try_seconds(i64::from(self.utc_offset_seconds))?;
        let hour = local.date().and_hms_opt(local.hour(), 0, 0)?;
        self.hours.iter().find(|entry| entry.local_time == hour)
    }
}

/// Source of hourly forecasts
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    async fn hourly_forecast(&self, coord: &Coordinate) -> Result<HourlyForecast>;
}

/// Forecast provider that keeps responses in the persistent cache, keyed by
/// rounded coordinate and UTC hour
pub struct CachingForecastProvider {
    inner: Arc<dyn ForecastProvider>,
    cache: PersistentCache,
    ttl: Duration,
}

impl CachingForecastProvider {
    pub fn new(inner: Arc<dyn ForecastProvider>, cache: PersistentCache, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    fn cache_key(coord: &Coordinate, now: DateTime<Utc>) -> String {
        let (lat, lon) = coord.rounded(2);
        format!("forecast:{lat:.2}:{lon:.2}:{}", now.format("%Y-%m-%dT%H"))
    }

    /// Cached forecast for the UTC hour containing `now`
    pub async fn forecast_at(
        &self,
        coord: &Coordinate,
        now: DateTime<Utc>,
    ) -> Result<HourlyForecast> {
        let key = Self::cache_key(coord, now);

        match self.cache.get::<HourlyForecast>(&key).await {
            Ok(Some(forecast)) => return Ok(forecast),
            Ok(None) => {}
            Err(e) => warn!("Forecast cache read failed for {}: {:#}", key, e),
        }

        let forecast = self.inner.hourly_forecast(coord).await?;
        if let Err(e) = self
            .cache
            .put(&key, forecast.clone(), cache::jittered(self.ttl))
            .await
        {
            warn!("Forecast cache write failed for {}: {:#}", key, e);
        }
        Ok(forecast)
    }
}

#[async_trait]
impl ForecastProvider for CachingForecastProvider {
    async fn hourly_forecast(&self, coord: &Coordinate) -> Result<HourlyForecast> {
        self.forecast_at(coord, Utc::now()).await
    }
}

/// Builds the weather overlay for a route
pub struct WeatherOverlayService {
    forecasts: Arc<dyn ForecastProvider>,
    geocoder: Arc<dyn ReverseGeocoder>,
    hazard_threshold_pct: u8,
    sample_count: usize,
}

impl WeatherOverlayService {
    pub fn new(
        forecasts: Arc<dyn ForecastProvider>,
        geocoder: Arc<dyn ReverseGeocoder>,
        hazard_threshold_pct: u8,
        sample_count: usize,
    ) -> Self {
        Self {
            forecasts,
            geocoder,
            hazard_threshold_pct,
            sample_count,
        }
    }

    /// Sample the route and fetch weather for every sample concurrently.
    ///
    /// Samples whose forecast could not be fetched are dropped; the rest keep
    /// their `sample_index` so route order survives the gaps.
    #[instrument(skip(self, path), fields(points = path.len(), samples = self.sample_count))]
    pub async fn sample_route(&self, path: &[Coordinate], now: DateTime<Utc>) -> Vec<WeatherSample> {
        let coords = sampler::sample_path(path, self.sample_count);
        let requested = coords.len();

        let samples: Vec<WeatherSample> = join_all(
            coords
                .into_iter()
                .enumerate()
                .map(|(index, coord)| self.sample_point(index, coord, now)),
        )
        .await
        .into_iter()
        .flatten()
        .collect();

        if samples.len() < requested {
            let degraded = PlannerError::enrichment_degraded(format!(
                "{} of {} weather samples unavailable",
                requested - samples.len(),
                requested
            ));
            warn!("{}", degraded);
        }
        info!(
            "Weather overlay ready: {} samples, {} hazards",
            samples.len(),
            samples.iter().filter(|s| s.is_hazard).count()
        );
        samples
    }

    /// Weather for a single point, `None` when the forecast is unavailable
    pub async fn sample_point(
        &self,
        sample_index: usize,
        coord: Coordinate,
        now: DateTime<Utc>,
    ) -> Option<WeatherSample> {
        match self.try_sample_point(sample_index, coord, now).await {
            Ok(sample) => Some(sample),
            Err(e) => {
                warn!(
                    "Weather sample {} at {} failed: {:#}",
                    sample_index,
                    coord.format_coordinates(),
                    e
                );
                None
            }
        }
    }

    async fn try_sample_point(
        &self,
        sample_index: usize,
        coord: Coordinate,
        now: DateTime<Utc>,
    ) -> Result<WeatherSample> {
        let forecast = self.forecasts.hourly_forecast(&coord).await?;
        let entry = forecast
            .entry_at(now)
            .ok_or(anyhow!("Forecast has no entry for the current hour"))?;

        let temperature_c = entry
            .temperature_c
            .ok_or(anyhow!("Forecast has no temperature for the current hour"))?;
        let probability = entry
            .precipitation_probability_pct
            .ok_or(anyhow!("Forecast has no precipitation probability for the current hour"))?
            .min(100);

        let is_hazard = probability >= self.hazard_threshold_pct;
        let location_name = if is_hazard {
            self.location_name(&coord).await
        } else {
            None
        };

        let sample = WeatherSample {
            sample_index,
            coord,
            temperature_c,
            precipitation_probability_pct: probability,
            condition: entry
                .weather_code
                .map(WeatherCondition::from_wmo_code)
                .unwrap_or_default(),
            is_hazard,
            location_name,
        };
        debug!(
            "Sample {}: {} {}, {}% precipitation",
            sample_index,
            sample.condition.description(),
            sample.format_temperature(),
            probability
        );
        Ok(sample)
    }

    async fn location_name(&self, coord: &Coordinate) -> Option<String> {
        match self.geocoder.reverse(coord).await {
            Ok(name) => name,
            Err(e) => {
                debug!(
                    "Reverse geocoding failed for {}, leaving hazard unnamed: {:#}",
                    coord.format_coordinates(),
                    e
                );
                None
            }
        }
    }
}
