//! Configuration management for the trip planner
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::PlannerError;
use crate::fuel::AutonomyModel;
use crate::models::{Coordinate, VehicleProfile};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Number of weather samples taken along a route
pub const DEFAULT_SAMPLE_COUNT: usize = 6;

/// Precipitation probability (%) at or above which a sample is a hazard
pub const DEFAULT_HAZARD_THRESHOLD_PCT: u8 = 40;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    #[serde(default)]
    pub stations: StationsConfig,
    #[serde(default)]
    pub fuel: FuelConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP surface settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Per-request timeout in seconds
    #[serde(default = "default_server_timeout")]
    pub request_timeout_seconds: u32,
}

/// Routing collaborator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default = "default_routing_base_url")]
    pub base_url: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u32,
}

/// Hourly-weather collaborator and overlay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,
    #[serde(default = "default_hazard_threshold")]
    pub hazard_threshold_pct: u8,
}

/// Reverse-geocoding collaborator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Fuel-station search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationsConfig {
    #[serde(default = "default_stations_base_url")]
    pub base_url: String,
    #[serde(default = "default_stations_timeout")]
    pub timeout_seconds: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_search_radius")]
    pub radius_m: u32,
    #[serde(default = "default_max_stations")]
    pub max_results: usize,
    /// Sort candidates by distance before applying `max_results`
    #[serde(default)]
    pub sort_by_distance: bool,
}

/// Fuel autonomy settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FuelConfig {
    #[serde(default)]
    pub autonomy_model: AutonomyModel,
    /// Vehicle profile the session starts with
    #[serde(default)]
    pub vehicle: VehicleProfile,
}

/// Live-location tracking settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Minimum displacement before a fix-to-fix bearing is trusted
    #[serde(default = "default_min_movement")]
    pub min_movement_m: f64,
    /// Position used when the device cannot provide one
    #[serde(default = "default_fallback_latitude")]
    pub fallback_latitude: f64,
    #[serde(default = "default_fallback_longitude")]
    pub fallback_longitude: f64,
    /// Capacity of the bounded position stream
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

/// Forecast cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Cache TTL in minutes
    #[serde(default = "default_cache_ttl")]
    pub ttl_minutes: u32,
    #[serde(default = "default_cache_location")]
    pub location: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// OTLP/HTTP endpoint for span export; disabled when unset
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

// Default value functions
fn default_server_port() -> u16 {
    8080
}

fn default_server_timeout() -> u32 {
    60
}

fn default_routing_base_url() -> String {
    "https://router.project-osrm.org".to_string()
}

fn default_weather_base_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_geocoding_base_url() -> String {
    "https://photon.komoot.io".to_string()
}

fn default_stations_base_url() -> String {
    "https://overpass-api.de/api".to_string()
}

fn default_http_timeout() -> u32 {
    15
}

fn default_stations_timeout() -> u32 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_sample_count() -> usize {
    DEFAULT_SAMPLE_COUNT
}

fn default_hazard_threshold() -> u8 {
    DEFAULT_HAZARD_THRESHOLD_PCT
}

fn default_search_radius() -> u32 {
    15_000
}

fn default_max_stations() -> usize {
    5
}

fn default_min_movement() -> f64 {
    11.0
}

fn default_fallback_latitude() -> f64 {
    -8.0476
}

fn default_fallback_longitude() -> f64 {
    -34.8770
}

fn default_channel_capacity() -> usize {
    64
}

fn default_cache_ttl() -> u32 {
    30
}

fn default_cache_location() -> String {
    dirs::cache_dir()
        .map(|dir| dir.join("motoweather").to_string_lossy().into_owned())
        .unwrap_or_else(|| ".cache/motoweather".to_string())
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            request_timeout_seconds: default_server_timeout(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_url: default_routing_base_url(),
            timeout_seconds: default_http_timeout(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_base_url(),
            timeout_seconds: default_http_timeout(),
            max_retries: default_max_retries(),
            sample_count: default_sample_count(),
            hazard_threshold_pct: default_hazard_threshold(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_base_url(),
            timeout_seconds: default_http_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for StationsConfig {
    fn default() -> Self {
        Self {
            base_url: default_stations_base_url(),
            timeout_seconds: default_stations_timeout(),
            max_retries: default_max_retries(),
            radius_m: default_search_radius(),
            max_results: default_max_stations(),
            sort_by_distance: false,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            min_movement_m: default_min_movement(),
            fallback_latitude: default_fallback_latitude(),
            fallback_longitude: default_fallback_longitude(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_minutes: default_cache_ttl(),
            location: default_cache_location(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            routing: RoutingConfig::default(),
            weather: WeatherConfig::default(),
            geocoding: GeocodingConfig::default(),
            stations: StationsConfig::default(),
            fuel: FuelConfig::default(),
            tracking: TrackingConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TrackingConfig {
    #[must_use]
    pub fn fallback_position(&self) -> Coordinate {
        Coordinate::new(self.fallback_latitude, self.fallback_longitude)
    }
}

impl PlannerConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(std::env::var_os("MOTOWEATHER_CONFIG").map(PathBuf::from))
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // MOTOWEATHER__WEATHER__HAZARD_THRESHOLD_PCT=30 style overrides
        builder = builder.add_source(
            Environment::with_prefix("MOTOWEATHER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: PlannerConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("motoweather").join("config.toml"))
    }

    /// Apply default values to empty or zeroed configuration fields
    pub fn apply_defaults(&mut self) {
        if self.routing.base_url.is_empty() {
            self.routing.base_url = default_routing_base_url();
        }
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.geocoding.base_url.is_empty() {
            self.geocoding.base_url = default_geocoding_base_url();
        }
        if self.stations.base_url.is_empty() {
            self.stations.base_url = default_stations_base_url();
        }
        if self.weather.sample_count == 0 {
            self.weather.sample_count = default_sample_count();
        }
        if self.stations.radius_m == 0 {
            self.stations.radius_m = default_search_radius();
        }
        if self.stations.max_results == 0 {
            self.stations.max_results = default_max_stations();
        }
        if self.tracking.channel_capacity == 0 {
            self.tracking.channel_capacity = default_channel_capacity();
        }
        if self.cache.ttl_minutes == 0 {
            self.cache.ttl_minutes = default_cache_ttl();
        }
        if self.cache.location.is_empty() {
            self.cache.location = default_cache_location();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.weather.hazard_threshold_pct > 100 {
            return Err(PlannerError::config("Hazard threshold must be between 0 and 100 percent").into());
        }

        if self.weather.sample_count > 50 {
            return Err(PlannerError::config("Weather sample count cannot exceed 50").into());
        }

        for (name, timeout) in [
            ("Routing", self.routing.timeout_seconds),
            ("Weather", self.weather.timeout_seconds),
            ("Geocoding", self.geocoding.timeout_seconds),
            ("Stations", self.stations.timeout_seconds),
        ] {
            if timeout > 300 {
                return Err(PlannerError::config(format!(
                    "{name} API timeout cannot exceed 300 seconds"
                ))
                .into());
            }
        }

        if self.weather.max_retries > 10
            || self.geocoding.max_retries > 10
            || self.stations.max_retries > 10
        {
            return Err(PlannerError::config("Max retries cannot exceed 10").into());
        }

        if self.stations.radius_m > 100_000 {
            return Err(PlannerError::config("Station search radius cannot exceed 100 km").into());
        }

        if self.stations.max_results > 50 {
            return Err(PlannerError::config("Station results cannot exceed 50").into());
        }

        if !self.tracking.min_movement_m.is_finite() || self.tracking.min_movement_m < 0.0 {
            return Err(PlannerError::config("Minimum movement must be a non-negative distance").into());
        }

        if !self.tracking.fallback_position().is_valid() {
            return Err(PlannerError::config("Fallback position is not a valid coordinate").into());
        }

        self.fuel
            .vehicle
            .validate()
            .map_err(|e| PlannerError::config(format!("Invalid vehicle profile: {e}")))?;

        if self.cache.ttl_minutes > 24 * 60 {
            return Err(PlannerError::config("Cache TTL cannot exceed 24 hours").into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(PlannerError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(PlannerError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Routing", &self.routing.base_url),
            ("Weather", &self.weather.base_url),
            ("Geocoding", &self.geocoding.base_url),
            ("Stations", &self.stations.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(PlannerError::config(format!(
                    "{name} API base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PlannerConfig::default();
        assert_eq!(config.routing.base_url, "https://router.project-osrm.org");
        assert_eq!(config.weather.sample_count, DEFAULT_SAMPLE_COUNT);
        assert_eq!(config.weather.hazard_threshold_pct, 40);
        assert_eq!(config.stations.radius_m, 15_000);
        assert_eq!(config.stations.max_results, 5);
        assert!(!config.stations.sort_by_distance);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_vehicle_reserve() {
        let mut config = PlannerConfig::default();
        config.fuel.vehicle.reserve_l = config.fuel.vehicle.tank_capacity_l;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("Invalid vehicle profile"));
    }

    #[test]
    fn test_fallback_position() {
        let position = TrackingConfig::default().fallback_position();
        assert_eq!(position, Coordinate::new(-8.0476, -34.8770));
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = PlannerConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_threshold_range() {
        let mut config = PlannerConfig::default();
        config.weather.hazard_threshold_pct = 120;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Hazard threshold"));
    }

    #[test]
    fn test_config_validation_bad_url() {
        let mut config = PlannerConfig::default();
        config.stations.base_url = "overpass-api.de".to_string();
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("Stations API base URL"));
    }

    #[test]
    fn test_apply_defaults_fills_zeroed_fields() {
        let mut config = PlannerConfig::default();
        config.weather.sample_count = 0;
        config.stations.max_results = 0;
        config.logging.format = String::new();
        config.apply_defaults();
        assert_eq!(config.weather.sample_count, DEFAULT_SAMPLE_COUNT);
        assert_eq!(config.stations.max_results, 5);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_from_missing_path_uses_defaults() {
        let config =
            PlannerConfig::load_from_path(Some(PathBuf::from("/nonexistent/motoweather.toml")))
                .unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = PlannerConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("motoweather"));
            assert!(path.to_string_lossy().contains("config.toml"));
        }
    }
}
