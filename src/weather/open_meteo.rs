//! Open-Meteo hourly forecast client

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{ForecastProvider, HourlyEntry, HourlyForecast};
use crate::config::WeatherConfig;
use crate::http;
use crate::models::Coordinate;

const HOURLY_FIELDS: &str = "temperature_2m,precipitation_probability,weather_code";
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

pub struct OpenMeteoClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(config.timeout_seconds, config.max_retries)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ForecastProvider for OpenMeteoClient {
    #[instrument(skip(self), fields(coord = %coord.format_coordinates()))]
    async fn hourly_forecast(&self, coord: &Coordinate) -> Result<HourlyForecast> {
        let url = format!(
            "{}/forecast?latitude={}&longitude={}&hourly={}&timezone=auto&forecast_days=1",
            self.base_url,
            coord.latitude,
            coord.longitude,
            urlencoding::encode(HOURLY_FIELDS)
        );
        debug!("Calling the forecast API: {}", url);

        let response: ForecastResponse = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| "Forecast request failed")?
            .error_for_status()
            .with_context(|| "Forecast service returned an error status")?
            .json()
            .await
            .with_context(|| "Failed to parse Open-Meteo forecast response")?;

        response.try_into()
    }
}

/// Forecast response from `OpenMeteo`
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    utc_offset_seconds: i32,
    hourly: Option<HourlyData>,
}

/// Hourly columns, one value per entry in `time`
#[derive(Debug, Deserialize)]
struct HourlyData {
    time: Vec<String>,
    #[serde(rename = "temperature_2m", default)]
    temperature: Vec<Option<f32>>,
    #[serde(default)]
    precipitation_probability: Vec<Option<u8>>,
    #[serde(default)]
    weather_code: Vec<Option<u8>>,
}

impl TryFrom<ForecastResponse> for HourlyForecast {
    type Error = anyhow::Error;

    fn try_from(response: ForecastResponse) -> Result<Self> {
        let hourly = response
            .hourly
            .ok_or(anyhow!("Forecast response has no hourly data"))?;

        let hours = hourly
            .time
            .iter()
            .enumerate()
            .map(|(i, time)| {
                let local_time = NaiveDateTime::parse_from_str(time, TIME_FORMAT)
                    .with_context(|| format!("Invalid forecast timestamp {time:?}"))?;
                Ok(HourlyEntry {
                    local_time,
                    temperature_c: hourly.temperature.get(i).copied().flatten(),
                    precipitation_probability_pct: hourly
                        .precipitation_probability
                        .get(i)
                        .copied()
                        .flatten(),
                    weather_code: hourly.weather_code.get(i).copied().flatten(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(HourlyForecast {
            utc_offset_seconds: response.utc_offset_seconds,
            hours,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    const BODY: &str = r#"{
        "latitude": -8.05,
        "longitude": -34.875,
        "utc_offset_seconds": -10800,
        "timezone": "America/Recife",
        "hourly_units": {"time": "iso8601", "temperature_2m": "°C", "precipitation_probability": "%"},
        "hourly": {
            "time": ["2026-10-19T00:00", "2026-10-19T01:00", "2026-10-19T02:00"],
            "temperature_2m": [24.1, 23.8, null],
            "precipitation_probability": [10, 55, 70],
            "weather_code": [1, 61, 63]
        }
    }"#;

    #[test]
    fn test_parse_forecast() {
        let response: ForecastResponse = serde_json::from_str(BODY).unwrap();
        let forecast = HourlyForecast::try_from(response).unwrap();

        assert_eq!(forecast.utc_offset_seconds, -10800);
        assert_eq!(forecast.hours.len(), 3);
        assert_eq!(
            forecast.hours[1].local_time,
            NaiveDate::from_ymd_opt(2026, 10, 19)
                .unwrap()
                .and_hms_opt(1, 0, 0)
                .unwrap()
        );
        assert_eq!(forecast.hours[1].precipitation_probability_pct, Some(55));
        assert_eq!(forecast.hours[2].temperature_c, None);
    }

    #[test]
    fn test_entry_selected_by_local_hour() {
        let response: ForecastResponse = serde_json::from_str(BODY).unwrap();
        let forecast = HourlyForecast::try_from(response).unwrap();

        // 04:30 UTC is 01:30 in Recife
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 4, 30, 0).unwrap();
        let entry = forecast.entry_at(now).unwrap();
        assert_eq!(entry.weather_code, Some(61));
    }

    #[test]
    fn test_missing_hourly_block() {
        let response: ForecastResponse =
            serde_json::from_str(r#"{"utc_offset_seconds": 0}"#).unwrap();
        assert!(HourlyForecast::try_from(response).is_err());
    }

    #[test]
    fn test_invalid_timestamp() {
        let body = r#"{"hourly": {"time": ["yesterday"], "temperature_2m": [20.0]}}"#;
        let response: ForecastResponse = serde_json::from_str(body).unwrap();
        assert!(HourlyForecast::try_from(response).is_err());
    }
}
