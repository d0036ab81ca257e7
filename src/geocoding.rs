//! Reverse geocoding of hazard coordinates into human-readable place names

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::GeocodingConfig;
use crate::http;
use crate::models::Coordinate;

/// Turns a coordinate into the name of the nearest settlement
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// `Ok(None)` when the service knows no name for the coordinate
    async fn reverse(&self, coord: &Coordinate) -> Result<Option<String>>;
}

/// Client for the Photon reverse-geocoding endpoint
pub struct PhotonClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl PhotonClient {
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(config.timeout_seconds, config.max_retries)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ReverseGeocoder for PhotonClient {
    #[instrument(skip(self), fields(coord = %coord.format_coordinates()))]
    async fn reverse(&self, coord: &Coordinate) -> Result<Option<String>> {
        let url = format!(
            "{}/reverse?lon={}&lat={}",
            self.base_url, coord.longitude, coord.latitude
        );
        debug!("Calling the reverse geocoding API: {}", url);

        let response: PhotonResponse = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| "Reverse geocoding request failed")?
            .error_for_status()
            .with_context(|| "Reverse geocoding service returned an error status")?
            .json()
            .await
            .with_context(|| "Failed to parse reverse geocoding response")?;

        Ok(response.place_name())
    }
}

#[derive(Debug, Default, Deserialize)]
struct PhotonProperties {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PhotonFeature {
    #[serde(default)]
    properties: PhotonProperties,
}

#[derive(Debug, Deserialize)]
struct PhotonResponse {
    #[serde(default)]
    features: Vec<PhotonFeature>,
}

impl PhotonResponse {
    /// First feature's city, then town, then village, then generic name
    fn place_name(self) -> Option<String> {
        let properties = self.features.into_iter().next()?.properties;
        [
            properties.city,
            properties.town,
            properties.village,
            properties.name,
        ]
        .into_iter()
        .flatten()
        .find(|name| !name.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Option<String> {
        serde_json::from_str::<PhotonResponse>(body)
            .unwrap()
            .place_name()
    }

    #[test]
    fn test_prefers_city() {
        let body = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"name": "Rua da Aurora", "city": "Recife", "village": "Boa Vista"}}
        ]}"#;
        assert_eq!(parse(body).as_deref(), Some("Recife"));
    }

    #[test]
    fn test_falls_back_through_town_village_name() {
        let town = r#"{"features": [{"properties": {"town": "Caruaru", "name": "Centro"}}]}"#;
        assert_eq!(parse(town).as_deref(), Some("Caruaru"));

        let village = r#"{"features": [{"properties": {"village": "Pipa", "name": "Praia"}}]}"#;
        assert_eq!(parse(village).as_deref(), Some("Pipa"));

        let name = r#"{"features": [{"properties": {"name": "BR-232"}}]}"#;
        assert_eq!(parse(name).as_deref(), Some("BR-232"));
    }

    #[test]
    fn test_no_features_is_none() {
        assert_eq!(parse(r#"{"features": []}"#), None);
        assert_eq!(parse(r#"{"features": [{"properties": {}}]}"#), None);
    }
}
