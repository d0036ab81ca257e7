//! Overpass API client for fuel station lookups

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::StationProvider;
use crate::config::StationsConfig;
use crate::http;
use crate::models::{Coordinate, FuelStation};

pub struct OverpassClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl OverpassClient {
    pub fn new(config: &StationsConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(config.timeout_seconds, config.max_retries)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn query(target: &Coordinate, radius_m: u32) -> String {
        format!(
            r#"[out:json];node["amenity"="fuel"](around:{radius_m},{},{});out body;"#,
            target.latitude, target.longitude
        )
    }
}

#[async_trait]
impl StationProvider for OverpassClient {
    #[instrument(skip(self), fields(target = %target.format_coordinates()))]
    async fn stations_near(&self, target: &Coordinate, radius_m: u32) -> Result<Vec<FuelStation>> {
        let url = format!(
            "{}/interpreter?data={}",
            self.base_url,
            urlencoding::encode(&Self::query(target, radius_m))
        );
        debug!("Calling the Overpass API: {}", url);

        let response: OverpassResponse = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| "Overpass request failed")?
            .error_for_status()
            .with_context(|| "Overpass returned an error status")?
            .json()
            .await
            .with_context(|| "Failed to parse Overpass response")?;

        Ok(response.into_stations(target))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ElementTags {
    name: Option<String>,
    brand: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(rename = "type")]
    kind: String,
    id: u64,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    tags: ElementTags,
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
}

impl OverpassResponse {
    /// Nodes with a position, in response order
    fn into_stations(self, target: &Coordinate) -> Vec<FuelStation> {
        self.elements
            .into_iter()
            .filter(|element| element.kind == "node")
            .filter_map(|element| {
                let coord = Coordinate::new(element.lat?, element.lon?);
                Some(FuelStation {
                    id: element.id,
                    coord,
                    name: element.tags.name.or(element.tags.brand),
                    distance_km: target.distance_km(&coord),
                })
            })
            .collect()
    }
}
