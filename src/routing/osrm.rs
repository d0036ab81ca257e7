//! OSRM routing service client

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{RawRoute, RouteProvider, polyline};
use crate::config::RoutingConfig;
use crate::http;
use crate::models::Coordinate;

/// Client for the OSRM `route/v1/driving` endpoint
pub struct OsrmClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl OsrmClient {
    /// The routing client never retries; re-issuing is the caller's decision
    pub fn new(config: &RoutingConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(config.timeout_seconds, 0)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn route_url(&self, origin: &Coordinate, destination: &Coordinate) -> String {
        // OSRM expects lng,lat pairs
        format!(
            "{}/route/v1/driving/{},{};{},{}?overview=full&geometries=polyline",
            self.base_url,
            origin.longitude,
            origin.latitude,
            destination.longitude,
            destination.latitude
        )
    }
}

#[async_trait]
impl RouteProvider for OsrmClient {
    #[instrument(skip(self), fields(origin = %origin.format_coordinates(), destination = %destination.format_coordinates()))]
    async fn fetch_route(&self, origin: &Coordinate, destination: &Coordinate) -> Result<RawRoute> {
        let url = self.route_url(origin, destination);
        debug!("Calling the routing API: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| "Routing request failed")?
            .error_for_status()
            .with_context(|| "Routing service returned an error status")?;

        let response: ApiResponse = response
            .json()
            .await
            .with_context(|| "Failed to parse routing response")?;

        response.into_raw_route()
    }
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    /// Meters
    distance: f64,
    /// Seconds
    duration: f64,
    geometry: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<RouteResponse>,
}

impl ApiResponse {
    fn into_raw_route(self) -> Result<RawRoute> {
        if self.code != "Ok" {
            return Err(anyhow!(
                "Routing service answered {}: {}",
                self.code,
                self.message.unwrap_or_default()
            ));
        }

        let route = self
            .routes
            .into_iter()
            .next()
            .ok_or(anyhow!("No routes in response"))?;

        Ok(RawRoute {
            path: polyline::decode(&route.geometry)?,
            distance_m: route.distance,
            duration_s: route.duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_url_uses_lng_lat_order() {
        let client = OsrmClient::new(&RoutingConfig::default()).unwrap();
        let url = client.route_url(
            &Coordinate::new(-8.05, -34.88),
            &Coordinate::new(-9.66, -35.73),
        );
        assert_eq!(
            url,
            "https://router.project-osrm.org/route/v1/driving/-34.88,-8.05;-35.73,-9.66?overview=full&geometries=polyline"
        );
    }

    #[test]
    fn test_parse_ok_response() {
        let body = r#"{
            "code": "Ok",
            "routes": [
                {"distance": 500000.0, "duration": 18000.0, "geometry": "_p~iF~ps|U_ulLnnqC_mqNvxq`@", "legs": []}
            ],
            "waypoints": []
        }"#;
        let response: ApiResponse = serde_json::from_str(body).unwrap();
        let raw = response.into_raw_route().unwrap();
        assert_eq!(raw.path.len(), 3);
        assert_eq!(raw.distance_m, 500_000.0);
        assert_eq!(raw.duration_s, 18_000.0);
    }

    #[test]
    fn test_parse_no_route() {
        let body = r#"{"code": "NoRoute", "message": "Impossible route between points"}"#;
        let response: ApiResponse = serde_json::from_str(body).unwrap();
        let err = response.into_raw_route().unwrap_err();
        assert!(err.to_string().contains("NoRoute"));
    }

    #[test]
    fn test_parse_empty_routes() {
        let body = r#"{"code": "Ok", "routes": []}"#;
        let response: ApiResponse = serde_json::from_str(body).unwrap();
        assert!(response.into_raw_route().is_err());
    }
}
