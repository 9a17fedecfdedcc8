use ara_core::{RoutePolyline, UserRoute};
use ara_storage::HttpFetcher;
use async_trait::async_trait;
use serde::Deserialize;

use crate::{GeoError, KAKAO_DIRECTIONS_URL};

/// Driving-path provider.
#[async_trait]
pub trait DirectionsService: Send + Sync {
    /// Returns an empty polyline when the provider finds no path.
    async fn route(&self, route: &UserRoute) -> Result<RoutePolyline, GeoError>;
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    #[serde(default)]
    sections: Vec<Section>,
}

#[derive(Debug, Deserialize)]
struct Section {
    #[serde(default)]
    roads: Vec<Road>,
}

#[derive(Debug, Deserialize)]
struct Road {
    #[serde(default)]
    vertexes: Vec<f64>,
}

/// Concatenates every road's flattened `[lon, lat, ...]` vertices of the
/// first route.
pub fn parse_directions_response(body: &[u8]) -> Result<RoutePolyline, GeoError> {
    let response: DirectionsResponse = serde_json::from_slice(body)?;
    let mut polyline = RoutePolyline::default();
    if let Some(first) = response.routes.first() {
        for road in first.sections.iter().flat_map(|s| &s.roads) {
            polyline.extend_flat_lon_lat(&road.vertexes);
        }
    }
    Ok(polyline)
}

/// Kakao Mobility car directions.
#[derive(Debug, Clone)]
pub struct KakaoDirections {
    http: HttpFetcher,
    api_key: Option<String>,
    endpoint: String,
}

impl KakaoDirections {
    pub fn new(http: HttpFetcher, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: KAKAO_DIRECTIONS_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl DirectionsService for KakaoDirections {
    async fn route(&self, route: &UserRoute) -> Result<RoutePolyline, GeoError> {
        let key = self.api_key.as_deref().ok_or(GeoError::MissingApiKey)?;
        let authorization = format!("KakaoAK {key}");
        let origin = format!("{},{}", route.departure.lon, route.departure.lat);
        let destination = format!("{},{}", route.arrival.lon, route.arrival.lat);
        let response = self
            .http
            .fetch("kakao_directions", |client| {
                client
                    .get(&self.endpoint)
                    .header("Authorization", &authorization)
                    .query(&[
                        ("origin", origin.as_str()),
                        ("destination", destination.as_str()),
                        ("priority", "RECOMMEND"),
                    ])
            })
            .await?;
        parse_directions_response(&response.body)
    }
}

#[cfg(test)]
mod tests {
    use ara_core::GeoPoint;

    use super::*;

    #[test]
    fn vertices_from_all_sections_are_joined_in_order() {
        let body = br#"{
            "trans_id": "t",
            "routes": [{
                "result_code": 0,
                "sections": [
                    {"roads": [{"vertexes": [126.97, 37.57, 126.98, 37.566]},
                               {"vertexes": [126.99, 37.56]}]},
                    {"roads": [{"vertexes": [127.0, 37.55]}]}
                ]
            }]
        }"#;
        let poly = parse_directions_response(body).unwrap();
        assert_eq!(
            poly.vertices,
            vec![
                GeoPoint::new(37.57, 126.97),
                GeoPoint::new(37.566, 126.98),
                GeoPoint::new(37.56, 126.99),
                GeoPoint::new(37.55, 127.0),
            ]
        );
    }

    #[test]
    fn no_path_gives_empty_polyline() {
        let body = br#"{"routes":[{"result_code":104,"result_msg":"too close"}]}"#;
        assert!(parse_directions_response(body).unwrap().is_empty());
        assert!(parse_directions_response(br#"{}"#).unwrap().is_empty());
    }
}
