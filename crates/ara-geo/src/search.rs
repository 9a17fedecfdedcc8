use ara_core::ResolvedLocation;
use ara_storage::HttpFetcher;
use async_trait::async_trait;
use serde::Deserialize;

use crate::{GeoError, KAKAO_KEYWORD_URL};

/// Free-text place lookup. Implementations return the best match only.
#[async_trait]
pub trait PlaceSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Option<ResolvedLocation>, GeoError>;
}

#[derive(Debug, Deserialize)]
struct KeywordResponse {
    #[serde(default)]
    documents: Vec<KeywordDocument>,
}

#[derive(Debug, Deserialize)]
struct KeywordDocument {
    #[serde(default)]
    place_name: String,
    #[serde(default)]
    road_address_name: String,
    #[serde(default)]
    address_name: String,
    x: String,
    y: String,
}

/// Reads the first document of a keyword-search response.
pub fn parse_keyword_response(body: &[u8]) -> Result<Option<ResolvedLocation>, GeoError> {
    let response: KeywordResponse = serde_json::from_slice(body)?;
    let Some(doc) = response.documents.into_iter().next() else {
        return Ok(None);
    };
    let longitude = parse_coordinate(&doc.x)?;
    let latitude = parse_coordinate(&doc.y)?;
    let address = [doc.road_address_name, doc.address_name]
        .into_iter()
        .map(|a| a.trim().to_string())
        .find(|a| !a.is_empty());
    Ok(Some(ResolvedLocation {
        name: doc.place_name,
        address,
        longitude,
        latitude,
    }))
}

fn parse_coordinate(raw: &str) -> Result<f64, GeoError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| GeoError::InvalidCoordinate(raw.to_string()))
}

/// Kakao Local keyword search.
#[derive(Debug, Clone)]
pub struct KakaoLocalSearch {
    http: HttpFetcher,
    api_key: Option<String>,
    endpoint: String,
}

impl KakaoLocalSearch {
    pub fn new(http: HttpFetcher, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: KAKAO_KEYWORD_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl PlaceSearch for KakaoLocalSearch {
    async fn search(&self, query: &str) -> Result<Option<ResolvedLocation>, GeoError> {
        let key = self.api_key.as_deref().ok_or(GeoError::MissingApiKey)?;
        let authorization = format!("KakaoAK {key}");
        let response = self
            .http
            .fetch("kakao_keyword", |client| {
                client
                    .get(&self.endpoint)
                    .header("Authorization", &authorization)
                    .query(&[("query", query)])
            })
            .await?;
        parse_keyword_response(&response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_document_wins_and_road_address_is_preferred() {
        let body = r#"{
            "documents": [
                {"place_name": "광화문", "road_address_name": "서울 종로구 세종로 1-68",
                 "address_name": "서울 종로구 세종로 1", "x": "126.9769", "y": "37.5759"},
                {"place_name": "광화문역", "road_address_name": "", "address_name": "서울 종로구",
                 "x": "126.9768", "y": "37.5710"}
            ],
            "meta": {"total_count": 2}
        }"#.as_bytes();
        let found = parse_keyword_response(body).unwrap().unwrap();
        assert_eq!(found.name, "광화문");
        assert_eq!(found.address.as_deref(), Some("서울 종로구 세종로 1-68"));
        assert!((found.latitude - 37.5759).abs() < 1e-9);
        assert!((found.longitude - 126.9769).abs() < 1e-9);
    }

    #[test]
    fn falls_back_to_lot_address() {
        let body = r#"{"documents":[{"place_name":"시청","road_address_name":"",
            "address_name":"서울 중구 태평로1가","x":"126.97","y":"37.56"}]}"#.as_bytes();
        let found = parse_keyword_response(body).unwrap().unwrap();
        assert_eq!(found.address.as_deref(), Some("서울 중구 태평로1가"));
    }

    #[test]
    fn empty_documents_is_no_match() {
        assert!(parse_keyword_response(r#"{"documents":[]}"#.as_bytes()).unwrap().is_none());
    }

    #[test]
    fn bad_coordinates_are_rejected() {
        let body = r#"{"documents":[{"place_name":"x","x":"east","y":"37.5"}]}"#.as_bytes();
        assert!(matches!(
            parse_keyword_response(body),
            Err(GeoError::InvalidCoordinate(_))
        ));
    }

    #[tokio::test]
    async fn missing_key_fails_without_a_request() {
        let http = HttpFetcher::new(Default::default()).unwrap();
        let search = KakaoLocalSearch::new(http, Some("  ".into()));
        assert!(matches!(
            search.search("광화문").await,
            Err(GeoError::MissingApiKey)
        ));
    }
}
