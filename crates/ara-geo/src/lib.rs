//! Place-name cleanup, geocoding and route-proximity geometry.

mod directions;
mod matcher;
mod normalize;
mod resolver;
mod search;

use ara_storage::FetchError;
use thiserror::Error;

pub use directions::{parse_directions_response, DirectionsService, KakaoDirections};
pub use matcher::{
    haversine_meters, is_near, RouteMatcher, RouteRepresentation, DEFAULT_THRESHOLD_METERS,
    EARTH_RADIUS_METERS,
};
pub use normalize::normalize_place;
pub use resolver::{GeoResolver, GeoResolverConfig, LocatedPlace, LocationOrigin};
pub use search::{parse_keyword_response, KakaoLocalSearch, PlaceSearch};

pub const CRATE_NAME: &str = "ara-geo";

pub const KAKAO_KEYWORD_URL: &str = "https://dapi.kakao.com/v2/local/search/keyword.json";
pub const KAKAO_DIRECTIONS_URL: &str = "https://apis-navi.kakaomobility.com/v1/directions";

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("KAKAO_REST_API_KEY is not configured")]
    MissingApiKey,
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid coordinate {0:?}")]
    InvalidCoordinate(String),
}
