use std::sync::Arc;
use std::time::Duration;

use ara_core::GeoPoint;
use tracing::{debug, warn};

use crate::normalize::normalize_place;
use crate::search::PlaceSearch;

#[derive(Debug, Clone)]
pub struct GeoResolverConfig {
    /// City name prefixed to queries and required near the start of addresses.
    pub home_city: String,
    /// How many leading address characters must contain `home_city`.
    pub address_prefix_chars: usize,
    pub candidate_delay: Duration,
    /// Returned when nothing resolves.
    pub fallback: GeoPoint,
}

impl Default for GeoResolverConfig {
    fn default() -> Self {
        Self {
            home_city: "서울".to_string(),
            address_prefix_chars: 5,
            candidate_delay: Duration::from_millis(50),
            fallback: GeoPoint::new(37.5709, 126.9769),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationOrigin {
    Embedded,
    Geocoded,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocatedPlace {
    pub point: GeoPoint,
    pub origin: LocationOrigin,
}

/// Turns a free-text place into coordinates by trying a short list of
/// candidate queries against a [`PlaceSearch`] backend.
#[derive(Clone)]
pub struct GeoResolver {
    search: Arc<dyn PlaceSearch>,
    config: GeoResolverConfig,
}

impl GeoResolver {
    pub fn new(search: Arc<dyn PlaceSearch>, config: GeoResolverConfig) -> Self {
        Self { search, config }
    }

    pub fn config(&self) -> &GeoResolverConfig {
        &self.config
    }

    /// Queries tried, in order, for an already-normalized place.
    pub fn candidate_queries(&self, normalized: &str) -> Vec<String> {
        let city = self.config.home_city.as_str();
        let place = normalized.trim();
        let mut raw = vec![format!("{city} {place}"), place.to_string()];

        let tokens: Vec<&str> = place.split_whitespace().collect();
        if tokens.len() > 1 {
            if let Some(last) = tokens.last() {
                raw.push(format!("{city} {last}"));
            }
            raw.push(format!("{city} {}", tokens[0]));
        }
        if !place.ends_with('역') && place.chars().count() <= 5 {
            raw.push(format!("{city} {place}역"));
        }

        let mut out: Vec<String> = Vec::with_capacity(raw.len());
        for query in raw {
            let query = query.trim().to_string();
            if query.replace(city, "").trim().chars().count() < 2 {
                continue;
            }
            if !out.contains(&query) {
                out.push(query);
            }
        }
        out
    }

    fn in_home_region(&self, address: Option<&str>) -> bool {
        match address.map(str::trim).filter(|a| !a.is_empty()) {
            None => true,
            Some(addr) => {
                let head: String = addr.chars().take(self.config.address_prefix_chars).collect();
                head.contains(&self.config.home_city)
            }
        }
    }

    /// Normalizes `place` and returns the first in-region hit, if any.
    pub async fn resolve(&self, place: &str) -> Option<GeoPoint> {
        let normalized = normalize_place(place);
        if normalized.is_empty() {
            debug!(place, "place empty after normalization");
            return None;
        }

        for (i, query) in self.candidate_queries(&normalized).iter().enumerate() {
            if i > 0 && !self.config.candidate_delay.is_zero() {
                tokio::time::sleep(self.config.candidate_delay).await;
            }
            match self.search.search(query).await {
                Ok(Some(hit)) if self.in_home_region(hit.address.as_deref()) => {
                    debug!(place, query = %query, lat = hit.latitude, lon = hit.longitude, "geocoded");
                    return Some(hit.point());
                }
                Ok(Some(hit)) => {
                    debug!(place, query = %query, address = ?hit.address, "hit outside home region");
                }
                Ok(None) => {}
                Err(err) => {
                    debug!(place, query = %query, error = %err, "geocode query failed");
                }
            }
        }
        None
    }

    /// Coordinates for an event: source-provided point first, then geocoding,
    /// then the configured fallback.
    pub async fn locate(&self, place: Option<&str>, embedded: Option<GeoPoint>) -> LocatedPlace {
        if let Some(point) = embedded.filter(GeoPoint::within_korea) {
            return LocatedPlace {
                point,
                origin: LocationOrigin::Embedded,
            };
        }
        if let Some(place) = place {
            if let Some(point) = self.resolve(place).await {
                return LocatedPlace {
                    point,
                    origin: LocationOrigin::Geocoded,
                };
            }
            warn!(place, "geocoding failed, using fallback coordinate");
        }
        LocatedPlace {
            point: self.config.fallback,
            origin: LocationOrigin::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use ara_core::ResolvedLocation;
    use async_trait::async_trait;

    use super::*;
    use crate::GeoError;

    #[derive(Default)]
    struct ScriptedSearch {
        answers: HashMap<String, ResolvedLocation>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedSearch {
        fn answer(mut self, query: &str, address: &str, lat: f64, lon: f64) -> Self {
            self.answers.insert(
                query.to_string(),
                ResolvedLocation {
                    name: query.to_string(),
                    address: Some(address.to_string()),
                    longitude: lon,
                    latitude: lat,
                },
            );
            self
        }
    }

    #[async_trait]
    impl PlaceSearch for ScriptedSearch {
        async fn search(&self, query: &str) -> Result<Option<ResolvedLocation>, GeoError> {
            self.seen.lock().unwrap().push(query.to_string());
            Ok(self.answers.get(query).cloned())
        }
    }

    fn resolver(search: ScriptedSearch) -> (GeoResolver, Arc<ScriptedSearch>) {
        let search = Arc::new(search);
        let config = GeoResolverConfig {
            candidate_delay: Duration::ZERO,
            ..GeoResolverConfig::default()
        };
        (GeoResolver::new(search.clone(), config), search)
    }

    #[test]
    fn candidates_cover_city_prefix_tokens_and_station_suffix() {
        let (r, _) = resolver(ScriptedSearch::default());
        assert_eq!(
            r.candidate_queries("광화문"),
            vec!["서울 광화문", "광화문", "서울 광화문역"]
        );
        assert_eq!(
            r.candidate_queries("세종대로 정부청사"),
            vec!["서울 세종대로 정부청사", "세종대로 정부청사", "서울 정부청사", "서울 세종대로"]
        );
        assert_eq!(r.candidate_queries("시청역"), vec!["서울 시청역", "시청역"]);
    }

    #[tokio::test]
    async fn out_of_region_hits_are_skipped() {
        let search = ScriptedSearch::default()
            .answer("서울 시청", "부산 연제구 중앙대로 1001", 35.18, 129.07)
            .answer("시청", "서울 중구 세종대로 110", 37.5663, 126.9779);
        let (r, seen) = resolver(search);
        let point = r.resolve("시청 앞").await.unwrap();
        assert!((point.lat - 37.5663).abs() < 1e-9);
        assert_eq!(*seen.seen.lock().unwrap(), vec!["서울 시청", "시청"]);
    }

    #[tokio::test]
    async fn unresolvable_place_uses_fallback() {
        let (r, _) = resolver(ScriptedSearch::default());
        let located = r.locate(Some("어딘가 모를 곳"), None).await;
        assert_eq!(located.origin, LocationOrigin::Fallback);
        assert_eq!(located.point, GeoPoint::new(37.5709, 126.9769));
    }

    #[tokio::test]
    async fn embedded_coordinates_skip_geocoding() {
        let (r, seen) = resolver(ScriptedSearch::default());
        let located = r
            .locate(Some("광화문"), Some(GeoPoint::new(37.57, 126.97)))
            .await;
        assert_eq!(located.origin, LocationOrigin::Embedded);
        assert!(seen.seen.lock().unwrap().is_empty());
    }
}
