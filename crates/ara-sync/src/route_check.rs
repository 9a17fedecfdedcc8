use std::sync::Arc;
use std::time::Duration;

use ara_core::{Event, UserRoute};
use ara_geo::{DirectionsService, RouteMatcher, RouteRepresentation};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize)]
pub struct RouteCheck {
    pub route: UserRoute,
    /// False when the straight-line fallback decided proximity.
    pub used_polyline: bool,
    pub events: Vec<Event>,
}

/// Matches upcoming events against commuters' routes.
#[derive(Clone)]
pub struct RouteChecker {
    directions: Arc<dyn DirectionsService>,
    matcher: RouteMatcher,
    lookup_timeout: Duration,
    concurrency: usize,
}

impl RouteChecker {
    pub fn new(directions: Arc<dyn DirectionsService>, matcher: RouteMatcher) -> Self {
        Self {
            directions,
            matcher,
            lookup_timeout: Duration::from_secs(5),
            concurrency: 8,
        }
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Directions polyline for `route`, or its endpoints when the lookup
    /// fails, times out or comes back empty.
    pub async fn representation(&self, route: UserRoute) -> RouteRepresentation {
        let polyline =
            match tokio::time::timeout(self.lookup_timeout, self.directions.route(&route)).await {
                Ok(Ok(polyline)) => Some(polyline),
                Ok(Err(err)) => {
                    warn!(error = %err, "directions lookup failed, using straight-line check");
                    None
                }
                Err(_) => {
                    warn!(timeout = ?self.lookup_timeout, "directions lookup timed out, using straight-line check");
                    None
                }
            };
        RouteRepresentation::from_directions(route, polyline)
    }

    pub async fn check(&self, route: UserRoute, events: &[Event]) -> RouteCheck {
        let representation = self.representation(route).await;
        let near: Vec<Event> = self
            .matcher
            .events_near(&representation, events)
            .into_iter()
            .cloned()
            .collect();
        debug!(events = near.len(), "route checked");
        RouteCheck {
            route,
            used_polyline: matches!(representation, RouteRepresentation::Polyline(_)),
            events: near,
        }
    }

    /// Checks many routes with bounded parallelism; results keep input order.
    pub async fn check_all(&self, routes: &[UserRoute], events: &[Event]) -> Vec<RouteCheck> {
        stream::iter(routes.iter().copied())
            .map(|route| self.check(route, events))
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use ara_core::{EventStatus, GeoPoint, RoutePolyline};
    use ara_geo::GeoError;
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};

    use super::*;

    const SEOUL_STATION: GeoPoint = GeoPoint { lat: 37.5547, lon: 126.9707 };
    const CITY_HALL: GeoPoint = GeoPoint { lat: 37.5663, lon: 126.9779 };
    const GANGNAM: GeoPoint = GeoPoint { lat: 37.4979, lon: 127.0276 };

    enum Behaviour {
        Polyline(Vec<GeoPoint>),
        Fail,
        Hang,
    }

    struct FakeDirections(Behaviour);

    #[async_trait]
    impl DirectionsService for FakeDirections {
        async fn route(&self, _route: &UserRoute) -> Result<RoutePolyline, GeoError> {
            match &self.0 {
                Behaviour::Polyline(vertices) => Ok(RoutePolyline {
                    vertices: vertices.clone(),
                }),
                Behaviour::Fail => Err(GeoError::MissingApiKey),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(RoutePolyline::default())
                }
            }
        }
    }

    fn event(id: i64, point: GeoPoint) -> Event {
        let start = NaiveDate::from_ymd_opt(2025, 8, 15)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        Event {
            id,
            title: format!("집회 {id}"),
            description: None,
            location_name: format!("장소 {id}"),
            location_address: None,
            latitude: point.lat,
            longitude: point.lon,
            start_date: start,
            end_date: start,
            category: Some("집회".into()),
            severity_level: 2,
            status: EventStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn route() -> UserRoute {
        UserRoute {
            departure: SEOUL_STATION,
            arrival: CITY_HALL,
        }
    }

    #[tokio::test]
    async fn polyline_vertices_decide_proximity() {
        let checker = RouteChecker::new(
            Arc::new(FakeDirections(Behaviour::Polyline(vec![SEOUL_STATION, CITY_HALL]))),
            RouteMatcher::default(),
        );
        let events = vec![event(1, CITY_HALL), event(2, GANGNAM)];
        let check = checker.check(route(), &events).await;
        assert!(check.used_polyline);
        assert_eq!(check.events.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1]);
    }

    #[tokio::test]
    async fn failed_lookup_falls_back_to_endpoints() {
        let checker = RouteChecker::new(Arc::new(FakeDirections(Behaviour::Fail)), RouteMatcher::default());
        let check = checker.check(route(), &[event(1, SEOUL_STATION), event(2, GANGNAM)]).await;
        assert!(!check.used_polyline);
        assert_eq!(check.events.len(), 1);
        assert_eq!(check.events[0].id, 1);
    }

    #[tokio::test]
    async fn empty_polyline_falls_back_to_endpoints() {
        let checker = RouteChecker::new(
            Arc::new(FakeDirections(Behaviour::Polyline(Vec::new()))),
            RouteMatcher::default(),
        );
        assert!(matches!(
            checker.representation(route()).await,
            RouteRepresentation::Endpoints(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_lookup_times_out_into_the_fallback() {
        let checker = RouteChecker::new(Arc::new(FakeDirections(Behaviour::Hang)), RouteMatcher::default())
            .with_lookup_timeout(Duration::from_millis(100));
        let checks = checker
            .check_all(&[route(), route()], &[event(1, CITY_HALL)])
            .await;
        assert_eq!(checks.len(), 2);
        assert!(checks.iter().all(|c| !c.used_polyline && c.events.len() == 1));
    }
}
