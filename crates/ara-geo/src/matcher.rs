use ara_core::{Event, GeoPoint, RoutePolyline, UserRoute};

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;
pub const DEFAULT_THRESHOLD_METERS: f64 = 500.0;

/// Great-circle distance in meters.
pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().atan2((1.0 - h).sqrt())
}

/// What we know about a commuter's path when testing proximity.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteRepresentation {
    /// Driving path from a directions provider.
    Polyline(RoutePolyline),
    /// Only the two endpoints; proximity uses the straight-line detour test.
    Endpoints(UserRoute),
}

impl RouteRepresentation {
    /// A polyline when one is available, otherwise the endpoints.
    pub fn from_directions(route: UserRoute, polyline: Option<RoutePolyline>) -> Self {
        match polyline {
            Some(p) if !p.is_empty() => RouteRepresentation::Polyline(p),
            _ => RouteRepresentation::Endpoints(route),
        }
    }

    pub fn is_near(&self, point: GeoPoint, threshold_meters: f64) -> bool {
        match self {
            RouteRepresentation::Polyline(polyline) => {
                near_polyline(polyline, point, threshold_meters)
            }
            RouteRepresentation::Endpoints(route) => {
                near_straight_line(route, point, threshold_meters)
            }
        }
    }
}

/// True when any vertex lies within the threshold. An empty polyline is
/// never near anything.
fn near_polyline(polyline: &RoutePolyline, point: GeoPoint, threshold_meters: f64) -> bool {
    polyline
        .vertices
        .iter()
        .any(|v| haversine_meters(*v, point) <= threshold_meters)
}

/// Detour test against the straight segment between the endpoints; also
/// true when the point is within the threshold of either endpoint.
fn near_straight_line(route: &UserRoute, point: GeoPoint, threshold_meters: f64) -> bool {
    let to_departure = haversine_meters(route.departure, point);
    let to_arrival = haversine_meters(point, route.arrival);
    if to_departure <= threshold_meters || to_arrival <= threshold_meters {
        return true;
    }
    let direct = haversine_meters(route.departure, route.arrival);
    (to_departure + to_arrival - direct).abs() <= threshold_meters
}

pub fn is_near(route: &RouteRepresentation, lat: f64, lon: f64, threshold_meters: f64) -> bool {
    route.is_near(GeoPoint::new(lat, lon), threshold_meters)
}

/// Filters events against one route with a fixed threshold.
#[derive(Debug, Clone, Copy)]
pub struct RouteMatcher {
    pub threshold_meters: f64,
}

impl Default for RouteMatcher {
    fn default() -> Self {
        Self {
            threshold_meters: DEFAULT_THRESHOLD_METERS,
        }
    }
}

impl RouteMatcher {
    pub fn new(threshold_meters: f64) -> Self {
        Self { threshold_meters }
    }

    pub fn events_near<'a>(&self, route: &RouteRepresentation, events: &'a [Event]) -> Vec<&'a Event> {
        events
            .iter()
            .filter(|e| route.is_near(e.point(), self.threshold_meters))
            .collect()
    }
}
