//! Core domain model for ARA: raw bulletin rows, canonical events and route geometry.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CRATE_NAME: &str = "ara-core";

/// End-time marker for a slot that runs until the crowd disperses.
pub const END_AT_DISMISSAL: &str = "종료시";
/// End-time marker for a slot with no announced end.
pub const END_UNDETERMINED: &str = "미정";

pub const EVENT_CATEGORY: &str = "집회";
pub const DEFAULT_SEVERITY: u8 = 2;

/// Which upstream publication a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// Daily PDF bulletin on the metropolitan police notice board.
    PrimaryBoard,
    /// Dynamically rendered assembly table on the national police system.
    SecondarySystem,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::PrimaryBoard => "smpa",
            EventSource::SecondarySystem => "spatic",
        }
    }

    /// Human-facing attribution written into event descriptions.
    pub fn attribution(&self) -> &'static str {
        match self {
            EventSource::PrimaryBoard => "SMPA(서울경찰청)",
            EventSource::SecondarySystem => "SPATIC(경찰청 집회시위 안내)",
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// True when the point falls inside the national bounding box.
    pub fn within_korea(&self) -> bool {
        (33.0..=39.0).contains(&self.lat) && (124.0..=132.0).contains(&self.lon)
    }
}

/// One detected timeslot from one source, before geocoding.
///
/// `place_tokens` is never empty: rows without an extractable place are
/// discarded by the parsers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEventRow {
    pub source: EventSource,
    pub date: NaiveDate,
    /// `H:MM` or `HH:MM` as printed upstream.
    pub start_time: String,
    /// A clock time, or one of [`END_AT_DISMISSAL`] / [`END_UNDETERMINED`].
    pub end_time: String,
    pub place_tokens: Vec<String>,
    pub headcount: Option<u32>,
    pub remark: Option<String>,
    /// Coordinates shipped by the source itself, if any.
    #[serde(default)]
    pub coordinates: Option<GeoPoint>,
}

impl RawEventRow {
    /// First non-empty place token; the canonical display place.
    pub fn primary_place(&self) -> Option<&str> {
        self.place_tokens
            .iter()
            .map(|p| p.trim())
            .find(|p| !p.is_empty())
    }

    /// Legacy single-column rendering: the lone place, or a JSON array when
    /// the row names several waypoints.
    pub fn place_column(&self) -> String {
        match self.place_tokens.as_slice() {
            [] => String::new(),
            [single] => single.clone(),
            many => serde_json::to_string(many).unwrap_or_else(|_| many.join(", ")),
        }
    }

    /// Source-shipped coordinates, accepted only inside the national box.
    pub fn embedded_point(&self) -> Option<GeoPoint> {
        self.coordinates.filter(GeoPoint::within_korea)
    }
}

/// Inverse of [`RawEventRow::place_column`]; tolerant of malformed arrays.
pub fn parse_place_column(column: &str) -> Vec<String> {
    let trimmed = column.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        if let Ok(values) = serde_json::from_str::<Vec<String>>(trimmed) {
            return values
                .into_iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
        }
        return trimmed
            .trim_matches(|c: char| c == '[' || c == ']')
            .split(',')
            .map(|p| p.replace(['"', '\''], "").trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
    }
    vec![trimmed.to_string()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Active,
    Ended,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Active => "active",
            EventStatus::Ended => "ended",
            EventStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "active" => Ok(EventStatus::Active),
            "ended" => Ok(EventStatus::Ended),
            "cancelled" => Ok(EventStatus::Cancelled),
            other => Err(format!("unknown event status {other:?}")),
        }
    }
}

/// Canonical event ready for insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub location_name: String,
    pub location_address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub category: Option<String>,
    pub severity_level: u8,
    pub status: EventStatus,
}

impl NewEvent {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Persisted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location_name: String,
    pub location_address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub category: Option<String>,
    pub severity_level: u8,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Geocoder answer; transient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub name: String,
    pub address: Option<String>,
    pub longitude: f64,
    pub latitude: f64,
}

impl ResolvedLocation {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// A commuter's origin and destination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserRoute {
    pub departure: GeoPoint,
    pub arrival: GeoPoint,
}

/// Ordered path vertices between two points, as returned by a directions service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutePolyline {
    pub vertices: Vec<GeoPoint>,
}

impl RoutePolyline {
    /// Builds a polyline from a flattened `[lon, lat, lon, lat, ...]` array.
    /// A trailing odd value is ignored.
    pub fn from_flat_lon_lat(flat: &[f64]) -> Self {
        let vertices = flat
            .chunks_exact(2)
            .map(|pair| GeoPoint::new(pair[1], pair[0]))
            .collect();
        Self { vertices }
    }

    pub fn extend_flat_lon_lat(&mut self, flat: &[f64]) {
        self.vertices.extend(Self::from_flat_lon_lat(flat).vertices);
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(places: &[&str]) -> RawEventRow {
        RawEventRow {
            source: EventSource::PrimaryBoard,
            date: NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
            start_time: "09:00".into(),
            end_time: "18:00".into(),
            place_tokens: places.iter().map(|p| p.to_string()).collect(),
            headcount: None,
            remark: None,
            coordinates: None,
        }
    }

    #[test]
    fn place_column_is_plain_for_one_place_and_json_for_many() {
        assert_eq!(row(&["서울역"]).place_column(), "서울역");
        assert_eq!(
            row(&["광화문", "시청"]).place_column(),
            r#"["광화문","시청"]"#
        );
    }

    #[test]
    fn place_column_parser_recovers_from_broken_json() {
        assert_eq!(
            parse_place_column(r#"["광화문","시청"]"#),
            vec!["광화문".to_string(), "시청".to_string()]
        );
        assert_eq!(
            parse_place_column("['광화문', 시청]"),
            vec!["광화문".to_string(), "시청".to_string()]
        );
        assert!(parse_place_column("   ").is_empty());
    }

    #[test]
    fn primary_place_skips_blank_tokens() {
        assert_eq!(row(&["  ", "시청"]).primary_place(), Some("시청"));
        assert_eq!(row(&[]).primary_place(), None);
    }

    #[test]
    fn embedded_coordinates_outside_korea_are_ignored() {
        let mut r = row(&["서울역"]);
        r.coordinates = Some(GeoPoint::new(37.55, 126.97));
        assert!(r.embedded_point().is_some());
        r.coordinates = Some(GeoPoint::new(48.85, 2.35));
        assert!(r.embedded_point().is_none());
    }

    #[test]
    fn flat_vertex_arrays_become_lat_lon_points() {
        let poly = RoutePolyline::from_flat_lon_lat(&[126.97, 37.57, 126.98, 37.56, 127.0]);
        assert_eq!(
            poly.vertices,
            vec![GeoPoint::new(37.57, 126.97), GeoPoint::new(37.56, 126.98)]
        );
    }

    #[test]
    fn status_parses_from_storage_text() {
        assert_eq!("ended".parse::<EventStatus>().unwrap(), EventStatus::Ended);
        assert!("paused".parse::<EventStatus>().is_err());
    }
}
