use ara_core::{EventStatus, GeoPoint, NewEvent, RawEventRow, DEFAULT_SEVERITY, EVENT_CATEGORY};
use chrono::{NaiveDateTime, NaiveTime};

pub const UNKNOWN_PLACE: &str = "알 수 없는 장소";

/// Clock used when a printed time cannot be read.
pub fn default_clock() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default()
}

/// Reads `H:MM`/`HH:MM`; anything else, including out-of-range hours or
/// minutes, becomes 09:00.
pub fn normalize_clock(text: &str) -> NaiveTime {
    let mut parts = text.trim().split(':');
    let (Some(hour), Some(minute), None) = (parts.next(), parts.next(), parts.next()) else {
        return default_clock();
    };
    match (hour.trim().parse::<u32>(), minute.trim().parse::<u32>()) {
        (Ok(h), Ok(m)) => NaiveTime::from_hms_opt(h, m, 0).unwrap_or_else(default_clock),
        _ => default_clock(),
    }
}

/// Start and end timestamps of a row. End markers such as `종료시` carry no
/// clock and clamp to 09:00 like any other unreadable time.
pub fn event_window(row: &RawEventRow) -> (NaiveDateTime, NaiveDateTime) {
    let start = row.date.and_time(normalize_clock(&row.start_time));
    let end = row.date.and_time(normalize_clock(&row.end_time));
    (start, end)
}

pub fn event_title(location_name: &str, headcount: Option<u32>) -> String {
    match headcount {
        Some(n) => format!("{location_name} {EVENT_CATEGORY} (참가자 {n}명)"),
        None => format!("{location_name} {EVENT_CATEGORY}"),
    }
}

pub fn event_description(row: &RawEventRow) -> String {
    let mut lines = Vec::with_capacity(3);
    if let Some(n) = row.headcount {
        lines.push(format!("참가인원: {n}명"));
    }
    if let Some(remark) = row.remark.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        lines.push(format!("추가정보: {remark}"));
    }
    lines.push(format!("데이터 출처: {}", row.source.attribution()));
    lines.join(" | ")
}

/// Turns merged rows into insertable events.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    home_district: String,
}

impl EventBuilder {
    pub fn new(home_district: impl Into<String>) -> Self {
        Self {
            home_district: home_district.into(),
        }
    }

    pub fn location_name(row: &RawEventRow) -> String {
        row.primary_place()
            .map(str::to_string)
            .unwrap_or_else(|| UNKNOWN_PLACE.to_string())
    }

    pub fn address(&self, location_name: &str) -> String {
        if location_name == UNKNOWN_PLACE {
            self.home_district.clone()
        } else {
            format!("{} {location_name}", self.home_district)
        }
    }

    pub fn build(&self, row: &RawEventRow, point: GeoPoint) -> NewEvent {
        let location_name = Self::location_name(row);
        let (start_date, end_date) = event_window(row);
        NewEvent {
            title: event_title(&location_name, row.headcount),
            description: Some(event_description(row)),
            location_address: Some(self.address(&location_name)),
            location_name,
            latitude: point.lat,
            longitude: point.lon,
            start_date,
            end_date,
            category: Some(EVENT_CATEGORY.to_string()),
            severity_level: DEFAULT_SEVERITY,
            status: EventStatus::Active,
        }
    }
}
