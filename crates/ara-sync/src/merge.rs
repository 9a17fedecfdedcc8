use std::collections::HashSet;

use ara_core::RawEventRow;
use ara_geo::normalize_place;

use crate::build::normalize_clock;

/// Key deciding whether two place tokens of two rows describe the same slot.
pub fn dedup_key(row: &RawEventRow, place: &str) -> String {
    let normalized = normalize_place(place);
    let place_key = if normalized.is_empty() {
        place.chars().filter(|c| !c.is_whitespace()).collect()
    } else {
        normalized
    };
    format!(
        "{}|{}|{}",
        row.date.format("%Y-%m-%d"),
        normalize_clock(&row.start_time).format("%H:%M"),
        place_key
    )
}

/// Merges per-source row lists in priority order.
///
/// Each place token survives only if its key was not seen earlier in this
/// pass, so rows from earlier sources win conflicts. Rows left without any
/// place are dropped.
pub fn merge(sources: &[Vec<RawEventRow>]) -> Vec<RawEventRow> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();

    for row in sources.iter().flatten() {
        let places: Vec<String> = row
            .place_tokens
            .iter()
            .filter(|place| seen.insert(dedup_key(row, place)))
            .cloned()
            .collect();
        if places.is_empty() {
            continue;
        }
        merged.push(RawEventRow {
            place_tokens: places,
            ..row.clone()
        });
    }
    merged
}

#[cfg(test)]
mod tests {
    use ara_core::EventSource;
    use chrono::NaiveDate;

    use super::*;

    fn row(source: EventSource, start: &str, places: &[&str]) -> RawEventRow {
        RawEventRow {
            source,
            date: NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
            start_time: start.into(),
            end_time: "12:00".into(),
            place_tokens: places.iter().map(|p| p.to_string()).collect(),
            headcount: None,
            remark: None,
            coordinates: None,
        }
    }

    #[test]
    fn same_slot_from_both_sources_merges_to_one_row() {
        let merged = merge(&[
            vec![row(EventSource::PrimaryBoard, "09:00", &["서울역"])],
            vec![row(EventSource::SecondarySystem, "09:00", &["서울역"])],
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, EventSource::PrimaryBoard);
    }

    #[test]
    fn overlapping_waypoints_are_trimmed_from_later_rows() {
        let merged = merge(&[
            vec![row(EventSource::PrimaryBoard, "10:00", &["광화문", "시청"])],
            vec![row(EventSource::SecondarySystem, "10:00", &["시청", "숭례문"])],
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].place_tokens, vec!["숭례문".to_string()]);
    }

    #[test]
    fn keys_compare_normalized_places() {
        let merged = merge(&[vec![
            row(EventSource::PrimaryBoard, "09:00", &["서울역 1번출구 앞"]),
            row(EventSource::PrimaryBoard, "09:00", &["서울역  1번 출구 부근"]),
            row(EventSource::PrimaryBoard, "13:00", &["서울역 1번출구 앞"]),
        ]]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].start_time, "13:00");
    }

    #[test]
    fn unpadded_start_times_match_padded_ones() {
        let a = row(EventSource::PrimaryBoard, "9:00", &["서울역"]);
        let b = row(EventSource::SecondarySystem, "09:00", &["서울역"]);
        assert_eq!(dedup_key(&a, "서울역"), dedup_key(&b, "서울역"));
        assert_eq!(dedup_key(&a, "서울역"), "2025-08-15|09:00|서울역");

        let merged = merge(&[vec![a], vec![b]]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start_time, "9:00");
    }

    #[test]
    fn places_that_normalize_to_nothing_still_dedup_on_raw_text() {
        let merged = merge(&[
            vec![row(EventSource::PrimaryBoard, "09:00", &["앞"])],
            vec![row(EventSource::SecondarySystem, "09:00", &[" 앞 "])],
        ]);
        assert_eq!(merged.len(), 1);
    }
}
