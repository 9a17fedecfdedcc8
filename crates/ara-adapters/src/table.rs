use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use ara_core::{EventSource, RawEventRow, END_AT_DISMISSAL, END_UNDETERMINED};
use ara_storage::HttpFetcher;
use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use crate::render::ListRenderer;
use crate::text::{collapse_whitespace, has_letter, strip_whitespace, structured_text};
use crate::{AdapterContext, AdapterError, DocumentBody, FetchedDocument, SourceAdapter};

pub const SPATIC_BASE_URL: &str = "https://www.spatic.go.kr";
pub const SPATIC_LIST_URL: &str = "https://www.spatic.go.kr/spatic/main/assem.do";

const LIST_ROW_SELECTOR: &str = ".assem_content tr";

const DETAIL_TABLE_SELECTORS: &[&str] = &[
    "div.police_main_wrap.detail.flex.flex_column > section > div > div > \
     ul.notice_datail.flex.flex_wrap > li.notice_contents > div > table",
    "ul.notice_datail.flex.flex_wrap li.notice_contents > div > table",
    "li.notice_contents > div > table",
    "div.detail_contents table",
];

const TIME_LABELS: &[&str] = &["시간", "집회시간", "집결시간"];
const PLACE_LABELS: &[&str] = &["장소", "집회장소", "집결장소", "집결지"];
const ROUTE_LABELS: &[&str] = &["행진", "경로", "이동"];

static MGR_SEQ_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"mgrSeq=(\d+)").expect("mgrSeq regex"));
static ONCLICK_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]?(\d{4,})['"]?"#).expect("onclick id regex"));
static DASHED_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})[-./](\d{1,2})[-./](\d{1,2})").expect("dashed date regex")
});
static KOREAN_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})\s*년\s*(\d{1,2})\s*월\s*(\d{1,2})\s*일").expect("korean date regex")
});
static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2}\s*:\s*\d{2})\s*[~\-–—]\s*(\d{1,2}\s*:\s*\d{2})").expect("range regex")
});
static CLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}\s*:\s*\d{2}").expect("clock regex"));
static DISMISSAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"종료\s*시|끝날?\s*때|해산\s*시").expect("dismissal regex"));
static COLLOQUIAL_HOUR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(오전|오후)\s*(\d{1,2})\s*시").expect("colloquial hour regex"));
static PLACE_SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*(?:→|↔|⟷|↦|↪|➝|➔|⇒|~|〜|∼|–|—|/|,|▶|⇄)\s*").expect("place separator regex")
});
static LANE_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\s*개?차로").expect("lane count regex"));
static MARCH_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"※\s*행진\s*[:：]?\s*").expect("march label regex"));

/// One row of the rendered assembly list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    pub post_id: u64,
    pub title: String,
    pub date: Option<NaiveDate>,
}

/// Places announced for one `(start, end)` slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeGroup {
    pub start_time: String,
    pub end_time: String,
    pub places: Vec<String>,
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn cell_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// `YYYY-MM-DD` (also `.` or `/`) or `YYYY년 MM월 DD일`.
pub fn parse_list_date(text: &str) -> Option<NaiveDate> {
    let text = collapse_whitespace(text);
    let caps = DASHED_DATE_RE
        .captures(&text)
        .or_else(|| KOREAN_DATE_RE.captures(&text))?;
    NaiveDate::from_ymd_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?)
}

fn row_post_id(row: ElementRef<'_>) -> Option<u64> {
    let attr = row.value().attr("key").map(str::to_string);
    let from_markup = || {
        MGR_SEQ_RE
            .captures(&row.html())
            .map(|c| c[1].to_string())
    };
    let from_onclick = || {
        row.value()
            .attr("onclick")
            .and_then(|oc| ONCLICK_ID_RE.captures(oc))
            .map(|c| c[1].to_string())
    };
    attr.filter(|k| !k.trim().is_empty())
        .or_else(from_markup)
        .or_else(from_onclick)
        .and_then(|id| id.trim().parse().ok())
}

/// Rows of the rendered list. Rows with fewer than three cells or no post
/// identifier are skipped; repeated identifiers collapse to the first row.
pub fn list_rows(html: &str) -> Vec<ListRow> {
    let doc = Html::parse_document(html);
    let (Some(rows_sel), Some(td_sel)) = (selector(LIST_ROW_SELECTOR), selector("td")) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for row in doc.select(&rows_sel) {
        let cells: Vec<_> = row.select(&td_sel).collect();
        if cells.len() < 3 {
            continue;
        }
        let Some(post_id) = row_post_id(row) else {
            continue;
        };
        if !seen.insert(post_id) {
            continue;
        }
        out.push(ListRow {
            post_id,
            title: cell_text(cells[1]),
            date: parse_list_date(&cell_text(cells[2])),
        });
    }
    out
}

/// Titles announcing assemblies: `집회`, or `행사` with `안내`/`정보`.
pub fn is_assembly_title(title: &str) -> bool {
    let title = collapse_whitespace(title);
    title.contains("집회") || (title.contains("행사") && (title.contains("안내") || title.contains("정보")))
}

/// The assembly post with the highest identifier.
pub fn select_latest(rows: &[ListRow]) -> Option<&ListRow> {
    rows.iter()
        .filter(|r| is_assembly_title(&r.title))
        .max_by_key(|r| r.post_id)
}

/// Start and end of a table time cell. Besides `H:MM ~ H:MM`, a lone clock
/// time yields an end marker and `오전/오후 N시` is read as a 24-hour start.
pub fn parse_time_range(text: &str) -> Option<(String, String)> {
    if text.trim().is_empty() {
        return None;
    }
    let text = collapse_whitespace(text)
        .replace(['∼', '〜'], "~")
        .replace(['–', '—'], "-");

    if let Some(caps) = RANGE_RE.captures(&text) {
        return Some((strip_whitespace(&caps[1]), strip_whitespace(&caps[2])));
    }
    if let Some(m) = CLOCK_RE.find(&text) {
        let end = if DISMISSAL_RE.is_match(&text) {
            END_AT_DISMISSAL
        } else {
            END_UNDETERMINED
        };
        return Some((strip_whitespace(m.as_str()), end.to_string()));
    }
    let caps = COLLOQUIAL_HOUR_RE.captures(&text)?;
    let mut hour: u32 = caps[2].parse().ok()?;
    match &caps[1] {
        "오후" if hour != 12 => hour += 12,
        "오전" if hour == 12 => hour = 0,
        _ => {}
    }
    Some((format!("{hour:02}:00"), END_UNDETERMINED.to_string()))
}

/// Splits a place cell into waypoint tokens, dropping fragments that are
/// not places (lone glyphs, `출`/`구`/`로`/`길`, lane counts).
pub fn split_places(text: &str) -> Vec<String> {
    let text = collapse_whitespace(&text.replace('\n', " / "));
    let mut seen = HashSet::new();
    PLACE_SEPARATOR_RE
        .split(&text)
        .map(str::trim)
        .filter(|p| !(p.chars().count() <= 1 && !has_letter(p)))
        .filter(|p| !matches!(*p, "출" | "구" | "로" | "길"))
        .filter(|p| !LANE_COUNT_RE.is_match(p))
        .filter(|p| seen.insert(p.to_string()))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ColumnMap {
    time: Option<usize>,
    place: Option<usize>,
    route: Option<usize>,
}

impl ColumnMap {
    fn from_labels(labels: &[String]) -> Self {
        let mut map = ColumnMap::default();
        for (i, label) in labels.iter().enumerate() {
            if TIME_LABELS.iter().any(|kw| label.contains(kw)) {
                map.time = Some(i);
            }
            if PLACE_LABELS.iter().any(|kw| label.contains(kw)) {
                map.place = Some(i);
            }
            if ROUTE_LABELS.iter().any(|kw| label.contains(kw)) {
                map.route = Some(i);
            }
        }
        map
    }

    fn is_empty(&self) -> bool {
        self.time.is_none() && self.place.is_none() && self.route.is_none()
    }

    /// Missing time/place columns default to a 2- or 3-column layout.
    fn with_defaults(self, cell_count: usize) -> (usize, usize, Option<usize>) {
        let narrow = cell_count <= 2;
        (
            self.time.unwrap_or(if narrow { 0 } else { 1 }),
            self.place.unwrap_or(if narrow { 1 } else { 2 }),
            self.route,
        )
    }
}

fn find_detail_table(doc: &Html) -> Option<ElementRef<'_>> {
    for css in DETAIL_TABLE_SELECTORS {
        let Some(sel) = selector(css) else { continue };
        if let Some(table) = doc.select(&sel).next() {
            return Some(table);
        }
    }
    let tables = selector("table")?;
    if let Some(table) = doc.select(&tables).find(|t| {
        let label = strip_whitespace(&t.text().collect::<String>());
        label.contains("시간") && label.contains("장소")
    }) {
        return Some(table);
    }
    let nested = selector("li.notice_contents table")?;
    doc.select(&nested).next()
}

/// Time slots and their places from a detail page, in table order.
pub fn parse_detail_groups(html: &str) -> Vec<TimeGroup> {
    let doc = Html::parse_document(html);
    let Some(table) = find_detail_table(&doc) else {
        debug!("no detail table found");
        return Vec::new();
    };
    let (Some(tr_sel), Some(cell_sel)) = (selector("tr"), selector("td, th")) else {
        return Vec::new();
    };

    let rows: Vec<ElementRef<'_>> = table.select(&tr_sel).collect();
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let first_cells: Vec<_> = first.select(&cell_sel).collect();
    let labels: Vec<String> = first_cells
        .iter()
        .map(|c| strip_whitespace(&c.text().collect::<String>()))
        .collect();
    let header = ColumnMap::from_labels(&labels);
    let data_rows = if header.is_empty() { &rows[..] } else { &rows[1..] };
    let (time_col, place_col, route_col) = header.with_defaults(first_cells.len());

    let mut groups: Vec<TimeGroup> = Vec::new();
    for tr in data_rows {
        let cells: Vec<_> = tr.select(&cell_sel).collect();
        if cells.is_empty() {
            continue;
        }
        let time_text = cells.get(time_col).map(|c| structured_text(*c)).unwrap_or_default();
        let Some((start, end)) =
            parse_time_range(&time_text).or_else(|| parse_time_range(&structured_text(*tr)))
        else {
            debug!(time_text = %time_text, "table row without a time, skipped");
            continue;
        };

        let mut places = cells
            .get(place_col)
            .map(|c| {
                let raw = structured_text(*c);
                split_places(&MARCH_LABEL_RE.replace_all(&raw, " "))
            })
            .unwrap_or_default();
        if let Some(route) = route_col.and_then(|i| cells.get(i)) {
            places.extend(split_places(&structured_text(*route)));
        }
        if places.is_empty() {
            places = split_places(&structured_text(*tr));
        }
        if places.is_empty() {
            debug!(%start, %end, "table row without a place, skipped");
            continue;
        }

        let existing = groups
            .iter()
            .position(|g| g.start_time == start && g.end_time == end);
        let group = match existing {
            Some(i) => &mut groups[i],
            None => {
                groups.push(TimeGroup {
                    start_time: start,
                    end_time: end,
                    places: Vec::new(),
                });
                let last = groups.len() - 1;
                &mut groups[last]
            }
        };
        for place in places {
            if !group.places.contains(&place) {
                group.places.push(place);
            }
        }
    }
    groups
}

/// Assembly table on the national police information system. The list is
/// rendered by scripts; the detail page is plain HTML.
#[derive(Clone)]
pub struct SpaticTableAdapter {
    renderer: Arc<dyn ListRenderer>,
    base_url: String,
    list_url: String,
}

impl SpaticTableAdapter {
    pub fn new(renderer: Arc<dyn ListRenderer>) -> Self {
        Self {
            renderer,
            base_url: SPATIC_BASE_URL.to_string(),
            list_url: SPATIC_LIST_URL.to_string(),
        }
    }

    pub fn with_urls(mut self, base_url: impl Into<String>, list_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self.list_url = list_url.into();
        self
    }

    pub fn detail_url(&self, post_id: u64) -> String {
        format!("{}/spatic/assem/getInfoView.do?mgrSeq={post_id}", self.base_url)
    }
}

#[async_trait]
impl SourceAdapter for SpaticTableAdapter {
    fn source(&self) -> EventSource {
        EventSource::SecondarySystem
    }

    async fn fetch(
        &self,
        http: &HttpFetcher,
        ctx: &AdapterContext,
    ) -> Result<Option<FetchedDocument>, AdapterError> {
        let rendered = match self.renderer.render(&self.list_url, LIST_ROW_SELECTOR).await {
            Ok(html) => html,
            Err(AdapterError::RendererUnavailable(reason)) => {
                info!(%reason, "list renderer unavailable, skipping source");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let rows = list_rows(&rendered);
        let Some(latest) = select_latest(&rows) else {
            info!(rows = rows.len(), "no assembly post in list");
            return Ok(None);
        };
        let date = latest.date.unwrap_or_else(|| ctx.local_date());
        let url = self.detail_url(latest.post_id);
        info!(post_id = latest.post_id, %date, "assembly post selected");

        let detail = http.get("spatic_detail", &url).await?;
        Ok(Some(FetchedDocument {
            source: self.source(),
            date,
            title: latest.title.clone(),
            url,
            body: DocumentBody::Html(detail.text()),
            artifact: None,
        }))
    }

    fn parse(&self, doc: &FetchedDocument) -> Result<Vec<RawEventRow>, AdapterError> {
        let DocumentBody::Html(html) = &doc.body else {
            return Err(AdapterError::Parse(
                "table adapter expects an HTML document".to_string(),
            ));
        };
        let rows: Vec<RawEventRow> = parse_detail_groups(html)
            .into_iter()
            .map(|g| RawEventRow {
                source: EventSource::SecondarySystem,
                date: doc.date,
                start_time: g.start_time,
                end_time: g.end_time,
                place_tokens: g.places,
                headcount: None,
                remark: None,
                coordinates: None,
            })
            .collect();
        info!(rows = rows.len(), date = %doc.date, "assembly table parsed");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use ara_storage::{ArtifactStore, HttpClientConfig};
    use uuid::Uuid;

    use super::*;
    use crate::render::NoRenderer;

    fn fixture(name: &str) -> String {
        let root: PathBuf = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../..")
            .canonicalize()
            .expect("workspace root");
        fs::read_to_string(root.join("fixtures").join("spatic").join(name)).expect("read fixture")
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn time_forms() {
        assert_eq!(
            parse_time_range("09:00 ∼ 12:30"),
            Some(("09:00".into(), "12:30".into()))
        );
        assert_eq!(
            parse_time_range("13 : 00 – 15:00"),
            Some(("13:00".into(), "15:00".into()))
        );
        assert_eq!(
            parse_time_range("18:00\n(종료 시까지)"),
            Some(("18:00".into(), "종료시".into()))
        );
        assert_eq!(parse_time_range("14:00 ~"), Some(("14:00".into(), "미정".into())));
        assert_eq!(parse_time_range("오후 2시"), Some(("14:00".into(), "미정".into())));
        assert_eq!(parse_time_range("오전 12시"), Some(("00:00".into(), "미정".into())));
        assert_eq!(parse_time_range("오후 12시"), Some(("12:00".into(), "미정".into())));
        assert_eq!(parse_time_range("미정"), None);
    }

    #[test]
    fn place_splitting_filters_fragments() {
        assert_eq!(
            split_places("광화문 ⇄ 시청 / 서울광장, 시청"),
            strings(&["광화문", "시청", "서울광장"])
        );
        assert_eq!(
            split_places("세종대로 2개차로 → 숭례문 ▶ 서울역"),
            strings(&["숭례문", "서울역"])
        );
        assert_eq!(split_places("구 ~ 용산역 ~ -"), strings(&["용산역"]));
        assert_eq!(split_places("서울역\n숭례문"), strings(&["서울역", "숭례문"]));
    }

    #[test]
    fn titles_and_latest_selection() {
        assert!(is_assembly_title("8월 15일 집회 안내"));
        assert!(is_assembly_title("주요 행사 정보"));
        assert!(!is_assembly_title("주요 행사"));
        assert!(!is_assembly_title("교통 통제 알림"));

        let rows = list_rows(&fixture("list.html"));
        assert_eq!(rows.len(), 4);
        let latest = select_latest(&rows).unwrap();
        assert_eq!(latest.post_id, 20250815);
        assert_eq!(latest.date, NaiveDate::from_ymd_opt(2025, 8, 15));
    }

    #[test]
    fn list_ids_come_from_key_markup_or_onclick() {
        let rows = list_rows(&fixture("list.html"));
        let ids: Vec<u64> = rows.iter().map(|r| r.post_id).collect();
        assert_eq!(ids, vec![20250815, 20250814, 20250813, 20250812]);
        assert_eq!(rows[3].date, NaiveDate::from_ymd_opt(2025, 8, 12));
    }

    #[test]
    fn detail_table_groups_rows_by_time_slot() {
        let groups = parse_detail_groups(&fixture("detail.html"));
        assert_eq!(
            groups,
            vec![
                TimeGroup {
                    start_time: "09:00".into(),
                    end_time: "12:00".into(),
                    places: strings(&["서울역", "숭례문", "시청"]),
                },
                TimeGroup {
                    start_time: "13:00".into(),
                    end_time: "종료시".into(),
                    places: strings(&["광화문 동화면세점 앞", "세종대로"]),
                },
                TimeGroup {
                    start_time: "14:00".into(),
                    end_time: "미정".into(),
                    places: strings(&["여의도공원"]),
                },
            ]
        );
    }

    #[test]
    fn headerless_table_uses_column_count_defaults() {
        let html = "<html><body><div class=\"detail_contents\"><table>\
                    <tr><td>1</td><td>10:00~11:00</td><td>효자동 주민센터</td></tr>\
                    <tr><td>2</td><td>12:00~13:00</td><td>청운동</td></tr>\
                    </table></div></body></html>";
        let groups = parse_detail_groups(html);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].places, strings(&["효자동 주민센터"]));
    }

    #[tokio::test]
    async fn unavailable_renderer_yields_nothing() {
        let adapter = SpaticTableAdapter::new(Arc::new(NoRenderer));
        let http = HttpFetcher::new(HttpClientConfig::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let ctx = AdapterContext::new(Uuid::new_v4(), chrono::Utc::now(), ArtifactStore::new(dir.path()));
        assert!(adapter.fetch(&http, &ctx).await.unwrap().is_none());
    }

    #[test]
    fn parsed_rows_carry_document_date() {
        let adapter = SpaticTableAdapter::new(Arc::new(NoRenderer));
        let doc = FetchedDocument {
            source: EventSource::SecondarySystem,
            date: NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
            title: "8월 15일 집회 안내".into(),
            url: adapter.detail_url(20250815),
            body: DocumentBody::Html(fixture("detail.html")),
            artifact: None,
        };
        let rows = adapter.parse(&doc).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.source == EventSource::SecondarySystem));
        assert_eq!(
            doc.url,
            "https://www.spatic.go.kr/spatic/assem/getInfoView.do?mgrSeq=20250815"
        );
    }
}
