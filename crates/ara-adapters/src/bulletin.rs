use std::ops::Range;
use std::sync::LazyLock;

use ara_core::{EventSource, RawEventRow};
use ara_storage::{sanitize_file_name, FetchedResponse, HttpFetcher};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use regex::Regex;
use reqwest::header::REFERER;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::text::{collapse_hangul_gaps, collapse_whitespace, strip_whitespace};
use crate::{
    pdf_text, AdapterContext, AdapterError, AttachmentPayload, DocumentBody, FetchedDocument,
    SourceAdapter,
};

pub const SMPA_BASE_URL: &str = "https://www.smpa.go.kr";
pub const SMPA_LIST_URL: &str = "https://www.smpa.go.kr/user/nd54882.do";

const BOARD_TBODY: &str = "#subContents > div > div.inContent > table > tbody";
const BOARD_ANCHOR: &str = "a[href^='javascript:goBoardView']";
const TITLE_PREFIX: &str = "오늘의 집회";

static BOARD_VIEW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"goBoardView\('([^']+)'\s*,\s*'([^']+)'\s*,\s*'(\d+)'\)").expect("goBoardView regex")
});
static ATTACHMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"attachfileDownload\('([^']+)'\s*,\s*'(\d+)'\)").expect("attachment regex")
});
static TITLE_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2})(\d{2})(\d{2})").expect("title date regex"));
static SPLIT_HOUR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})\s*\n\s*:\s*(\d{2})").expect("split hour regex"));
static SPLIT_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2}\s*:\s*\d{2})\s*\n\s*~\s*\n\s*(\d{1,2}\s*:\s*\d{2})")
        .expect("split range regex")
});
static TIME_SLOT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<start>\d{1,2}\s*:\s*\d{2})\s*~\s*(?P<end>\d{1,2}\s*:\s*\d{2})")
        .expect("time slot regex")
});
static HEADCOUNT_UNIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3}(?:,\d{3})+|\d+)\s*명").expect("headcount regex"));
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,3}(?:,\d{3})+|\d+").expect("number regex"));
static ANNOTATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^>]+)>").expect("annotation regex"));
static ROUTE_GLYPH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(?:→|↔|~)\s*").expect("route glyph regex"));
static DISPOSITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"filename\*?=([^;]+)").expect("disposition regex"));

/// A post on the notice board list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardPost {
    pub board_type: String,
    pub board_id: String,
    pub post_no: String,
    pub title: String,
}

impl BoardPost {
    /// The two detail URL shapes seen across deployments.
    pub fn view_urls(&self, base: &str) -> [String; 2] {
        [
            format!("{base}/user/nd54882.do?View&boardNo={}", self.post_no),
            format!("{base}/user/nd54882.do?dmlType=View&boardNo={}", self.post_no),
        ]
    }

    /// First `YYMMDD` in the title, read as `20YY-MM-DD`.
    pub fn title_date(&self) -> Option<NaiveDate> {
        let caps = TITLE_DATE_RE.captures(&self.title)?;
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(2000 + year, month, day)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentLink {
    pub url: String,
    pub attach_no: String,
    pub label: String,
}

fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "월",
        Weekday::Tue => "화",
        Weekday::Wed => "수",
        Weekday::Thu => "목",
        Weekday::Fri => "금",
        Weekday::Sat => "토",
        Weekday::Sun => "일",
    }
}

/// Every `goBoardView` anchor on the list page, table body first.
pub fn list_posts(html: &str) -> Vec<BoardPost> {
    let doc = Html::parse_document(html);
    let (Ok(scoped), Ok(anywhere)) = (
        Selector::parse(&format!("{BOARD_TBODY} {BOARD_ANCHOR}")),
        Selector::parse(BOARD_ANCHOR),
    ) else {
        return Vec::new();
    };

    let mut anchors: Vec<_> = doc.select(&scoped).collect();
    if anchors.is_empty() {
        anchors = doc.select(&anywhere).collect();
    }

    anchors
        .into_iter()
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            let caps = BOARD_VIEW_RE.captures(href)?;
            Some(BoardPost {
                board_type: caps[1].to_string(),
                board_id: caps[2].to_string(),
                post_no: caps[3].to_string(),
                title: collapse_whitespace(&a.text().collect::<String>()),
            })
        })
        .collect()
}

/// The post titled for `date` (`오늘의 집회 YYMMDD [weekday]`).
pub fn find_post_for_date(posts: &[BoardPost], date: NaiveDate) -> Option<&BoardPost> {
    let stamp = date.format("%y%m%d").to_string();
    let with_weekday = format!("{TITLE_PREFIX} {stamp} {}", weekday_label(date.weekday()));
    let bare = format!("{TITLE_PREFIX} {stamp}");
    posts
        .iter()
        .find(|p| p.title.contains(&with_weekday) || p.title.contains(&bare))
}

/// Download anchors on a post's detail page. Anchors whose text mentions a
/// PDF come first; when none do, every download anchor is a candidate.
pub fn attachment_links(html: &str, base: &str) -> Vec<AttachmentLink> {
    let doc = Html::parse_document(html);
    let Ok(anchors) = Selector::parse("a[onclick]") else {
        return Vec::new();
    };
    let Ok(base_url) = Url::parse(base) else {
        return Vec::new();
    };

    let mut all = Vec::new();
    for a in doc.select(&anchors) {
        let Some(caps) = a.value().attr("onclick").and_then(|oc| ATTACHMENT_RE.captures(oc)) else {
            continue;
        };
        let Ok(url) = base_url.join(&caps[1]) else {
            continue;
        };
        all.push(AttachmentLink {
            url: url.to_string(),
            attach_no: caps[2].to_string(),
            label: collapse_whitespace(&a.text().collect::<String>()),
        });
    }

    let pdf_labelled: Vec<AttachmentLink> = all
        .iter()
        .filter(|l| l.label.to_lowercase().contains("pdf"))
        .cloned()
        .collect();
    if pdf_labelled.is_empty() {
        all
    } else {
        pdf_labelled
    }
}

/// File name from a `Content-Disposition` header, RFC 5987 form included.
pub fn file_name_from_disposition(header: &str) -> Option<String> {
    let caps = DISPOSITION_RE.captures(header)?;
    let value = caps[1].trim().trim_matches(|c: char| c == '"' || c == '\'');
    if value.to_ascii_uppercase().starts_with("UTF-8") {
        if let Some((_, encoded)) = value.split_once("''") {
            let decoded = urlencoding::decode_binary(encoded.as_bytes());
            return Some(String::from_utf8_lossy(&decoded).into_owned());
        }
    }
    (!value.is_empty()).then(|| value.to_string())
}

/// Download request for one attachment. The board refuses downloads that do
/// not come from the post's view page.
fn attachment_request(
    client: &reqwest::Client,
    link: &AttachmentLink,
    view_url: &str,
) -> reqwest::RequestBuilder {
    client
        .get(&link.url)
        .query(&[("attachNo", link.attach_no.as_str())])
        .header(REFERER, view_url)
}

fn is_pdf(resp: &FetchedResponse, bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
        || resp
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("pdf"))
}

fn attachment_file_name(resp: &FetchedResponse, link: &AttachmentLink) -> String {
    let name = resp
        .content_disposition
        .as_deref()
        .and_then(file_name_from_disposition)
        .or_else(|| (!link.label.is_empty()).then(|| link.label.clone()))
        .unwrap_or_else(|| format!("{}.pdf", link.attach_no));
    match name.rsplit_once('.') {
        Some((_, ext)) if ext.eq_ignore_ascii_case("pdf") => sanitize_file_name(&name),
        Some((stem, _)) => sanitize_file_name(&format!("{stem}.pdf")),
        None => sanitize_file_name(&format!("{name}.pdf")),
    }
}

/// Collapses time tokens a PDF extractor broke across lines
/// (`18\n:00`, `12:00\n~\n13:30`).
fn join_split_times(text: &str) -> String {
    let text = SPLIT_HOUR_RE.replace_all(text, "${1}:${2}");
    SPLIT_RANGE_RE.replace_all(&text, "${1}~${2}").into_owned()
}

/// Attendance figure and its span in `block`. A number followed by `명` wins;
/// otherwise the first number that is at least 100 or has thousands
/// separators, skipping exit numbers (`3出`).
pub fn extract_headcount(block: &str) -> Option<(u32, Range<usize>)> {
    if let Some(caps) = HEADCOUNT_UNIT_RE.captures(block) {
        let whole = caps.get(0)?;
        if let Ok(value) = caps[1].replace(',', "").parse::<u32>() {
            return Some((value, whole.range()));
        }
    }
    for m in NUMBER_RE.find_iter(block) {
        if block[m.end()..].starts_with('出') {
            continue;
        }
        let digits = m.as_str();
        let Ok(value) = digits.replace(',', "").parse::<u32>() else {
            continue;
        };
        if value >= 100 || digits.contains(',') {
            return Some((value, m.range()));
        }
    }
    None
}

fn place_nodes(text: &str) -> Vec<String> {
    let cleaned = ANNOTATION_RE.replace_all(text, " ");
    let cleaned = collapse_whitespace(&cleaned);
    ROUTE_GLYPH_RE
        .split(&cleaned)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits extracted bulletin text into one row per `H:MM ~ H:MM` slot.
pub fn parse_bulletin_text(text: &str, date: NaiveDate) -> Vec<RawEventRow> {
    let text = join_split_times(text);
    let slots: Vec<_> = TIME_SLOT_RE.captures_iter(&text).collect();
    let mut rows = Vec::with_capacity(slots.len());

    for (i, caps) in slots.iter().enumerate() {
        let (Some(whole), Some(start), Some(end)) = (caps.get(0), caps.name("start"), caps.name("end"))
        else {
            continue;
        };
        let detail_end = slots
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(text.len(), |m| m.start());
        let detail = text[whole.end()..detail_end].trim();

        let (headcount, before, after) = match extract_headcount(detail) {
            Some((value, span)) => (Some(value), &detail[..span.start], &detail[span.end..]),
            None => (None, detail, ""),
        };

        let before = before.trim();
        let annotations = ANNOTATION_RE
            .captures_iter(before)
            .map(|c| c[1].trim().to_string())
            .collect::<Vec<_>>()
            .join(" ");

        let mut nodes = place_nodes(before);
        if nodes.is_empty() {
            nodes = place_nodes(detail);
        }
        if nodes.is_empty() {
            warn!(start = start.as_str(), "bulletin slot without a place, dropped");
            continue;
        }

        let remark_raw = [after.trim(), annotations.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let remark = collapse_hangul_gaps(&collapse_whitespace(&remark_raw));

        rows.push(RawEventRow {
            source: EventSource::PrimaryBoard,
            date,
            start_time: strip_whitespace(start.as_str()),
            end_time: strip_whitespace(end.as_str()),
            place_tokens: nodes,
            headcount,
            remark: (!remark.is_empty()).then_some(remark),
            coordinates: None,
        });
    }
    rows
}

/// Daily PDF bulletin on the metropolitan police notice board.
#[derive(Debug, Clone)]
pub struct SmpaBulletinAdapter {
    base_url: String,
    list_url: String,
}

impl Default for SmpaBulletinAdapter {
    fn default() -> Self {
        Self::new(SMPA_BASE_URL, SMPA_LIST_URL)
    }
}

impl SmpaBulletinAdapter {
    pub fn new(base_url: impl Into<String>, list_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            list_url: list_url.into(),
        }
    }

    async fn find_view_page(
        &self,
        http: &HttpFetcher,
        post: &BoardPost,
    ) -> Result<(String, String), AdapterError> {
        for url in post.view_urls(&self.base_url) {
            match http.get("smpa_view", &url).await {
                Ok(resp) if resp.is_html() => return Ok((url, resp.text())),
                Ok(resp) => debug!(%url, content_type = ?resp.content_type, "view candidate not html"),
                Err(err) => debug!(%url, error = %err, "view candidate failed"),
            }
        }
        Err(AdapterError::Message(format!(
            "no view page responded for post {}",
            post.post_no
        )))
    }

    async fn download_pdf(
        &self,
        http: &HttpFetcher,
        view_url: &str,
        links: &[AttachmentLink],
    ) -> Result<(Vec<u8>, String), AdapterError> {
        for link in links {
            let resp = match http
                .fetch("smpa_attachment", |client| attachment_request(client, link, view_url))
                .await
            {
                Ok(resp) => resp,
                Err(err) => {
                    warn!(url = %link.url, attach_no = %link.attach_no, error = %err, "attachment download failed");
                    continue;
                }
            };
            let bytes = match AttachmentPayload::from_response(&resp).into_bytes() {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(attach_no = %link.attach_no, error = %err, "attachment payload unreadable");
                    continue;
                }
            };
            if is_pdf(&resp, &bytes) {
                return Ok((bytes, attachment_file_name(&resp, link)));
            }
            debug!(attach_no = %link.attach_no, "attachment is not a PDF");
        }
        Err(AdapterError::AttachmentNotFound(view_url.to_string()))
    }
}

#[async_trait]
impl SourceAdapter for SmpaBulletinAdapter {
    fn source(&self) -> EventSource {
        EventSource::PrimaryBoard
    }

    async fn fetch(
        &self,
        http: &HttpFetcher,
        ctx: &AdapterContext,
    ) -> Result<Option<FetchedDocument>, AdapterError> {
        let today = ctx.local_date();
        let list = http.get("smpa_list", &self.list_url).await?;
        let posts = list_posts(&list.text());
        let post = find_post_for_date(&posts, today)
            .ok_or(AdapterError::BulletinNotFound(today))?
            .clone();
        info!(post_no = %post.post_no, title = %post.title, "bulletin post found");

        let (view_url, view_html) = self.find_view_page(http, &post).await?;
        let links = attachment_links(&view_html, &self.base_url);
        if links.is_empty() {
            return Err(AdapterError::AttachmentNotFound(view_url));
        }
        let (bytes, file_name) = self.download_pdf(http, &view_url, &links).await?;

        let artifact = ctx
            .artifacts
            .store_attachment(ctx.fetched_at, self.source().as_str(), &file_name, &bytes)
            .await?;
        info!(
            path = %artifact.relative_path.display(),
            bytes = artifact.byte_size,
            deduplicated = artifact.deduplicated,
            "bulletin stored"
        );

        Ok(Some(FetchedDocument {
            source: self.source(),
            date: post.title_date().unwrap_or(today),
            title: post.title,
            url: view_url,
            body: DocumentBody::Pdf(bytes),
            artifact: Some(artifact),
        }))
    }

    fn parse(&self, doc: &FetchedDocument) -> Result<Vec<RawEventRow>, AdapterError> {
        let text = match &doc.body {
            DocumentBody::Pdf(bytes) => pdf_text(bytes)?,
            DocumentBody::Text(text) => text.clone(),
            DocumentBody::Html(_) => {
                return Err(AdapterError::Parse(
                    "bulletin adapter expects a PDF document".to_string(),
                ))
            }
        };
        let rows = parse_bulletin_text(&text, doc.date);
        info!(rows = rows.len(), date = %doc.date, "bulletin parsed");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use serde::{Deserialize, Serialize};

    use super::*;

    fn workspace_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../..")
            .canonicalize()
            .expect("workspace root")
    }

    fn fixture(name: &str) -> String {
        fs::read_to_string(workspace_root().join("fixtures").join("smpa").join(name))
            .expect("read fixture")
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct GoldenRow {
        start_time: String,
        end_time: String,
        place_tokens: Vec<String>,
        headcount: Option<u32>,
        remark: Option<String>,
    }

    fn to_golden(rows: &[RawEventRow]) -> Vec<GoldenRow> {
        rows.iter()
            .map(|r| GoldenRow {
                start_time: r.start_time.clone(),
                end_time: r.end_time.clone(),
                place_tokens: r.place_tokens.clone(),
                headcount: r.headcount,
                remark: r.remark.clone(),
            })
            .collect()
    }

    #[test]
    fn single_slot_with_route_and_headcount() {
        let rows = parse_bulletin_text("09:00~18:00 광화문→시청 500명", day(2025, 8, 15));
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.start_time, "09:00");
        assert_eq!(row.end_time, "18:00");
        assert_eq!(row.place_tokens, vec!["광화문".to_string(), "시청".to_string()]);
        assert_eq!(row.headcount, Some(500));
        assert_eq!(row.remark, None);
        assert_eq!(row.source, EventSource::PrimaryBoard);
    }

    #[test]
    fn every_time_range_starts_a_new_slot() {
        let text = "주요 집회 일정\n07:30 ~ 09:00 서울역 1,200명 행진 후 해산\n\
                    10:00~12:00 여의도공원 <국회 방면> 300명\n14:00~ 16:30 대한문";
        let rows = parse_bulletin_text(text, day(2025, 8, 15));
        let spans: Vec<_> = rows
            .iter()
            .map(|r| (r.start_time.as_str(), r.end_time.as_str()))
            .collect();
        assert_eq!(spans, vec![("07:30", "09:00"), ("10:00", "12:00"), ("14:00", "16:30")]);
        assert_eq!(rows[0].headcount, Some(1200));
        assert_eq!(rows[0].remark.as_deref(), Some("행진 후 해산"));
        assert_eq!(rows[1].place_tokens, vec!["여의도공원".to_string()]);
        assert_eq!(rows[1].remark.as_deref(), Some("국회 방면"));
        assert_eq!(rows[2].headcount, None);
        assert_eq!(rows[2].place_tokens, vec!["대한문".to_string()]);
    }

    #[test]
    fn times_split_across_lines_are_rejoined() {
        let rows = parse_bulletin_text("12\n:00\n~\n13:30 세종로공원 200명", day(2025, 8, 15));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].start_time, "12:00");
        assert_eq!(rows[0].end_time, "13:30");
    }

    #[test]
    fn headcount_prefers_unit_and_skips_exit_numbers() {
        assert_eq!(extract_headcount("서울역 12出 앞 1,500 명").map(|h| h.0), Some(1500));
        assert_eq!(extract_headcount("삼각지역 110出 앞 250 기타").map(|h| h.0), Some(250));
        assert_eq!(extract_headcount("광화문 50 소규모"), None);
        assert_eq!(extract_headcount("시청 1500명").map(|h| h.0), Some(1500));
    }

    #[test]
    fn slot_without_place_before_headcount_uses_whole_detail() {
        let rows = parse_bulletin_text("09:00~10:00 300명 청계광장", day(2025, 8, 15));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].place_tokens, vec!["300명 청계광장".to_string()]);
        assert_eq!(rows[0].remark.as_deref(), Some("청계광장"));
    }

    #[test]
    fn golden_snapshot_for_sample_bulletin() {
        let text = fixture("bulletin.txt");
        let rows = parse_bulletin_text(&text, day(2025, 8, 15));
        let expected: Vec<GoldenRow> =
            serde_json::from_str(&fixture("bulletin_snapshot.json")).expect("parse snapshot");
        assert_eq!(to_golden(&rows), expected);
    }

    #[test]
    fn today_post_is_found_in_list_page() {
        let posts = list_posts(&fixture("list.html"));
        assert_eq!(posts.len(), 3);
        let post = find_post_for_date(&posts, day(2025, 8, 15)).unwrap();
        assert_eq!(post.post_no, "281734");
        assert_eq!(post.board_type, "B0000038");
        assert_eq!(post.title_date(), Some(day(2025, 8, 15)));
        assert!(find_post_for_date(&posts, day(2025, 8, 20)).is_none());
        assert_eq!(
            post.view_urls(SMPA_BASE_URL)[1],
            "https://www.smpa.go.kr/user/nd54882.do?dmlType=View&boardNo=281734"
        );
    }

    #[test]
    fn pdf_labelled_attachments_are_preferred() {
        let links = attachment_links(&fixture("view.html"), SMPA_BASE_URL);
        assert_eq!(links.len(), 1);
        assert_eq!(
            links[0].url,
            "https://www.smpa.go.kr/common/attachfile/attachfileDownload.do"
        );
        assert_eq!(links[0].attach_no, "70211");
    }

    #[test]
    fn disposition_file_names() {
        assert_eq!(
            file_name_from_disposition("attachment; filename*=UTF-8''%EC%A7%91%ED%9A%8C.pdf").as_deref(),
            Some("집회.pdf")
        );
        assert_eq!(
            file_name_from_disposition(r#"attachment; filename="250815.pdf""#).as_deref(),
            Some("250815.pdf")
        );
        assert_eq!(
            file_name_from_disposition("attachment; filename*=utf-8''250815%20%EC%A7%91%ED%9A%8C.pdf")
                .as_deref(),
            Some("250815 집회.pdf")
        );
        assert_eq!(file_name_from_disposition("inline"), None);
    }

    #[test]
    fn attachment_downloads_carry_the_view_page_as_referer() {
        let link = AttachmentLink {
            url: "https://www.smpa.go.kr/common/attachfile/attachfileDownload.do".into(),
            attach_no: "70211".into(),
            label: "250815(금) 집회일정.pdf".into(),
        };
        let view_url = "https://www.smpa.go.kr/user/nd54882.do?dmlType=View&boardNo=281734";
        let request = attachment_request(&reqwest::Client::new(), &link, view_url)
            .build()
            .unwrap();
        assert_eq!(request.headers().get(REFERER).unwrap(), view_url);
        assert_eq!(request.url().query(), Some("attachNo=70211"));
    }

    #[test]
    fn text_documents_parse_without_pdf_extraction() {
        let doc = FetchedDocument {
            source: EventSource::PrimaryBoard,
            date: day(2025, 8, 15),
            title: "오늘의 집회 250815 금".into(),
            url: "https://www.smpa.go.kr/user/nd54882.do?View&boardNo=281734".into(),
            body: DocumentBody::Text("09:00~18:00 광화문→시청 500명".into()),
            artifact: None,
        };
        let rows = SmpaBulletinAdapter::default().parse(&doc).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, day(2025, 8, 15));
    }
}
