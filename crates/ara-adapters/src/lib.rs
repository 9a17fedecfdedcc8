//! Source adapter contracts and the two assembly-schedule sources.

mod bulletin;
mod render;
mod table;
mod text;

use ara_core::{EventSource, RawEventRow};
use ara_storage::{ArtifactStore, FetchError, FetchedResponse, HttpFetcher, StoredArtifact};
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Asia::Seoul;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use bulletin::{
    attachment_links, extract_headcount, file_name_from_disposition, find_post_for_date,
    list_posts, parse_bulletin_text, AttachmentLink, BoardPost, SmpaBulletinAdapter,
    SMPA_BASE_URL, SMPA_LIST_URL,
};
pub use render::{ListRenderer, NoRenderer};
#[cfg(feature = "webdriver")]
pub use render::WebDriverRenderer;
pub use table::{
    is_assembly_title, list_rows, parse_detail_groups, parse_list_date, parse_time_range, select_latest,
    split_places, ListRow, SpaticTableAdapter, TimeGroup, SPATIC_BASE_URL, SPATIC_LIST_URL,
};
pub use text::collapse_hangul_gaps;

pub const CRATE_NAME: &str = "ara-adapters";

#[derive(Debug, Clone)]
pub struct AdapterContext {
    pub run_id: Uuid,
    pub fetched_at: DateTime<Utc>,
    pub artifacts: ArtifactStore,
}

impl AdapterContext {
    pub fn new(run_id: Uuid, fetched_at: DateTime<Utc>, artifacts: ArtifactStore) -> Self {
        Self {
            run_id,
            fetched_at,
            artifacts,
        }
    }

    /// Calendar date of the run in Korea Standard Time.
    pub fn local_date(&self) -> NaiveDate {
        self.fetched_at.with_timezone(&Seoul).date_naive()
    }
}

/// Document body as handed from `fetch` to `parse`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DocumentBody {
    Pdf(Vec<u8>),
    /// Already-extracted bulletin text.
    Text(String),
    Html(String),
}

#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub source: EventSource,
    /// Date the document's schedule applies to.
    pub date: NaiveDate,
    pub title: String,
    pub url: String,
    pub body: DocumentBody,
    pub artifact: Option<StoredArtifact>,
}

/// Attachment download responses come either as the raw file or wrapped in a
/// JSON envelope carrying base64 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentPayload {
    Binary(Vec<u8>),
    Base64Envelope(String),
}

#[derive(Debug, Deserialize)]
struct AttachmentEnvelope {
    #[serde(default)]
    rows: Vec<AttachmentEnvelopeRow>,
}

#[derive(Debug, Deserialize)]
struct AttachmentEnvelopeRow {
    #[serde(rename = "apndFile")]
    apnd_file: Option<String>,
}

impl AttachmentPayload {
    pub fn from_response(resp: &FetchedResponse) -> Self {
        let declared_json = resp
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));
        let looks_json = resp
            .body
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|b| *b == b'{');
        if declared_json || looks_json {
            if let Ok(envelope) = serde_json::from_slice::<AttachmentEnvelope>(&resp.body) {
                if let Some(encoded) = envelope.rows.into_iter().find_map(|r| r.apnd_file) {
                    return AttachmentPayload::Base64Envelope(encoded);
                }
            }
        }
        AttachmentPayload::Binary(resp.body.clone())
    }

    pub fn into_bytes(self) -> Result<Vec<u8>, AdapterError> {
        match self {
            AttachmentPayload::Binary(bytes) => Ok(bytes),
            AttachmentPayload::Base64Envelope(encoded) => {
                let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
                base64::engine::general_purpose::STANDARD
                    .decode(compact.as_bytes())
                    .map_err(|err| AdapterError::Parse(format!("attachment base64: {err}")))
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("no bulletin post for {0}")]
    BulletinNotFound(NaiveDate),
    #[error("no downloadable PDF attachment on {0}")]
    AttachmentNotFound(String),
    #[error("list renderer unavailable: {0}")]
    RendererUnavailable(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> EventSource;

    /// Locates and downloads today's document. `Ok(None)` means the source
    /// has nothing to offer this run.
    async fn fetch(
        &self,
        http: &HttpFetcher,
        ctx: &AdapterContext,
    ) -> Result<Option<FetchedDocument>, AdapterError>;

    fn parse(&self, doc: &FetchedDocument) -> Result<Vec<RawEventRow>, AdapterError>;
}

/// Extracts the text layer of a PDF.
pub fn pdf_text(bytes: &[u8]) -> Result<String, AdapterError> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|err| AdapterError::Parse(format!("extracting PDF text: {err:?}")))
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    fn response(content_type: &str, body: &[u8]) -> FetchedResponse {
        FetchedResponse {
            status: StatusCode::OK,
            final_url: "https://www.smpa.go.kr/common/attachfile/attachfileDownload.do".into(),
            content_type: Some(content_type.into()),
            content_disposition: None,
            body: body.to_vec(),
        }
    }

    #[test]
    fn json_envelope_is_decoded_from_base64() {
        let body = br#"{"rows":[{"apndFile":"JVBERi0x\nLjQK"}]}"#;
        let payload = AttachmentPayload::from_response(&response("application/json", body));
        assert_eq!(payload, AttachmentPayload::Base64Envelope("JVBERi0x\nLjQK".into()));
        assert_eq!(payload.into_bytes().unwrap(), b"%PDF-1.4\n".to_vec());
    }

    #[test]
    fn raw_pdf_is_binary() {
        let payload =
            AttachmentPayload::from_response(&response("application/octet-stream", b"%PDF-1.7 ..."));
        assert!(matches!(payload, AttachmentPayload::Binary(ref b) if b.starts_with(b"%PDF-")));
    }

    #[test]
    fn json_without_file_falls_back_to_binary() {
        let payload = AttachmentPayload::from_response(&response("application/json", br#"{"rows":[]}"#));
        assert!(matches!(payload, AttachmentPayload::Binary(_)));
    }

    #[test]
    fn corrupt_base64_is_a_parse_error() {
        let err = AttachmentPayload::Base64Envelope("***".into()).into_bytes().unwrap_err();
        assert!(matches!(err, AdapterError::Parse(_)));
    }

    #[test]
    fn local_date_uses_korea_time() {
        let ctx = AdapterContext::new(
            Uuid::nil(),
            "2025-08-14T16:30:00Z".parse().unwrap(),
            ArtifactStore::new("/tmp/ara-test"),
        );
        assert_eq!(ctx.local_date(), NaiveDate::from_ymd_opt(2025, 8, 15).unwrap());
    }
}
