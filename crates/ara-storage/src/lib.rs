//! HTTP fetching with a uniform retry policy, plus on-disk storage for downloaded bulletins.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::StatusCode;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

pub const CRATE_NAME: &str = "ara-storage";

#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub content_hash: String,
    pub file_name: String,
    pub relative_path: PathBuf,
    pub absolute_path: PathBuf,
    pub byte_size: usize,
    pub deduplicated: bool,
}

/// Hash-addressed store for downloaded attachments.
///
/// Writes go to a temp file in the target directory and are renamed into
/// place, so a crashed run never leaves a truncated document behind.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sha256_hex(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    fn relative_path_for(
        fetched_at: DateTime<Utc>,
        source_id: &str,
        content_hash: &str,
        extension: &str,
    ) -> PathBuf {
        PathBuf::from(fetched_at.format("%Y%m%d").to_string())
            .join(source_id)
            .join(format!("{content_hash}.{extension}"))
    }

    /// Stores an attachment under `<yyyymmdd>/<source>/<sha256>.<ext>`, where
    /// the extension is taken from the sanitized `file_name`.
    pub async fn store_attachment(
        &self,
        fetched_at: DateTime<Utc>,
        source_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> anyhow::Result<StoredArtifact> {
        let file_name = sanitize_file_name(file_name);
        let extension = Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .unwrap_or("bin")
            .to_ascii_lowercase();
        let content_hash = Self::sha256_hex(bytes);
        let relative_path = Self::relative_path_for(fetched_at, source_id, &content_hash, &extension);
        let absolute_path = self.root.join(&relative_path);
        let parent = absolute_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());

        fs::create_dir_all(&parent)
            .await
            .with_context(|| format!("creating artifact directory {}", parent.display()))?;

        let stored = |deduplicated| StoredArtifact {
            content_hash: content_hash.clone(),
            file_name: file_name.clone(),
            relative_path: relative_path.clone(),
            absolute_path: absolute_path.clone(),
            byte_size: bytes.len(),
            deduplicated,
        };

        if fs::try_exists(&absolute_path)
            .await
            .with_context(|| format!("checking artifact path {}", absolute_path.display()))?
        {
            return Ok(stored(true));
        }

        let temp_path = parent.join(format!(".{}.part", Uuid::new_v4()));
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await
            .with_context(|| format!("opening temp artifact {}", temp_path.display()))?;
        file.write_all(bytes)
            .await
            .with_context(|| format!("writing temp artifact {}", temp_path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("flushing temp artifact {}", temp_path.display()))?;
        drop(file);

        match fs::rename(&temp_path, &absolute_path).await {
            Ok(()) => Ok(stored(false)),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                let _ = fs::remove_file(&temp_path).await;
                Ok(stored(true))
            }
            Err(err) => {
                let _ = fs::remove_file(&temp_path).await;
                Err(err).with_context(|| {
                    format!(
                        "renaming {} -> {}",
                        temp_path.display(),
                        absolute_path.display()
                    )
                })
            }
        }
    }

    /// Removes a stored artifact once it has been parsed.
    pub async fn discard(&self, artifact: &StoredArtifact) -> anyhow::Result<()> {
        match fs::remove_file(&artifact.absolute_path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("removing {}", artifact.absolute_path.display())),
        }
    }
}

/// Replaces characters that are not allowed in file names on common platforms.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        "attachment.bin".to_string()
    } else {
        cleaned
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retryable,
    NonRetryable,
}

pub fn classify_status(status: StatusCode) -> RetryDisposition {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

pub fn classify_reqwest_error(err: &reqwest::Error) -> RetryDisposition {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

/// Errors that know whether another attempt could help.
pub trait Retryable {
    fn disposition(&self) -> RetryDisposition;
}

/// Bounded retry with linearly growing delay: attempt `n` failing waits
/// `n * base_delay` before attempt `n + 1`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn delay_after_attempt(&self, attempt: usize) -> Duration {
        self.base_delay
            .saturating_mul(u32::try_from(attempt).unwrap_or(u32::MAX))
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are exhausted. `op` receives the 1-based attempt number.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err)
                if attempt < max_attempts
                    && err.disposition() == RetryDisposition::Retryable =>
            {
                let delay = policy.delay_after_attempt(attempt);
                warn!(label, attempt, ?delay, error = %err, "transient failure, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
    pub global_concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: None,
            accept_language: Some("ko-KR,ko;q=0.9,en;q=0.8".to_string()),
            global_concurrency: 8,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: StatusCode,
    pub final_url: String,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("html"))
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("http client shut down")]
    Closed,
}

impl Retryable for FetchError {
    fn disposition(&self) -> RetryDisposition {
        match self {
            FetchError::Request(err) => classify_reqwest_error(err),
            FetchError::HttpStatus { status, .. } => StatusCode::from_u16(*status)
                .map(classify_status)
                .unwrap_or(RetryDisposition::NonRetryable),
            FetchError::Closed => RetryDisposition::NonRetryable,
        }
    }
}

/// Shared HTTP client. Every call goes through the same retry policy and a
/// global concurrency cap.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    global_limit: Arc<Semaphore>,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        if let Some(lang) = &config.accept_language {
            headers.insert(
                ACCEPT_LANGUAGE,
                HeaderValue::from_str(lang).context("invalid Accept-Language header")?,
            );
        }

        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout)
            .default_headers(headers);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        Ok(Self {
            client: builder.build().context("building reqwest client")?,
            global_limit: Arc::new(Semaphore::new(config.global_concurrency.max(1))),
            retry: config.retry,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Plain GET with the shared retry policy.
    pub async fn get(&self, label: &str, url: &str) -> Result<FetchedResponse, FetchError> {
        self.fetch(label, |client| client.get(url)).await
    }

    /// Sends the request produced by `build`, rebuilding it for each attempt.
    pub async fn fetch<F>(&self, label: &str, build: F) -> Result<FetchedResponse, FetchError>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let _permit = self
            .global_limit
            .acquire()
            .await
            .map_err(|_| FetchError::Closed)?;
        let span = info_span!("http_fetch", label);
        with_retry(&self.retry, label, |_| self.send_once(&build))
            .instrument(span)
            .await
    }

    async fn send_once<F>(&self, build: &F) -> Result<FetchedResponse, FetchError>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let resp = build(&self.client).send().await?;
        let status = resp.status();
        let final_url = resp.url().to_string();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: final_url,
            });
        }
        let header = |name: reqwest::header::HeaderName| {
            resp.headers()
                .get(name)
                .and_then(|v: &HeaderValue| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let content_disposition = header(CONTENT_DISPOSITION);
        let body = resp.bytes().await?.to_vec();
        debug!(%status, url = %final_url, bytes = body.len(), "fetched");
        Ok(FetchedResponse {
            status,
            final_url,
            content_type,
            content_disposition,
            body,
        })
    }
}
