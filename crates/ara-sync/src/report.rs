use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ara_core::EventSource;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs;
use uuid::Uuid;

use crate::SyncOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    /// Completed with a failed source, rejected rows or a cut-short geocoding phase.
    Warning,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: EventSource,
    pub rows: usize,
    pub document_url: Option<String>,
    pub document_title: Option<String>,
    pub error: Option<String>,
}

impl SourceReport {
    pub fn new(source: EventSource) -> Self {
        Self {
            source,
            rows: 0,
            document_url: None,
            document_title: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncRunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    pub sources: Vec<SourceReport>,
    pub merged_rows: usize,
    pub built_events: usize,
    pub geocode_fallbacks: usize,
    pub deadline_reached: bool,
    pub outcome: SyncOutcome,
    pub reports_dir: String,
}

pub fn run_report_dir(root: &Path, run_id: Uuid) -> PathBuf {
    root.join(run_id.to_string())
}

pub fn render_daily_brief(summary: &SyncRunSummary) -> String {
    let sources = summary
        .sources
        .iter()
        .map(|s| match &s.error {
            Some(err) => format!("- {}: {} rows (error: {err})", s.source, s.rows),
            None => format!("- {}: {} rows", s.source, s.rows),
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "# Assembly Brief\n\n- Run ID: `{}`\n- Started: {}\n- Finished: {}\n- Status: {}\n- Merged rows: {}\n- Events built: {} ({} on fallback coordinates)\n- Inserted: {}\n- Duplicates: {}\n- Failed: {}\n\n## Sources\n{}\n",
        summary.run_id,
        summary.started_at,
        summary.finished_at,
        summary.status.as_str(),
        summary.merged_rows,
        summary.built_events,
        summary.geocode_fallbacks,
        summary.outcome.inserted,
        summary.outcome.duplicates,
        summary.outcome.failed,
        sources,
    )
}

/// Writes `run_summary.json` and `daily_brief.md` into `dir`.
pub async fn write_run_report(dir: &Path, summary: &SyncRunSummary) -> Result<()> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating {}", dir.display()))?;

    let json = serde_json::to_vec_pretty(summary).context("serializing run summary")?;
    fs::write(dir.join("run_summary.json"), json)
        .await
        .context("writing run_summary.json")?;
    fs::write(dir.join("daily_brief.md"), render_daily_brief(summary))
        .await
        .context("writing daily_brief.md")?;
    Ok(())
}
