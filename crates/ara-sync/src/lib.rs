//! Daily sync: collect both sources, merge, geocode, persist, report.

mod build;
mod config;
mod merge;
mod pipeline;
mod report;
mod repository;
mod route_check;

use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use chrono_tz::Asia::Seoul;
use thiserror::Error;

pub use build::{
    default_clock, event_description, event_title, event_window, normalize_clock, EventBuilder,
    UNKNOWN_PLACE,
};
pub use config::SyncConfig;
pub use merge::{dedup_key, merge};
pub use pipeline::{default_adapters, run_sync_once_from_env, SyncPipeline};
pub use report::{
    render_daily_brief, run_report_dir, write_run_report, RunStatus, SourceReport, SyncRunSummary,
};
pub use repository::{EventRepository, SyncOutcome, TIMESTAMP_FORMAT};
pub use route_check::{RouteCheck, RouteChecker};

pub const CRATE_NAME: &str = "ara-sync";

/// Wall-clock time in Korea; event timestamps are stored in this zone.
pub fn local_now() -> NaiveDateTime {
    Utc::now().with_timezone(&Seoul).naive_local()
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no assembly rows from any source")]
    NoEvents,
    #[error("database error: {0}")]
    Database(String),
    #[error("migration failed: {0}")]
    Migration(String),
    #[error("run deadline of {0:?} reached before any event was built")]
    Timeout(Duration),
}
