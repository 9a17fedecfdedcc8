use std::sync::Arc;

use anyhow::Result;
use ara_adapters::{
    AdapterContext, ListRenderer, NoRenderer, SmpaBulletinAdapter, SourceAdapter,
    SpaticTableAdapter, SMPA_BASE_URL, SPATIC_BASE_URL,
};
use ara_core::{NewEvent, RawEventRow};
use ara_geo::{GeoResolver, KakaoLocalSearch, LocationOrigin, PlaceSearch};
use ara_storage::{ArtifactStore, HttpFetcher};
use chrono::Utc;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::build::EventBuilder;
use crate::merge::merge;
use crate::report::{run_report_dir, write_run_report, RunStatus, SourceReport, SyncRunSummary};
use crate::{EventRepository, SyncConfig, SyncError};

/// Places geocoded at once; each place still walks its candidates in order.
const GEOCODE_CONCURRENCY: usize = 4;

#[cfg(feature = "webdriver")]
fn list_renderer(config: &SyncConfig) -> Arc<dyn ListRenderer> {
    match &config.webdriver_url {
        Some(url) => Arc::new(ara_adapters::WebDriverRenderer::new(url.clone())),
        None => Arc::new(NoRenderer),
    }
}

#[cfg(not(feature = "webdriver"))]
fn list_renderer(config: &SyncConfig) -> Arc<dyn ListRenderer> {
    if config.webdriver_url.is_some() {
        warn!("ARA_WEBDRIVER_URL is set but this build lacks the webdriver feature");
    }
    Arc::new(NoRenderer)
}

/// Sources in priority order: the bulletin wins merge conflicts.
pub fn default_adapters(config: &SyncConfig) -> Vec<Arc<dyn SourceAdapter>> {
    let bulletin = SmpaBulletinAdapter::new(SMPA_BASE_URL, config.smpa_list_url.clone());
    let table = SpaticTableAdapter::new(list_renderer(config))
        .with_urls(SPATIC_BASE_URL, config.spatic_list_url.clone());
    vec![Arc::new(bulletin), Arc::new(table)]
}

pub struct SyncPipeline {
    config: SyncConfig,
    http: HttpFetcher,
    artifacts: ArtifactStore,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    resolver: GeoResolver,
    builder: EventBuilder,
    repository: EventRepository,
}

impl SyncPipeline {
    pub fn new(config: SyncConfig, repository: EventRepository) -> Result<Self> {
        let http = HttpFetcher::new(config.http_client_config())?;
        let artifacts = ArtifactStore::new(config.artifacts_dir.clone());
        let search: Arc<dyn PlaceSearch> = Arc::new(KakaoLocalSearch::new(
            http.clone(),
            config.kakao_api_key.clone(),
        ));
        let resolver = GeoResolver::new(search, config.resolver_config());
        let adapters = default_adapters(&config);
        let builder = EventBuilder::new(config.home_district.clone());
        Ok(Self {
            config,
            http,
            artifacts,
            adapters,
            resolver,
            builder,
            repository,
        })
    }

    pub fn with_adapters(mut self, adapters: Vec<Arc<dyn SourceAdapter>>) -> Self {
        self.adapters = adapters;
        self
    }

    pub fn with_place_search(mut self, search: Arc<dyn PlaceSearch>) -> Self {
        self.resolver = GeoResolver::new(search, self.config.resolver_config());
        self
    }

    pub fn repository(&self) -> &EventRepository {
        &self.repository
    }

    pub async fn run_once(&self) -> Result<SyncRunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("sync_run", %run_id);
        self.run(run_id).instrument(span).await
    }

    async fn run(&self, run_id: Uuid) -> Result<SyncRunSummary> {
        let started_at = Utc::now();
        let ctx = AdapterContext::new(run_id, started_at, self.artifacts.clone());

        let collected = join_all(
            self.adapters
                .iter()
                .map(|adapter| self.collect_source(Arc::clone(adapter), &ctx)),
        )
        .await;
        let (sources, per_source): (Vec<SourceReport>, Vec<Vec<RawEventRow>>) =
            collected.into_iter().unzip();

        let merged = merge(&per_source);
        info!(
            sources = sources.len(),
            raw_rows = per_source.iter().map(Vec::len).sum::<usize>(),
            merged_rows = merged.len(),
            "sources merged"
        );
        if merged.is_empty() {
            warn!("no rows from any source");
            return Err(SyncError::NoEvents.into());
        }

        let deadline = Instant::now() + self.config.run_timeout();
        let (events, geocode_fallbacks, deadline_reached) = self.build_events(&merged, deadline).await;
        if events.is_empty() {
            return Err(SyncError::Timeout(self.config.run_timeout()).into());
        }

        let outcome = self.repository.sync_events(&events).await?;

        let degraded = deadline_reached
            || outcome.failed > 0
            || sources.iter().any(|s| s.error.is_some());
        let status = if degraded {
            RunStatus::Warning
        } else {
            RunStatus::Success
        };

        let reports_dir = run_report_dir(&self.config.reports_dir, run_id);
        let summary = SyncRunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            status,
            sources,
            merged_rows: merged.len(),
            built_events: events.len(),
            geocode_fallbacks,
            deadline_reached,
            outcome,
            reports_dir: reports_dir.display().to_string(),
        };
        write_run_report(&reports_dir, &summary).await?;
        info!(
            status = status.as_str(),
            inserted = outcome.inserted,
            duplicates = outcome.duplicates,
            failed = outcome.failed,
            "sync run finished"
        );
        Ok(summary)
    }

    /// Fetches and parses one source. Failures are reported, never raised,
    /// so one broken source cannot sink the other.
    async fn collect_source(
        &self,
        adapter: Arc<dyn SourceAdapter>,
        ctx: &AdapterContext,
    ) -> (SourceReport, Vec<RawEventRow>) {
        let source = adapter.source();
        let mut report = SourceReport::new(source);

        let doc = match adapter.fetch(&self.http, ctx).await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                info!(%source, "source has nothing for this run");
                return (report, Vec::new());
            }
            Err(err) => {
                warn!(%source, error = %err, "source fetch failed");
                report.error = Some(err.to_string());
                return (report, Vec::new());
            }
        };
        report.document_url = Some(doc.url.clone());
        report.document_title = Some(doc.title.clone());
        let artifact = doc.artifact.clone();

        // PDF extraction is CPU-bound and may panic on malformed input.
        let parser = Arc::clone(&adapter);
        let parsed = tokio::task::spawn_blocking(move || parser.parse(&doc)).await;

        if let Some(artifact) = artifact.filter(|_| !self.config.keep_artifacts) {
            if let Err(err) = self.artifacts.discard(&artifact).await {
                warn!(%source, error = %err, "discarding bulletin failed");
            }
        }

        let rows = match parsed {
            Ok(Ok(rows)) => rows,
            Ok(Err(err)) => {
                warn!(%source, error = %err, "source parse failed");
                report.error = Some(err.to_string());
                Vec::new()
            }
            Err(err) => {
                warn!(%source, error = %err, "source parser aborted");
                report.error = Some(format!("parser aborted: {err}"));
                Vec::new()
            }
        };
        report.rows = rows.len();
        info!(%source, rows = rows.len(), "source parsed");
        (report, rows)
    }

    /// Geocodes merged rows into events until done or `deadline`; rows not
    /// reached by then are skipped.
    async fn build_events(
        &self,
        merged: &[RawEventRow],
        deadline: Instant,
    ) -> (Vec<NewEvent>, usize, bool) {
        let mut located = stream::iter(merged)
            .map(|row| async move {
                let place = self
                    .resolver
                    .locate(row.primary_place(), row.embedded_point())
                    .await;
                (row, place)
            })
            .buffered(GEOCODE_CONCURRENCY);

        let mut events = Vec::with_capacity(merged.len());
        let mut fallbacks = 0usize;
        loop {
            let next = if Instant::now() >= deadline {
                Err(())
            } else {
                tokio::time::timeout_at(deadline, located.next())
                    .await
                    .map_err(|_| ())
            };
            match next {
                Ok(Some((row, place))) => {
                    if place.origin == LocationOrigin::Fallback {
                        fallbacks += 1;
                    }
                    events.push(self.builder.build(row, place.point));
                }
                Ok(None) => return (events, fallbacks, false),
                Err(()) => {
                    warn!(
                        built = events.len(),
                        skipped = merged.len() - events.len(),
                        "run deadline reached, skipping remaining rows"
                    );
                    return (events, fallbacks, true);
                }
            }
        }
    }
}

/// Connects, migrates and runs one sync with settings from the environment.
pub async fn run_sync_once_from_env() -> Result<SyncRunSummary> {
    let config = SyncConfig::from_env();
    let repository = EventRepository::connect(&config.database_url).await?;
    repository.migrate().await?;
    let pipeline = SyncPipeline::new(config, repository)?;
    pipeline.run_once().await
}
