use std::str::FromStr;

use ara_core::{Event, EventStatus, NewEvent, DEFAULT_SEVERITY};
use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::{debug, error, info};

use crate::SyncError;

/// Storage format for every timestamp column; sorts lexically.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn database_error(err: sqlx::Error) -> SyncError {
    SyncError::Database(err.to_string())
}

fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(column: &str, value: &str) -> Result<NaiveDateTime, SyncError> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT)
        .map_err(|err| SyncError::Database(format!("column {column} holds {value:?}: {err}")))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub inserted: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// Event store. Inserts and the end-of-life update are the only writes.
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: SqlitePool,
}

impl EventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, SyncError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(database_error)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(database_error)?;
        Ok(Self::new(pool))
    }

    /// Private in-memory database on a single long-lived connection.
    pub async fn in_memory() -> Result<Self, SyncError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(database_error)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies the embedded migrations; returns how many the crate ships.
    pub async fn migrate(&self) -> Result<usize, SyncError> {
        let migrator = sqlx::migrate!("./migrations");
        migrator
            .run(&self.pool)
            .await
            .map_err(|err| SyncError::Migration(err.to_string()))?;
        info!(migrations = migrator.migrations.len(), "database migrations applied");
        Ok(migrator.migrations.len())
    }

    /// Inserts every event not already stored for the same day, in one
    /// transaction. A failing row is counted and skipped; only a failure to
    /// open or commit the transaction discards the batch.
    pub async fn sync_events(&self, events: &[NewEvent]) -> Result<SyncOutcome, SyncError> {
        let mut outcome = SyncOutcome::default();
        if events.is_empty() {
            return Ok(outcome);
        }

        let now = format_timestamp(Utc::now().naive_utc());
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        for (index, event) in events.iter().enumerate() {
            match sync_one(&mut tx, event, &now).await {
                Ok(Some(id)) => {
                    outcome.inserted += 1;
                    debug!(id, title = %event.title, "event inserted");
                }
                Ok(None) => {
                    outcome.duplicates += 1;
                    debug!(title = %event.title, "duplicate event skipped");
                }
                Err(err) => {
                    outcome.failed += 1;
                    error!(row = index + 1, title = %event.title, error = %err, "event insert failed");
                }
            }
        }

        if let Err(err) = tx.commit().await {
            error!(error = %err, "event transaction failed, rolled back");
            return Err(database_error(err));
        }
        info!(
            inserted = outcome.inserted,
            duplicates = outcome.duplicates,
            failed = outcome.failed,
            "event transaction committed"
        );
        Ok(outcome)
    }

    /// Active events starting after `now`, soonest first.
    pub async fn upcoming_events(&self, now: NaiveDateTime) -> Result<Vec<Event>, SyncError> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, description, location_name, location_address, latitude, longitude,
                   start_date, end_date, category, severity_level, status, created_at, updated_at
            FROM events
            WHERE status = 'active' AND start_date > ?
            ORDER BY start_date ASC, id ASC
            "#,
        )
        .bind(format_timestamp(now))
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        rows.iter().map(event_from_row).collect()
    }

    /// Marks active events as ended once both their start and their end lie
    /// before `cutoff`. An end clamped to 09:00 can precede the start.
    pub async fn mark_ended_before(&self, cutoff: NaiveDateTime) -> Result<u64, SyncError> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET status = 'ended', updated_at = ?
            WHERE status = 'active' AND MAX(start_date, end_date) < ?
            "#,
        )
        .bind(format_timestamp(Utc::now().naive_utc()))
        .bind(format_timestamp(cutoff))
        .execute(&self.pool)
        .await
        .map_err(database_error)?;
        Ok(result.rows_affected())
    }

    pub async fn count_events(&self) -> Result<i64, SyncError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await
            .map_err(database_error)
    }
}

/// `Some(id)` for an insert, `None` when an event with the same place or
/// title already exists on that day.
async fn sync_one(
    tx: &mut Transaction<'_, Sqlite>,
    event: &NewEvent,
    now: &str,
) -> Result<Option<i64>, sqlx::Error> {
    let start_date = format_timestamp(event.start_date);

    let existing: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT id FROM events
        WHERE (location_name = ? AND DATE(start_date) = DATE(?))
           OR (title = ? AND DATE(start_date) = DATE(?))
        LIMIT 1
        "#,
    )
    .bind(&event.location_name)
    .bind(&start_date)
    .bind(&event.title)
    .bind(&start_date)
    .fetch_optional(&mut **tx)
    .await?;
    if existing.is_some() {
        return Ok(None);
    }

    let result = sqlx::query(
        r#"
        INSERT INTO events
            (title, description, location_name, location_address, latitude, longitude,
             start_date, end_date, category, severity_level, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&event.title)
    .bind(&event.description)
    .bind(&event.location_name)
    .bind(&event.location_address)
    .bind(event.latitude)
    .bind(event.longitude)
    .bind(&start_date)
    .bind(format_timestamp(event.end_date))
    .bind(&event.category)
    .bind(i64::from(event.severity_level))
    .bind(event.status.as_str())
    .bind(now)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(Some(result.last_insert_rowid()))
}

fn event_from_row(row: &SqliteRow) -> Result<Event, SyncError> {
    let text = |column: &str| -> Result<String, SyncError> {
        row.try_get::<String, _>(column).map_err(database_error)
    };
    let optional_text = |column: &str| -> Result<Option<String>, SyncError> {
        row.try_get::<Option<String>, _>(column).map_err(database_error)
    };

    let start_date = parse_timestamp("start_date", &text("start_date")?)?;
    let end_date = parse_timestamp("end_date", &text("end_date")?)?;
    let status = EventStatus::from_str(&text("status")?).map_err(SyncError::Database)?;
    let severity: i64 = row.try_get("severity_level").map_err(database_error)?;

    Ok(Event {
        id: row.try_get("id").map_err(database_error)?,
        title: text("title")?,
        description: optional_text("description")?,
        location_name: text("location_name")?,
        location_address: optional_text("location_address")?,
        latitude: row.try_get("latitude").map_err(database_error)?,
        longitude: row.try_get("longitude").map_err(database_error)?,
        start_date,
        end_date,
        category: optional_text("category")?,
        severity_level: u8::try_from(severity).unwrap_or(DEFAULT_SEVERITY),
        status,
        created_at: parse_timestamp("created_at", &text("created_at")?)?.and_utc(),
        updated_at: parse_timestamp("updated_at", &text("updated_at")?)?.and_utc(),
    })
}
