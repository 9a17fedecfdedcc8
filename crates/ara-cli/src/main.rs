use std::sync::Arc;

use anyhow::{Context, Result};
use ara_core::{GeoPoint, UserRoute};
use ara_geo::{KakaoDirections, RouteMatcher};
use ara_storage::HttpFetcher;
use ara_sync::{local_now, EventRepository, RouteChecker, SyncConfig};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "ara-cli")]
#[command(about = "Assembly route alerts: daily sync and route checks")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Collect today's assembly schedule and store new events.
    Sync,
    /// Apply database migrations.
    Migrate,
    /// List upcoming active events.
    Events,
    /// Mark events that are over as ended.
    Expire,
    /// List upcoming events near a commute.
    CheckRoute {
        /// Departure as `lat,lon`.
        #[arg(long, value_parser = parse_point)]
        from: GeoPoint,
        /// Arrival as `lat,lon`.
        #[arg(long, value_parser = parse_point)]
        to: GeoPoint,
        /// Override the configured proximity threshold.
        #[arg(long)]
        threshold_meters: Option<f64>,
    },
}

fn parse_point(value: &str) -> Result<GeoPoint, String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected `lat,lon`, got {value:?}"))?;
    let lat: f64 = lat.trim().parse().map_err(|err| format!("latitude: {err}"))?;
    let lon: f64 = lon.trim().parse().map_err(|err| format!("longitude: {err}"))?;
    Ok(GeoPoint::new(lat, lon))
}

async fn open_repository(config: &SyncConfig) -> Result<EventRepository> {
    let repository = EventRepository::connect(&config.database_url)
        .await
        .with_context(|| format!("opening {}", config.database_url))?;
    repository.migrate().await.context("running migrations")?;
    Ok(repository)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = SyncConfig::from_env();

    match cli.command.unwrap_or(Commands::Sync) {
        Commands::Sync => {
            let summary = ara_sync::run_sync_once_from_env().await?;
            println!(
                "sync complete: run_id={} status={} merged={} inserted={} duplicates={} failed={} reports={}",
                summary.run_id,
                summary.status.as_str(),
                summary.merged_rows,
                summary.outcome.inserted,
                summary.outcome.duplicates,
                summary.outcome.failed,
                summary.reports_dir
            );
        }
        Commands::Migrate => {
            let repository = EventRepository::connect(&config.database_url)
                .await
                .with_context(|| format!("opening {}", config.database_url))?;
            let count = repository.migrate().await?;
            println!("migrations applied: {count}");
        }
        Commands::Events => {
            let repository = open_repository(&config).await?;
            let events = repository.upcoming_events(local_now()).await?;
            for event in &events {
                println!(
                    "{}\t{}~{}\t{}\t({:.5}, {:.5})",
                    event.id,
                    event.start_date.format("%Y-%m-%d %H:%M"),
                    event.end_date.format("%H:%M"),
                    event.title,
                    event.latitude,
                    event.longitude
                );
            }
            println!("{} upcoming events", events.len());
        }
        Commands::Expire => {
            let repository = open_repository(&config).await?;
            let ended = repository.mark_ended_before(local_now()).await?;
            println!("marked {ended} events as ended");
        }
        Commands::CheckRoute {
            from,
            to,
            threshold_meters,
        } => {
            let repository = open_repository(&config).await?;
            let events = repository.upcoming_events(local_now()).await?;
            let http = HttpFetcher::new(config.http_client_config())?;
            let directions = KakaoDirections::new(http, config.kakao_api_key.clone());
            let matcher =
                RouteMatcher::new(threshold_meters.unwrap_or(config.route_threshold_meters));
            let checker = RouteChecker::new(Arc::new(directions), matcher);

            let route = UserRoute {
                departure: from,
                arrival: to,
            };
            let check = checker.check(route, &events).await;
            let basis = if check.used_polyline {
                "road polyline"
            } else {
                "straight line"
            };
            println!(
                "{} of {} upcoming events near route ({basis}, {} m)",
                check.events.len(),
                events.len(),
                matcher.threshold_meters
            );
            for event in &check.events {
                println!(
                    "{}\t{}\t{}",
                    event.id,
                    event.start_date.format("%Y-%m-%d %H:%M"),
                    event.title
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_parse_from_lat_lon_pairs() {
        assert_eq!(parse_point("37.5547, 126.9707").unwrap(), GeoPoint::new(37.5547, 126.9707));
        assert!(parse_point("37.5547").is_err());
        assert!(parse_point("north,126.9").is_err());
    }

    #[test]
    fn check_route_arguments_parse() {
        let cli = Cli::try_parse_from([
            "ara-cli",
            "check-route",
            "--from",
            "37.5547,126.9707",
            "--to",
            "37.5663,126.9779",
            "--threshold-meters",
            "700",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::CheckRoute {
                from,
                threshold_meters,
                ..
            }) => {
                assert_eq!(from, GeoPoint::new(37.5547, 126.9707));
                assert_eq!(threshold_meters, Some(700.0));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
