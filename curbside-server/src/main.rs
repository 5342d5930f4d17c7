//! Command line and HTTP query surface for Curbside pickup schedules.

mod config;
mod error;
mod observability;
mod prefs_file;
mod routes;

use std::fs;
use std::future;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use clap::{Parser, Subcommand};
use curbside_core::{
    calendar::ServiceCalendar,
    dates::{parse_civil_date, pickup_weekday},
    memory::{MemoryNotificationCenter, MemoryPreferences},
    ports::{ClassificationPort, PreferencesStore},
    prefs::{ReminderPreferences, ReminderTiming, parse_time_of_day},
    scheduler::{NotificationScheduler, RescheduleOutcome},
    service::CurbsideService,
};
use curbside_provider_http::HttpClassificationClient;
use reqwest::Client;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, instrument};

use crate::config::Config;
use crate::prefs_file::FilePreferences;
use crate::routes::AppState;

/// Curbside: which bins go out this week, and reminders to match.
#[derive(Parser)]
#[command(name = "curbside", version, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, env = "CURBSIDE_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP query surface
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the pickup type for a YYYY-MM-DD date
    Classify {
        /// Date to classify
        date: String,
        /// Ask a running deployment instead of the local calendar
        #[arg(long)]
        remote: Option<String>,
    },
    /// Print the status of the week reported for a YYYY-MM-DD date
    Week {
        /// Any date in or just before the week
        date: String,
        /// Ask a running deployment instead of the local calendar
        #[arg(long)]
        remote: Option<String>,
    },
    /// Print the reminders a full reschedule would write
    Plan {
        /// Pickup weekday, 1 (Monday) to 5 (Friday)
        #[arg(long)]
        weekday: Option<u8>,
        /// none, evening_before or morning_of
        #[arg(long)]
        timing: Option<ReminderTiming>,
        /// Evening reminder time, HH:MM
        #[arg(long)]
        time: Option<String>,
        /// Classify against a running deployment
        #[arg(long)]
        remote: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config)?;
    config.validate().map_err(|err| anyhow!(err))?;
    observability::init(&config.logging)?;

    match cli.command {
        Command::Serve { host, port } => serve(config, host, port).await,
        Command::Classify { date, remote } => classify(&config, &date, remote).await,
        Command::Week { date, remote } => week(&config, &date, remote).await,
        Command::Plan {
            weekday,
            timing,
            time,
            remote,
        } => plan(&config, weekday, timing, time, remote).await,
    }
}

#[instrument(skip(config))]
async fn serve(config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let service = local_service(&config)?;
    let port = port.unwrap_or(config.server.port);
    let host = host.unwrap_or(config.server.host);
    info!(
        calendar = service.calendar().version(),
        zone = %service.zone(),
        "Starting query surface"
    );

    let app = routes::router(AppState { service });
    let listener = TcpListener::bind((host.as_str(), port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(err) => {
            error!(%err, "Could not listen for Ctrl+C");
            future::pending::<()>().await;
        }
    }
}

async fn classify(config: &Config, date: &str, remote: Option<String>) -> Result<()> {
    match remote {
        Some(base_url) => {
            let parsed = parse_civil_date(date)?;
            let classification = remote_client(base_url)?
                .day_classification(parsed)
                .await?;
            print_json(&classification)
        }
        None => print_json(&local_service(config)?.pickup_type(date)?),
    }
}

async fn week(config: &Config, date: &str, remote: Option<String>) -> Result<()> {
    match remote {
        Some(base_url) => {
            let parsed = parse_civil_date(date)?;
            let status = remote_client(base_url)?.week_status(parsed).await?;
            print_json(&status)
        }
        None => print_json(&local_service(config)?.week_status(date)?),
    }
}

#[instrument(skip(config))]
async fn plan(
    config: &Config,
    weekday: Option<u8>,
    timing: Option<ReminderTiming>,
    time: Option<String>,
    remote: Option<String>,
) -> Result<()> {
    let stored = FilePreferences::open(&config.reminders.preferences_path)?;
    info!(path = %stored.path().display(), "Using stored preferences as the base");

    let mut preferences = ReminderPreferences::load(&stored);
    preferences.notifications_enabled = true;
    if let Some(number) = weekday {
        preferences.selected_weekday = pickup_weekday(number)
            .ok_or_else(|| anyhow!("weekday must be 1 (Monday) to 5 (Friday), got {number}"))?;
    }
    if let Some(timing) = timing {
        preferences.timing = timing;
    }
    if let Some(time) = time {
        preferences.time_of_day = parse_time_of_day(&time)?;
    }

    // Dry run: the stored preferences file is never written.
    let scratch = Arc::new(MemoryPreferences::default());
    preferences.save(scratch.as_ref())?;

    let classifier: Arc<dyn ClassificationPort> = match remote {
        Some(base_url) => Arc::new(remote_client(base_url)?),
        None => Arc::new(local_service(config)?),
    };
    let preferences_store: Arc<dyn PreferencesStore> = scratch;
    let settings = config.scheduler_settings().map_err(|err| anyhow!(err))?;
    let center = MemoryNotificationCenter::default().with_capacity(settings.pending_cap);
    let scheduler = NotificationScheduler::new(Arc::new(center), classifier, preferences_store)
        .with_settings(settings);

    match scheduler.full_reschedule(Utc::now()).await? {
        RescheduleOutcome::Scheduled(report) => print_json(&report.reminders),
        RescheduleOutcome::Cleared => {
            info!(timing = %preferences.timing, "Reminders are off; nothing would be scheduled");
            print_json(&Vec::<()>::new())
        }
        RescheduleOutcome::Unauthorized => Err(anyhow!("notification permission denied")),
    }
}

fn local_service(config: &Config) -> Result<CurbsideService> {
    let calendar = match &config.calendar.path {
        Some(path) => {
            let document = fs::read_to_string(path)
                .with_context(|| format!("reading calendar {}", path.display()))?;
            ServiceCalendar::from_json(&document)?
        }
        None => ServiceCalendar::bundled(),
    };
    let zone = config.time_zone().map_err(|err| anyhow!(err))?;
    Ok(CurbsideService::new(Arc::new(calendar), zone))
}

fn remote_client(base_url: String) -> Result<HttpClassificationClient> {
    let client = Client::builder().user_agent("curbside/0.1").build()?;
    Ok(HttpClassificationClient::new(client, base_url))
}

#[expect(clippy::print_stdout, reason = "command output goes to stdout")]
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
