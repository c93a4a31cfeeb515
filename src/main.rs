//! modem-logs - status, log and metrics poller for HNAP cable modems
//!
//! Logs into the modem once, then prints its channel tables, appends its
//! event log to a deduplicated file, or pushes downstream stats to InfluxDB.

mod config;
mod display;
mod error;
mod http;
mod influx;
mod logfile;
mod metrics;
mod modem;
mod models;
mod parser;
#[cfg(test)]
mod testutil;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{Config, FileConfig, InfluxConfig};
use http::HttpClient;
use influx::InfluxWriter;
use logfile::{AppendOutcome, StagedLogFile};
use modem::{Session, Transport};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "modem-logs")]
#[command(about = "Cable modem status, log and metrics poller", long_about = None)]
struct Args {
    /// Run in daemon mode (poll forever)
    #[arg(short, long, global = true)]
    daemon: bool,

    /// Config file path (default: modem-logs.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Print connection status and channel tables
    Status,
    /// Append the modem event log to the log file
    Logs {
        /// Print the log instead of appending it
        #[arg(short, long)]
        print: bool,
    },
    /// Write downstream channel stats to InfluxDB
    Metrics,
}

/// What one poll cycle does with the fetched data
enum Job {
    Status,
    PrintLogs,
    AppendLogs(StagedLogFile),
    Metrics(InfluxWriter),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let file = FileConfig::load(args.config.as_deref())?;
    let cfg = Config::from_env(file)?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.log_level())),
        )
        .init();

    tracing::info!("modem-logs v{}", env!("CARGO_PKG_VERSION"));
    cfg.log_sources();

    let command = args.command.unwrap_or(Command::Status);
    let job = build_job(&cfg, command).await?;
    let session = connect(&cfg).await?;

    if args.daemon {
        run_daemon(&cfg, &session, &job).await
    } else {
        run_once(&session, &job).await
    }
}

/// Resolve everything a command needs before touching the modem
async fn build_job(cfg: &Config, command: Command) -> Result<Job> {
    let job = match command {
        Command::Status => Job::Status,
        Command::Logs { print: true } => Job::PrintLogs,
        Command::Logs { print: false } => {
            tracing::info!("Log will be saved to {}", cfg.log_file.display());
            Job::AppendLogs(StagedLogFile::new(&cfg.log_file))
        }
        Command::Metrics => {
            let influx = InfluxConfig::from_env()?;
            let writer = InfluxWriter::new(influx, &cfg.http)?;
            writer
                .ensure_bucket()
                .await
                .context("Failed to prepare InfluxDB bucket")?;
            Job::Metrics(writer)
        }
    };
    Ok(job)
}

async fn connect(cfg: &Config) -> Result<Session<HttpClient>> {
    let client = HttpClient::new(&cfg.http)?;

    tracing::info!("Logging into modem at {}", cfg.modem_address);
    let session = Session::authenticate(&cfg.modem_address, client, &cfg.username, &cfg.password)
        .await
        .context("Could not authenticate with the modem")?;

    tracing::debug!("Session established with {}", session.endpoint());
    Ok(session)
}

/// Run a single poll; the error is reported once, on exit, with a nonzero status
async fn run_once<T: Transport>(session: &Session<T>, job: &Job) -> Result<()> {
    poll(session, job).await.context("Poll failed")
}

/// Run in daemon mode - failures are logged and the next poll proceeds
async fn run_daemon(cfg: &Config, session: &Session<HttpClient>, job: &Job) -> Result<()> {
    tracing::info!("Starting daemon mode...");
    tracing::info!("Poll interval: {}s", cfg.poll_interval);
    tracing::info!("---");

    let interval = Duration::from_secs(cfg.poll_interval);
    let mut last_poll: Option<Instant> = None;

    loop {
        // Rate limiting
        if let Some(last) = last_poll {
            let elapsed = last.elapsed();
            if elapsed < interval {
                tracing::info!("Sleeping for {} seconds...", (interval - elapsed).as_secs());
                tokio::time::sleep(interval - elapsed).await;
            }
        }
        last_poll = Some(Instant::now());

        if let Err(e) = poll(session, job).await {
            tracing::error!("Poll failed: {:#}", e);
        }
    }
}

async fn poll<T: Transport>(session: &Session<T>, job: &Job) -> Result<()> {
    match job {
        Job::Status => {
            let snapshot = session.fetch_connection_details().await?;
            println!("{}", display::summary_table(&snapshot.summary));
            println!("{}", display::downstream_table(&snapshot));
            println!("{}", display::upstream_table(&snapshot));
        }
        Job::PrintLogs => {
            let logs = session.fetch_logs().await?;
            println!("{}", display::log_table(&logs.entries()));
        }
        Job::AppendLogs(log_file) => {
            let logs = session.fetch_logs().await?;
            if logs.is_empty() {
                tracing::warn!("Modem reported no log messages");
            }
            match log_file.append(&logs.to_text())? {
                AppendOutcome::Written => {
                    tracing::debug!("{} updated", log_file.path().display())
                }
                AppendOutcome::Skipped => {
                    tracing::debug!("{} unchanged", log_file.path().display())
                }
            }
        }
        Job::Metrics(writer) => {
            let snapshot = session.fetch_connection_details().await?;
            let points = metrics::project(&snapshot.downstream);
            writer.write(&points).await?;
            tracing::info!("Wrote {} downstream points", points.len());
        }
    }
    Ok(())
}
