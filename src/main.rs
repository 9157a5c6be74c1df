//! Sift - Baseline-Comparing Investigation Engine
//!
//! CLI entry point: wires configuration and tracing, then maps each
//! subcommand one-to-one onto an engine operation.

use anyhow::{anyhow, Context};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use sift_core::{
    analyzers::{ErrorPatternAnalyzer, SlowRequestAnalyzer},
    InvestigationId, InvestigationStatus, ListFilter, LokiClient, SiftConfig, SiftEngine,
    SqliteInvestigationStore, TempoClient,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Get the default database path using the per-user data directory
fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "sift")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
        .join("investigations.db")
}

#[derive(Parser)]
#[command(name = "sift", about = "Investigate incidents by comparing logs and traces against a baseline window", version)]
struct Cli {
    /// Optional configuration file (TOML)
    #[arg(long, global = true, env = "SIFT_CONFIG")]
    config: Option<String>,

    /// Override the investigation database path
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new pending investigation
    Create {
        /// Investigation name
        name: String,

        /// Label scope as key=value pairs (repeatable)
        #[arg(short, long = "label")]
        labels: Vec<String>,

        /// Window length in minutes, ending now
        #[arg(long, default_value_t = 30)]
        window_mins: i64,

        /// Run the investigation immediately after creating it
        #[arg(long)]
        run: bool,
    },

    /// Run a pending investigation to completion
    Run {
        /// Investigation id
        id: String,
    },

    /// Show an investigation
    Get {
        /// Investigation id
        id: String,
    },

    /// List investigations, newest first
    List {
        /// Filter by status (pending, running, completed, failed)
        #[arg(long)]
        status: Option<String>,

        /// Maximum number of records
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Delete an investigation
    Delete {
        /// Investigation id
        id: String,
    },

    /// Discover log label names (or values for one label) for scoping
    Labels {
        /// Label name to list values for
        name: Option<String>,

        /// Lookback window in minutes
        #[arg(long, default_value_t = 60)]
        window_mins: i64,
    },
}

/// Parse repeated key=value label arguments
fn parse_labels(raw: &[String]) -> anyhow::Result<BTreeMap<String, String>> {
    raw.iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| anyhow!("invalid label '{}', expected key=value", pair))
        })
        .collect()
}

fn parse_status(raw: &str) -> anyhow::Result<InvestigationStatus> {
    serde_json::from_str(&format!("\"{}\"", raw))
        .map_err(|_| anyhow!("unknown status '{}', expected pending/running/completed/failed", raw))
}

async fn build_engine(config: &SiftConfig, db_override: Option<&str>) -> anyhow::Result<SiftEngine> {
    let db_path = db_override
        .map(PathBuf::from)
        .or_else(|| config.db_path.as_ref().map(PathBuf::from))
        .unwrap_or_else(default_db_path);

    let store = Arc::new(SqliteInvestigationStore::new(&db_path).await?);
    let logs = Arc::new(LokiClient::new(
        &config.loki_url,
        config.query_timeout(),
        config.log_query_limit,
    )?);
    let traces = Arc::new(TempoClient::new(
        &config.tempo_url,
        config.query_timeout(),
        config.trace_search_limit,
    )?);

    Ok(SiftEngine::with_analyzers(
        store,
        logs,
        traces,
        ErrorPatternAnalyzer::new(config.error_threshold_multiplier),
        SlowRequestAnalyzer::new(config.slow_ratio_threshold),
    ))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = SiftConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Command::Create {
            name,
            labels,
            window_mins,
            run,
        } => {
            let engine = build_engine(&config, cli.db.as_deref()).await?;
            let labels = parse_labels(&labels)?;
            let end = Utc::now();
            let start = end - Duration::minutes(window_mins);
            let investigation = engine
                .create_investigation(name, labels, Some(start), Some(end))
                .await?;
            if run {
                let finished = engine.run(investigation.id).await?;
                print_json(&finished)?;
            } else {
                print_json(&investigation)?;
            }
        }
        Command::Run { id } => {
            let engine = build_engine(&config, cli.db.as_deref()).await?;
            let investigation = engine.run(InvestigationId::from_string(&id)?).await?;
            print_json(&investigation)?;
        }
        Command::Get { id } => {
            let engine = build_engine(&config, cli.db.as_deref()).await?;
            let investigation = engine
                .get_investigation(InvestigationId::from_string(&id)?)
                .await?;
            print_json(&investigation)?;
        }
        Command::List { status, limit } => {
            let engine = build_engine(&config, cli.db.as_deref()).await?;
            let filter = ListFilter {
                status: status.as_deref().map(parse_status).transpose()?,
                limit,
            };
            let investigations = engine.list_investigations(&filter).await?;
            print_json(&investigations)?;
        }
        Command::Delete { id } => {
            let engine = build_engine(&config, cli.db.as_deref()).await?;
            let deleted = engine
                .delete_investigation(InvestigationId::from_string(&id)?)
                .await?;
            if deleted {
                println!("deleted {}", id);
            } else {
                println!("not found: {}", id);
            }
        }
        Command::Labels { name, window_mins } => {
            let loki = LokiClient::new(
                &config.loki_url,
                config.query_timeout(),
                config.log_query_limit,
            )?;
            let end = Utc::now();
            let start = end - Duration::minutes(window_mins);
            let values = match name {
                Some(label) => loki.query_label_values(&label, start, end).await?,
                None => loki.query_labels(start, end).await?,
            };
            for value in values {
                println!("{}", value);
            }
        }
    }

    Ok(())
}
