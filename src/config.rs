//! Configuration for the Sift investigation engine
//!
//! Layered via the `config` crate: built-in defaults, an optional TOML file,
//! then `SIFT_`-prefixed environment variables (highest precedence).

use crate::error::Result;
use serde::Deserialize;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SiftConfig {
    /// Base URL of the Loki log backend
    pub loki_url: String,

    /// Base URL of the Tempo trace backend
    pub tempo_url: String,

    /// Path to the embedded investigation database file
    /// (resolved to a per-user data directory by the CLI when unset)
    pub db_path: Option<String>,

    /// Per-call timeout against the query backends, in seconds
    pub query_timeout_secs: u64,

    /// Maximum log lines fetched per range query
    pub log_query_limit: usize,

    /// Maximum traces fetched per search
    pub trace_search_limit: usize,

    /// Error pattern spike threshold (current rate vs baseline rate)
    pub error_threshold_multiplier: f64,

    /// Slow request regression threshold (current p95 vs baseline p95)
    pub slow_ratio_threshold: f64,
}

impl SiftConfig {
    /// Load configuration from defaults, an optional file, and the environment
    pub fn load(file: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("loki_url", "http://localhost:3100")?
            .set_default("tempo_url", "http://localhost:3200")?
            .set_default("query_timeout_secs", 30_i64)?
            .set_default("log_query_limit", 1000_i64)?
            .set_default("trace_search_limit", 100_i64)?
            .set_default("error_threshold_multiplier", 2.0)?
            .set_default("slow_ratio_threshold", 1.5)?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(path));
        }
        builder = builder.add_source(config::Environment::with_prefix("SIFT"));

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Per-call backend timeout as a [`Duration`]
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

impl Default for SiftConfig {
    fn default() -> Self {
        // load() with no file only applies defaults and env overrides.
        Self::load(None).expect("default configuration is valid")
    }
}
