//! Sift - Baseline-Comparing Investigation Engine
//!
//! Diagnoses production incidents by statistically comparing a current
//! window of logs and traces against a baseline window of equal duration
//! immediately preceding it:
//! - Canonicalizes free-text log lines into patterns and flags rate spikes
//! - Summarizes trace durations per operation and flags p95 regressions
//! - Persists investigations durably across restarts (embedded SQLite)
//!
//! # Architecture
//!
//! The system is organized into several layers:
//! - **Types**: Core data structures (Investigation, Analysis, findings)
//! - **Query**: Loki/Tempo clients behind narrow seam traits
//! - **Analyzers**: Pure window-comparison algorithms
//! - **Storage**: Investigation store behind a trait (SQLite backend)
//! - **Engine**: Lifecycle orchestration tying the layers together
//!
//! # Example
//!
//! ```ignore
//! use sift_core::{SiftConfig, SiftEngine, SqliteInvestigationStore, LokiClient, TempoClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SiftConfig::load(None)?;
//!     let store = Arc::new(SqliteInvestigationStore::new("sift.db").await?);
//!     let logs = Arc::new(LokiClient::new(&config.loki_url, config.query_timeout(), 1000)?);
//!     let traces = Arc::new(TempoClient::new(&config.tempo_url, config.query_timeout(), 100)?);
//!     let engine = SiftEngine::new(store, logs, traces);
//!
//!     let inv = engine
//!         .create_investigation("api errors", Default::default(), None, None)
//!         .await?;
//!     let finished = engine.run(inv.id).await?;
//!     println!("{}", finished.status);
//!
//!     Ok(())
//! }
//! ```

pub mod analyzers;
pub mod config;
pub mod engine;
pub mod error;
pub mod query;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use analyzers::{Analyzer, ErrorPatternAnalyzer, SlowRequestAnalyzer};
pub use config::SiftConfig;
pub use engine::{build_log_query, build_trace_tags, SiftEngine};
pub use error::{Result, SiftError};
pub use query::{LogQueryClient, LokiClient, TempoClient, TraceQueryClient};
pub use storage::{InvestigationStore, ListFilter, SqliteInvestigationStore};
pub use types::{
    Analysis, AnalysisFindings, AnalysisKind, Investigation, InvestigationId,
    InvestigationStatus, LogRecord, Severity, Span,
};
