//! Query clients for the log and trace backends
//!
//! The engine depends only on the two seam traits here; the concrete
//! Loki/Tempo clients are injected at construction time so tests can
//! substitute fakes. Both backends are treated as opaque time-series
//! stores reachable through a narrow range/search interface, and any
//! non-success response is a hard failure ([`crate::SiftError::Backend`]).

pub mod loki;
pub mod tempo;

use crate::error::Result;
use crate::types::{LogRecord, Span};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

pub use loki::LokiClient;
pub use tempo::TempoClient;

/// Range-query interface to a log store
#[async_trait]
pub trait LogQueryClient: Send + Sync {
    /// Fetch raw log lines matching a label-matcher query over a time window
    async fn query_range(
        &self,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LogRecord>>;
}

/// Search interface to a trace store
#[async_trait]
pub trait TraceQueryClient: Send + Sync {
    /// Fetch spans matching a tag set over a time window
    async fn search_traces(
        &self,
        tags: &BTreeMap<String, String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Span>>;
}
