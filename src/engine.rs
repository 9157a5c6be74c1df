//! Investigation orchestrator
//!
//! Coordinates the full investigation lifecycle: creates records, derives
//! the baseline window, fetches current and baseline logs/traces through the
//! injected query clients, runs both analyzers, and persists every state
//! transition so a crash mid-run still leaves a discoverable record.

use crate::analyzers::{Analyzer, ErrorPatternAnalyzer, SlowRequestAnalyzer};
use crate::error::{Result, SiftError};
use crate::query::{LogQueryClient, TraceQueryClient};
use crate::storage::{InvestigationStore, ListFilter};
use crate::types::{Analysis, Investigation, InvestigationId, InvestigationStatus};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Default investigation window when the caller gives no start time
const DEFAULT_WINDOW_MINUTES: i64 = 30;

/// Render a label set as a log backend label-matcher expression
///
/// Keys iterate in sorted order (BTreeMap), so the rendering is
/// deterministic. An empty label set renders the maximally broad
/// matcher `{}`.
pub fn build_log_query(labels: &BTreeMap<String, String>) -> String {
    let selectors = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, v))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}", selectors)
}

/// Map an investigation label set to trace backend search tags
///
/// The `service` label maps to the trace backend's reserved `service.name`
/// tag; all other labels pass through unchanged.
pub fn build_trace_tags(labels: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    labels
        .iter()
        .map(|(k, v)| {
            let key = if k == "service" { "service.name" } else { k };
            (key.to_string(), v.clone())
        })
        .collect()
}

/// Core orchestration for Sift investigations
///
/// All collaborators are injected at construction time; the engine itself
/// holds no mutable state, so multiple investigations may run concurrently
/// against the same engine.
pub struct SiftEngine {
    store: Arc<dyn InvestigationStore>,
    logs: Arc<dyn LogQueryClient>,
    traces: Arc<dyn TraceQueryClient>,
    error_analyzer: ErrorPatternAnalyzer,
    slow_analyzer: SlowRequestAnalyzer,
}

impl SiftEngine {
    /// Create an engine with default analyzer thresholds
    pub fn new(
        store: Arc<dyn InvestigationStore>,
        logs: Arc<dyn LogQueryClient>,
        traces: Arc<dyn TraceQueryClient>,
    ) -> Self {
        Self::with_analyzers(
            store,
            logs,
            traces,
            ErrorPatternAnalyzer::default(),
            SlowRequestAnalyzer::default(),
        )
    }

    /// Create an engine with configured analyzers
    pub fn with_analyzers(
        store: Arc<dyn InvestigationStore>,
        logs: Arc<dyn LogQueryClient>,
        traces: Arc<dyn TraceQueryClient>,
        error_analyzer: ErrorPatternAnalyzer,
        slow_analyzer: SlowRequestAnalyzer,
    ) -> Self {
        Self {
            store,
            logs,
            traces,
            error_analyzer,
            slow_analyzer,
        }
    }

    /// Create a new pending investigation and persist it immediately
    ///
    /// The window defaults to the last 30 minutes when `start_time` is
    /// absent; a missing `end_time` means "now at run time".
    pub async fn create_investigation(
        &self,
        name: impl Into<String>,
        labels: BTreeMap<String, String>,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<Investigation> {
        let start =
            start_time.unwrap_or_else(|| Utc::now() - Duration::minutes(DEFAULT_WINDOW_MINUTES));
        let investigation = Investigation::new(name, labels, start, end_time);

        self.store.save(&investigation).await?;
        info!(id = %investigation.id, name = %investigation.name, "created investigation");

        Ok(investigation)
    }

    /// Run a pending investigation to a terminal state
    ///
    /// Fetches current and baseline windows from both backends concurrently,
    /// runs both analyzers, and persists the result. A backend failure marks
    /// the investigation `failed` with the reason in `metadata["error"]`;
    /// only a missing id or a non-pending status yields `Err`.
    pub async fn run(&self, id: InvestigationId) -> Result<Investigation> {
        let mut investigation = self.store.get(id).await?;
        if investigation.status != InvestigationStatus::Pending {
            return Err(SiftError::InvalidState {
                id: id.to_string(),
                status: investigation.status.to_string(),
            });
        }

        investigation.set_status(InvestigationStatus::Running);
        self.store.save(&investigation).await?;

        let started_at = Utc::now();
        let end = investigation.end_time.unwrap_or(started_at);
        // Baseline: same duration, immediately preceding the window.
        let baseline_start = investigation.start_time - (end - investigation.start_time);
        let baseline_end = investigation.start_time;

        let log_query = build_log_query(&investigation.labels);
        let trace_tags = build_trace_tags(&investigation.labels);
        info!(id = %id, query = %log_query, "running investigation");

        let fetched = tokio::try_join!(
            self.logs.query_range(&log_query, investigation.start_time, end),
            self.logs.query_range(&log_query, baseline_start, baseline_end),
            self.traces
                .search_traces(&trace_tags, investigation.start_time, end),
            self.traces
                .search_traces(&trace_tags, baseline_start, baseline_end),
        );

        match fetched {
            Ok((current_logs, baseline_logs, current_spans, baseline_spans)) => {
                let current_period =
                    format!("{} to {}", investigation.start_time.to_rfc3339(), end.to_rfc3339());
                let baseline_period =
                    format!("{} to {}", baseline_start.to_rfc3339(), baseline_end.to_rfc3339());

                let mut log_meta = BTreeMap::new();
                log_meta.insert("log_query".to_string(), log_query);
                log_meta.insert("current_period".to_string(), current_period.clone());
                log_meta.insert("baseline_period".to_string(), baseline_period.clone());
                investigation.push_analysis(Analysis::new(
                    self.error_analyzer.analyze(&current_logs, &baseline_logs),
                    started_at,
                    log_meta,
                ));

                let mut trace_meta = BTreeMap::new();
                trace_meta.insert(
                    "trace_tags".to_string(),
                    serde_json::to_string(&trace_tags)?,
                );
                trace_meta.insert("current_period".to_string(), current_period);
                trace_meta.insert("baseline_period".to_string(), baseline_period);
                investigation.push_analysis(Analysis::new(
                    self.slow_analyzer.analyze(&current_spans, &baseline_spans),
                    started_at,
                    trace_meta,
                ));

                investigation.set_status(InvestigationStatus::Completed);
                info!(id = %id, analyses = investigation.analyses.len(), "investigation completed");
            }
            Err(e) => {
                warn!(id = %id, error = %e, "investigation failed");
                investigation.record_error(e.to_string());
                investigation.set_status(InvestigationStatus::Failed);
            }
        }

        self.store.save(&investigation).await?;
        Ok(investigation)
    }

    /// Fetch an investigation by id
    pub async fn get_investigation(&self, id: InvestigationId) -> Result<Investigation> {
        self.store.get(id).await
    }

    /// List investigations, newest first
    pub async fn list_investigations(&self, filter: &ListFilter) -> Result<Vec<Investigation>> {
        self.store.list(filter).await
    }

    /// Delete an investigation; returns whether a record existed
    pub async fn delete_investigation(&self, id: InvestigationId) -> Result<bool> {
        self.store.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_build_log_query_sorted_keys() {
        let labels = labels(&[("pod", "test-pod"), ("namespace", "default")]);
        assert_eq!(
            build_log_query(&labels),
            r#"{namespace="default", pod="test-pod"}"#
        );
    }

    #[test]
    fn test_build_log_query_empty_labels_is_broad_matcher() {
        assert_eq!(build_log_query(&BTreeMap::new()), "{}");
    }

    #[test]
    fn test_build_trace_tags_maps_service() {
        let labels = labels(&[("service", "checkout"), ("namespace", "prod")]);
        let tags = build_trace_tags(&labels);
        assert_eq!(tags.get("service.name").map(String::as_str), Some("checkout"));
        assert_eq!(tags.get("namespace").map(String::as_str), Some("prod"));
        assert!(!tags.contains_key("service"));
    }

    #[test]
    fn test_build_trace_tags_passthrough() {
        let labels = labels(&[("cluster", "home"), ("pod", "api-7f9")]);
        let tags = build_trace_tags(&labels);
        assert_eq!(tags, labels);
    }
}
