//! Core data types for the Sift investigation engine
//!
//! This module defines the fundamental data structures used throughout sift:
//! investigations, analyses, analyzer findings, and the transient log/trace
//! records consumed by the analyzers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Unique identifier for investigations
///
/// Wraps a UUID to provide type safety and prevent mixing investigation IDs
/// with other UUID-based identifiers in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvestigationId(pub Uuid);

impl InvestigationId {
    /// Create a new random investigation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an investigation ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for InvestigationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvestigationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Investigation lifecycle status
///
/// Transitions only move forward: `Pending` -> `Running` -> `Completed` | `Failed`.
/// Terminal states are never revisited; re-running a terminal investigation is
/// rejected by the engine with [`crate::error::SiftError::InvalidState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestigationStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl InvestigationStatus {
    /// Check whether this status is terminal (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InvestigationStatus::Completed | InvestigationStatus::Failed
        )
    }
}

impl std::fmt::Display for InvestigationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InvestigationStatus::Pending => "pending",
            InvestigationStatus::Running => "running",
            InvestigationStatus::Completed => "completed",
            InvestigationStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Kind of analysis performed by an analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    ErrorPattern,
    SlowRequest,
}

impl std::fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisKind::ErrorPattern => write!(f, "error_pattern"),
            AnalysisKind::SlowRequest => write!(f, "slow_request"),
        }
    }
}

/// Severity grading for flagged findings
///
/// Ordered from least to most severe so findings can be compared and sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// A single log line with its emission timestamp
///
/// Transient input to the error pattern analyzer; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Emission timestamp
    pub timestamp: DateTime<Utc>,

    /// Raw log line text
    pub line: String,
}

/// A single trace span with operation name and duration
///
/// Transient input to the slow request analyzer; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    /// Operation (root trace) name
    pub operation: String,

    /// Span duration in milliseconds
    pub duration_ms: f64,
}

/// p50/p95/p99 latency summary in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileTriple {
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// An error pattern whose occurrence rate spiked relative to baseline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggedPattern {
    /// Canonicalized log line (timestamps/IPs/UUIDs/numbers scrubbed)
    pub pattern: String,

    /// Occurrences in the current window
    pub current_count: usize,

    /// Occurrences in the baseline window
    pub baseline_count: usize,

    /// current_rate / baseline_rate; `None` when the baseline is silent
    /// (which flags the pattern unconditionally)
    pub ratio: Option<f64>,

    /// Severity graded from ratio and occurrence count
    pub severity: Severity,
}

/// Findings of the error pattern analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPatternReport {
    /// All lines seen in the current window, error or not
    pub total_current_logs: usize,

    /// All lines seen in the baseline window
    pub total_baseline_logs: usize,

    /// Distinct error patterns in the current window
    pub unique_current_patterns: usize,

    /// Distinct error patterns in the baseline window
    pub unique_baseline_patterns: usize,

    /// Anomalous patterns, ordered by descending ratio
    pub flagged: Vec<FlaggedPattern>,
}

/// An operation whose latency percentiles regressed relative to baseline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlowOperation {
    /// Operation name
    pub operation: String,

    /// Current window percentiles (ms)
    pub current: PercentileTriple,

    /// Baseline window percentiles (ms)
    pub baseline: PercentileTriple,

    /// current_p95 / baseline_p95
    pub slowdown_factor: f64,

    /// Spans sampled in the current window
    pub current_sample_count: usize,

    /// Spans sampled in the baseline window
    pub baseline_sample_count: usize,

    /// Severity graded from slowdown factor and absolute p95
    pub severity: Severity,
}

/// Findings of the slow request analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlowRequestReport {
    /// Spans seen in the current window
    pub total_current_spans: usize,

    /// Spans seen in the baseline window
    pub total_baseline_spans: usize,

    /// Distinct operations in the current window
    pub unique_operations: usize,

    /// Regressed operations, ordered by descending slowdown factor
    pub flagged: Vec<SlowOperation>,

    /// Operations present only in the current window (no baseline to
    /// compare against, so never flagged as regressions)
    #[serde(default)]
    pub new_operations: Vec<String>,
}

/// Typed analyzer findings, tagged by analyzer kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AnalysisFindings {
    ErrorPatterns(ErrorPatternReport),
    SlowRequests(SlowRequestReport),
}

impl AnalysisFindings {
    /// The analyzer kind that produced these findings
    pub fn kind(&self) -> AnalysisKind {
        match self {
            AnalysisFindings::ErrorPatterns(_) => AnalysisKind::ErrorPattern,
            AnalysisFindings::SlowRequests(_) => AnalysisKind::SlowRequest,
        }
    }
}

/// A completed analysis attached to an investigation
///
/// Immutable once created and owned exclusively by its parent investigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    /// Unique identifier
    pub id: Uuid,

    /// Which analyzer produced this result
    pub kind: AnalysisKind,

    /// Structured findings
    pub findings: AnalysisFindings,

    /// When the analysis started
    pub started_at: DateTime<Utc>,

    /// When the analysis completed
    pub completed_at: DateTime<Utc>,

    /// Query/tag context the analysis ran with (backend query text, periods)
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Analysis {
    /// Create a completed analysis from analyzer findings
    pub fn new(
        findings: AnalysisFindings,
        started_at: DateTime<Utc>,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: findings.kind(),
            findings,
            started_at,
            completed_at: Utc::now(),
            metadata,
        }
    }
}

/// A bounded inquiry into a time window of observability data
///
/// Scoped by a label set that doubles as the log/trace query scope.
/// `analyses` is append-only; `id` is immutable once assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investigation {
    /// Unique identifier
    pub id: InvestigationId,

    /// Human-readable name
    pub name: String,

    /// Label set scoping the log/trace queries (sorted keys for
    /// deterministic query construction)
    pub labels: BTreeMap<String, String>,

    /// Start of the investigation window
    pub start_time: DateTime<Utc>,

    /// End of the investigation window ("now at run time" when absent)
    pub end_time: Option<DateTime<Utc>>,

    /// Lifecycle status
    pub status: InvestigationStatus,

    /// Completed analyses, in the order they finished
    pub analyses: Vec<Analysis>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Open-ended metadata (failure details land in `metadata["error"]`)
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Investigation {
    /// Create a new pending investigation
    pub fn new(
        name: impl Into<String>,
        labels: BTreeMap<String, String>,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: InvestigationId::new(),
            name: name.into(),
            labels,
            start_time,
            end_time,
            status: InvestigationStatus::Pending,
            analyses: Vec::new(),
            created_at: now,
            updated_at: now,
            metadata: BTreeMap::new(),
        }
    }

    /// Update the lifecycle status and touch `updated_at`
    pub fn set_status(&mut self, status: InvestigationStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Append a completed analysis and touch `updated_at`
    pub fn push_analysis(&mut self, analysis: Analysis) {
        self.analyses.push(analysis);
        self.updated_at = Utc::now();
    }

    /// Record a failure reason in metadata
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.metadata
            .insert("error".to_string(), serde_json::Value::String(message.into()));
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_investigation_id_creation() {
        let id1 = InvestigationId::new();
        let id2 = InvestigationId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_status_terminal() {
        assert!(!InvestigationStatus::Pending.is_terminal());
        assert!(!InvestigationStatus::Running.is_terminal());
        assert!(InvestigationStatus::Completed.is_terminal());
        assert!(InvestigationStatus::Failed.is_terminal());
    }

    #[test]
    fn test_new_investigation_is_pending() {
        let inv = Investigation::new("test", BTreeMap::new(), Utc::now(), None);
        assert_eq!(inv.status, InvestigationStatus::Pending);
        assert!(inv.analyses.is_empty());
        assert_eq!(inv.created_at, inv.updated_at);
    }

    #[test]
    fn test_findings_tagged_serialization() {
        let findings = AnalysisFindings::ErrorPatterns(ErrorPatternReport {
            total_current_logs: 10,
            total_baseline_logs: 10,
            unique_current_patterns: 1,
            unique_baseline_patterns: 1,
            flagged: vec![],
        });

        let json = serde_json::to_value(&findings).unwrap();
        assert_eq!(json["kind"], "error_patterns");
        assert_eq!(json["total_current_logs"], 10);

        let back: AnalysisFindings = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind(), AnalysisKind::ErrorPattern);
    }

    #[test]
    fn test_old_records_default_safely() {
        // Rows written before new_operations / metadata existed must still parse.
        let json = serde_json::json!({
            "total_current_spans": 5,
            "total_baseline_spans": 5,
            "unique_operations": 2,
            "flagged": [],
            "kind": "slow_requests"
        });
        let findings: AnalysisFindings = serde_json::from_value(json).unwrap();
        match findings {
            AnalysisFindings::SlowRequests(report) => assert!(report.new_operations.is_empty()),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }
}
