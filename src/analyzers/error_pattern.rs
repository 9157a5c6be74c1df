//! Error pattern analyzer
//!
//! Canonicalizes free-text log lines into comparable patterns by scrubbing
//! high-cardinality tokens (timestamps, IPs, UUIDs, digit runs, quoted
//! strings), then flags patterns whose occurrence rate in the current window
//! spiked relative to the baseline window.

use crate::analyzers::{Analyzer, MAX_REPORTED_FINDINGS};
use crate::types::{
    AnalysisFindings, AnalysisKind, ErrorPatternReport, FlaggedPattern, LogRecord, Severity,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Default spike threshold: a pattern is anomalous when its current rate
/// exceeds this multiple of its baseline rate
pub const DEFAULT_THRESHOLD_MULTIPLIER: f64 = 2.0;

/// Severity markers that classify a line as an error candidate
const ERROR_KEYWORDS: &[&str] = &[
    "error",
    "exception",
    "failed",
    "failure",
    "fatal",
    "panic",
    "critical",
    "emergency",
    "alert",
    "denied",
    "timeout",
    "refused",
    "unreachable",
    "unavailable",
];

static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(\.\d+)?([+-]\d{2}:?\d{2}|Z)?").unwrap()
});
static IP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap());
static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").unwrap()
});
// No word boundaries: digit runs embedded in tokens ("312ms") must scrub too.
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());
static DQUOTED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""[^"]*""#).unwrap());
static SQUOTED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"'[^']*'").unwrap());

/// Canonicalize a log line into an aggregation pattern
///
/// Pure function: lines differing only in timestamp, IP, UUID, numeric, or
/// quoted-string tokens normalize to the same pattern.
pub fn normalize_line(line: &str) -> String {
    let line = TIMESTAMP_RE.replace_all(line, "");
    let line = IP_RE.replace_all(&line, "IP");
    let line = UUID_RE.replace_all(&line, "UUID");
    let line = DQUOTED_RE.replace_all(&line, "STRING");
    let line = SQUOTED_RE.replace_all(&line, "STRING");
    let line = NUMBER_RE.replace_all(&line, "N");

    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Check if a log line contains error indicators (case-insensitive)
fn is_error_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    ERROR_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Analyzes logs to find elevated error patterns
#[derive(Debug, Clone)]
pub struct ErrorPatternAnalyzer {
    threshold_multiplier: f64,
}

impl ErrorPatternAnalyzer {
    /// Create an analyzer with the given spike threshold
    ///
    /// The multiplier is not validated here: a value <= 0 flags every
    /// error pattern present in the current window. Callers that want
    /// rejection must validate at the configuration boundary.
    pub fn new(threshold_multiplier: f64) -> Self {
        Self {
            threshold_multiplier,
        }
    }

    /// Count error patterns in a window
    fn extract_patterns(logs: &[LogRecord]) -> BTreeMap<String, usize> {
        let mut patterns = BTreeMap::new();
        for log in logs {
            if !is_error_line(&log.line) {
                continue;
            }
            let pattern = normalize_line(&log.line);
            if !pattern.is_empty() {
                *patterns.entry(pattern).or_insert(0) += 1;
            }
        }
        patterns
    }

    fn severity_for(ratio: Option<f64>, count: usize) -> Severity {
        let factor = ratio.unwrap_or(f64::MAX);
        if factor >= 10.0 || count >= 100 {
            Severity::Critical
        } else if factor >= 5.0 || count >= 50 {
            Severity::High
        } else if factor >= 3.0 || count >= 20 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

impl Default for ErrorPatternAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_MULTIPLIER)
    }
}

impl Analyzer for ErrorPatternAnalyzer {
    type Record = LogRecord;

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::ErrorPattern
    }

    fn analyze(&self, current: &[LogRecord], baseline: &[LogRecord]) -> AnalysisFindings {
        debug!(
            current = current.len(),
            baseline = baseline.len(),
            "analyzing logs for elevated error patterns"
        );

        let current_patterns = Self::extract_patterns(current);
        let baseline_patterns = Self::extract_patterns(baseline);

        let current_total = current.len().max(1) as f64;
        let baseline_total = baseline.len().max(1) as f64;

        let mut flagged = Vec::new();
        for (pattern, &current_count) in &current_patterns {
            let baseline_count = baseline_patterns.get(pattern).copied().unwrap_or(0);

            let current_rate = current_count as f64 / current_total;
            let baseline_rate = baseline_count as f64 / baseline_total;

            if current_rate > baseline_rate * self.threshold_multiplier {
                let ratio = (baseline_rate > 0.0).then(|| current_rate / baseline_rate);
                flagged.push(FlaggedPattern {
                    pattern: pattern.clone(),
                    current_count,
                    baseline_count,
                    ratio,
                    severity: Self::severity_for(ratio, current_count),
                });
            }
        }

        // Descending ratio, silent-baseline patterns first; pattern text
        // breaks ties so the ordering is deterministic.
        flagged.sort_by(|a, b| {
            let ra = a.ratio.unwrap_or(f64::MAX);
            let rb = b.ratio.unwrap_or(f64::MAX);
            rb.partial_cmp(&ra)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.pattern.cmp(&b.pattern))
        });
        flagged.truncate(MAX_REPORTED_FINDINGS);

        AnalysisFindings::ErrorPatterns(ErrorPatternReport {
            total_current_logs: current.len(),
            total_baseline_logs: baseline.len(),
            unique_current_patterns: current_patterns.len(),
            unique_baseline_patterns: baseline_patterns.len(),
            flagged,
        })
    }
}
