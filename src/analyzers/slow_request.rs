//! Slow request analyzer
//!
//! Groups trace spans by operation name, summarizes their durations with
//! nearest-rank percentiles, and flags operations whose current p95 regressed
//! past a configurable multiple of the baseline p95.

use crate::analyzers::{Analyzer, MAX_REPORTED_FINDINGS};
use crate::types::{
    AnalysisFindings, AnalysisKind, PercentileTriple, Severity, SlowOperation, SlowRequestReport,
    Span,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Default regression threshold: an operation is regressed when its current
/// p95 exceeds this multiple of the baseline p95
pub const DEFAULT_RATIO_THRESHOLD: f64 = 1.5;

/// Nearest-rank percentile: the value at index `floor(p/100 * (n-1))` of a
/// sorted sample, no interpolation. Empty input yields 0.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = ((p / 100.0) * (sorted.len() - 1) as f64).floor() as usize;
    sorted[index.min(sorted.len() - 1)]
}

fn triple(sorted: &[f64]) -> PercentileTriple {
    PercentileTriple {
        p50: percentile(sorted, 50.0),
        p95: percentile(sorted, 95.0),
        p99: percentile(sorted, 99.0),
    }
}

/// Analyzes traces to find latency regressions per operation
#[derive(Debug, Clone)]
pub struct SlowRequestAnalyzer {
    ratio_threshold: f64,
}

impl SlowRequestAnalyzer {
    /// Create an analyzer with the given p95 regression threshold
    pub fn new(ratio_threshold: f64) -> Self {
        Self { ratio_threshold }
    }

    /// Group span durations by operation name, sorted ascending per group
    fn durations_by_operation(spans: &[Span]) -> BTreeMap<String, Vec<f64>> {
        let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for span in spans {
            groups
                .entry(span.operation.clone())
                .or_default()
                .push(span.duration_ms);
        }
        for durations in groups.values_mut() {
            durations.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        }
        groups
    }

    fn severity_for(slowdown_factor: f64, current_p95_ms: f64) -> Severity {
        if slowdown_factor >= 5.0 || current_p95_ms >= 5000.0 {
            Severity::Critical
        } else if slowdown_factor >= 3.0 || current_p95_ms >= 2000.0 {
            Severity::High
        } else if slowdown_factor >= 2.0 || current_p95_ms >= 1000.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

impl Default for SlowRequestAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_RATIO_THRESHOLD)
    }
}

impl Analyzer for SlowRequestAnalyzer {
    type Record = Span;

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::SlowRequest
    }

    fn analyze(&self, current: &[Span], baseline: &[Span]) -> AnalysisFindings {
        debug!(
            current = current.len(),
            baseline = baseline.len(),
            "analyzing traces for latency regressions"
        );

        let current_groups = Self::durations_by_operation(current);
        let baseline_groups = Self::durations_by_operation(baseline);

        let mut flagged = Vec::new();
        let mut new_operations = Vec::new();

        for (operation, current_durs) in &current_groups {
            let baseline_durs = match baseline_groups.get(operation) {
                Some(durs) if !durs.is_empty() => durs,
                // No baseline: reportable as new, but not a regression.
                _ => {
                    new_operations.push(operation.clone());
                    continue;
                }
            };

            let current_pcts = triple(current_durs);
            let baseline_pcts = triple(baseline_durs);

            if baseline_pcts.p95 > 0.0 && current_pcts.p95 > baseline_pcts.p95 * self.ratio_threshold
            {
                let slowdown_factor = current_pcts.p95 / baseline_pcts.p95;
                flagged.push(SlowOperation {
                    operation: operation.clone(),
                    current: current_pcts,
                    baseline: baseline_pcts,
                    slowdown_factor,
                    current_sample_count: current_durs.len(),
                    baseline_sample_count: baseline_durs.len(),
                    severity: Self::severity_for(slowdown_factor, current_pcts.p95),
                });
            }
        }

        flagged.sort_by(|a, b| {
            b.slowdown_factor
                .partial_cmp(&a.slowdown_factor)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.operation.cmp(&b.operation))
        });
        flagged.truncate(MAX_REPORTED_FINDINGS);

        AnalysisFindings::SlowRequests(SlowRequestReport {
            total_current_spans: current.len(),
            total_baseline_spans: baseline.len(),
            unique_operations: current_groups.len(),
            flagged,
            new_operations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(operation: &str, duration_ms: f64) -> Span {
        Span {
            operation: operation.to_string(),
            duration_ms,
        }
    }

    fn report(findings: AnalysisFindings) -> SlowRequestReport {
        match findings {
            AnalysisFindings::SlowRequests(report) => report,
            _ => panic!("expected slow request findings"),
        }
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let xs: Vec<f64> = (1..=10).map(|i| (i * 10) as f64).collect();
        // floor(0.50 * 9) = 4 -> 50; floor(0.95 * 9) = 8 -> 90
        assert_eq!(percentile(&xs, 50.0), 50.0);
        assert_eq!(percentile(&xs, 95.0), 90.0);
        assert_eq!(percentile(&xs, 0.0), 10.0);
        assert_eq!(percentile(&xs, 100.0), 100.0);
    }

    #[test]
    fn test_percentile_monotonicity() {
        let xs = vec![3.0, 7.0, 12.0, 12.0, 40.0, 41.0, 99.0];
        let mut prev = f64::MIN;
        for p in 0..=100 {
            let v = percentile(&xs, p as f64);
            assert!(v >= prev, "percentile({}) went backwards", p);
            prev = v;
        }
    }

    #[test]
    fn test_percentile_empty_and_single() {
        assert_eq!(percentile(&[], 95.0), 0.0);
        assert_eq!(percentile(&[42.0], 50.0), 42.0);
        assert_eq!(percentile(&[42.0], 99.0), 42.0);
    }

    #[test]
    fn test_regression_flagged() {
        // Uniform 5000ms current vs 1000ms baseline at threshold 2.0.
        let current: Vec<_> = (0..10).map(|_| span("GET /api", 5000.0)).collect();
        let baseline: Vec<_> = (0..10).map(|_| span("GET /api", 1000.0)).collect();

        let analyzer = SlowRequestAnalyzer::new(2.0);
        let report = report(analyzer.analyze(&current, &baseline));

        assert_eq!(report.flagged.len(), 1);
        let op = &report.flagged[0];
        assert_eq!(op.operation, "GET /api");
        assert_eq!(op.current.p95, 5000.0);
        assert_eq!(op.baseline.p95, 1000.0);
        assert_eq!(op.slowdown_factor, 5.0);
        assert_eq!(op.severity, Severity::Critical);
        assert_eq!(op.current_sample_count, 10);
        assert_eq!(op.baseline_sample_count, 10);
    }

    #[test]
    fn test_steady_operation_not_flagged() {
        let window: Vec<_> = (0..10).map(|i| span("GET /api", 100.0 + i as f64)).collect();
        let analyzer = SlowRequestAnalyzer::default();
        let report = report(analyzer.analyze(&window, &window));
        assert!(report.flagged.is_empty());
        assert_eq!(report.unique_operations, 1);
    }

    #[test]
    fn test_operation_without_baseline_is_new_not_flagged() {
        let current = vec![span("POST /new", 9000.0)];
        let baseline = vec![span("GET /old", 100.0)];

        let analyzer = SlowRequestAnalyzer::default();
        let report = report(analyzer.analyze(&current, &baseline));

        assert!(report.flagged.is_empty());
        assert_eq!(report.new_operations, vec!["POST /new".to_string()]);
    }

    #[test]
    fn test_empty_input_completes_with_zero_findings() {
        let analyzer = SlowRequestAnalyzer::default();
        let report = report(analyzer.analyze(&[], &[]));
        assert!(report.flagged.is_empty());
        assert!(report.new_operations.is_empty());
        assert_eq!(report.total_current_spans, 0);
    }

    #[test]
    fn test_flagged_sorted_by_descending_slowdown() {
        let mut current = Vec::new();
        current.extend((0..5).map(|_| span("GET /a", 4000.0)));
        current.extend((0..5).map(|_| span("GET /b", 2000.0)));
        let mut baseline = Vec::new();
        baseline.extend((0..5).map(|_| span("GET /a", 500.0)));
        baseline.extend((0..5).map(|_| span("GET /b", 500.0)));

        let analyzer = SlowRequestAnalyzer::new(1.5);
        let report = report(analyzer.analyze(&current, &baseline));

        assert_eq!(report.flagged.len(), 2);
        assert_eq!(report.flagged[0].operation, "GET /a");
        assert_eq!(report.flagged[0].slowdown_factor, 8.0);
        assert_eq!(report.flagged[1].operation, "GET /b");
    }
}
