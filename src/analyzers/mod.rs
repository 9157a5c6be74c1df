//! Analysis algorithms for the Sift investigation engine
//!
//! Two analyzers compare a current window of observability data against a
//! baseline window of equal duration: one canonicalizes log lines into
//! patterns and flags rate spikes, the other summarizes trace durations per
//! operation and flags percentile regressions. Both are pure CPU-bound
//! computations over already-fetched data and never fail: empty or
//! degenerate input produces a completed report with zero findings.

pub mod error_pattern;
pub mod slow_request;

use crate::types::{AnalysisFindings, AnalysisKind};

pub use error_pattern::{normalize_line, ErrorPatternAnalyzer};
pub use slow_request::{percentile, SlowRequestAnalyzer};

/// Maximum findings reported per analysis (the rest is noise once sorted)
pub(crate) const MAX_REPORTED_FINDINGS: usize = 10;

/// Common contract for window-comparing analyzers
///
/// The two analyzers share no state, only this call shape; results are
/// distinguished by the tagged [`AnalysisFindings`] variants.
pub trait Analyzer {
    /// Record type consumed by this analyzer
    type Record;

    /// Which analysis this analyzer performs
    fn kind(&self) -> AnalysisKind;

    /// Compare a current window against a baseline window
    fn analyze(&self, current: &[Self::Record], baseline: &[Self::Record]) -> AnalysisFindings;
}
