//! Common test utilities and helpers

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sift_core::{
    LogQueryClient, LogRecord, Result, SiftError, Span, SqliteInvestigationStore, TraceQueryClient,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create a temp-file backed store; keep the TempDir alive for the test
pub async fn create_test_store() -> (TempDir, Arc<SqliteInvestigationStore>) {
    let dir = TempDir::new().expect("temp dir");
    let store = SqliteInvestigationStore::new(dir.path().join("sift_test.db"))
        .await
        .expect("Failed to create test store");
    (dir, Arc::new(store))
}

pub fn log(line: &str) -> LogRecord {
    LogRecord {
        timestamp: Utc::now(),
        line: line.to_string(),
    }
}

pub fn span(operation: &str, duration_ms: f64) -> Span {
    Span {
        operation: operation.to_string(),
        duration_ms,
    }
}

/// Fake log client serving canned windows, split on a pivot timestamp
/// (queries ending at or before the pivot get the baseline window)
pub struct FakeLogClient {
    pivot: DateTime<Utc>,
    current: Vec<LogRecord>,
    baseline: Vec<LogRecord>,
    fail: bool,
    pub seen_queries: Mutex<Vec<String>>,
}

impl FakeLogClient {
    pub fn new(pivot: DateTime<Utc>, current: Vec<LogRecord>, baseline: Vec<LogRecord>) -> Self {
        Self {
            pivot,
            current,
            baseline,
            fail: false,
            seen_queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(pivot: DateTime<Utc>) -> Self {
        Self {
            fail: true,
            ..Self::new(pivot, Vec::new(), Vec::new())
        }
    }
}

#[async_trait]
impl LogQueryClient for FakeLogClient {
    async fn query_range(
        &self,
        query: &str,
        _start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LogRecord>> {
        self.seen_queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(SiftError::Backend("Loki returned HTTP 503".to_string()));
        }
        if end <= self.pivot {
            Ok(self.baseline.clone())
        } else {
            Ok(self.current.clone())
        }
    }
}

/// Fake trace client serving canned windows, split on a pivot timestamp
pub struct FakeTraceClient {
    pivot: DateTime<Utc>,
    current: Vec<Span>,
    baseline: Vec<Span>,
    fail: bool,
    pub seen_tags: Mutex<Vec<BTreeMap<String, String>>>,
}

impl FakeTraceClient {
    pub fn new(pivot: DateTime<Utc>, current: Vec<Span>, baseline: Vec<Span>) -> Self {
        Self {
            pivot,
            current,
            baseline,
            fail: false,
            seen_tags: Mutex::new(Vec::new()),
        }
    }

    #[allow(dead_code)]
    pub fn failing(pivot: DateTime<Utc>) -> Self {
        Self {
            fail: true,
            ..Self::new(pivot, Vec::new(), Vec::new())
        }
    }
}

#[async_trait]
impl TraceQueryClient for FakeTraceClient {
    async fn search_traces(
        &self,
        tags: &BTreeMap<String, String>,
        _start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Span>> {
        self.seen_tags.lock().unwrap().push(tags.clone());
        if self.fail {
            return Err(SiftError::Backend("Tempo returned HTTP 503".to_string()));
        }
        if end <= self.pivot {
            Ok(self.baseline.clone())
        } else {
            Ok(self.current.clone())
        }
    }
}
