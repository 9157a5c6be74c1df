//! Investigation store round-trip and filtering tests

mod common;

use chrono::{Duration, Utc};
use common::{create_test_store, log, span};
use sift_core::{
    analyzers::{Analyzer, ErrorPatternAnalyzer, SlowRequestAnalyzer},
    Analysis, Investigation, InvestigationId, InvestigationStatus, InvestigationStore, ListFilter,
    SiftError,
};
use std::collections::BTreeMap;

fn sample_investigation(name: &str) -> Investigation {
    let mut labels = BTreeMap::new();
    labels.insert("namespace".to_string(), "api".to_string());
    labels.insert("pod".to_string(), "api-7f9".to_string());

    let end = Utc::now();
    Investigation::new(name, labels, end - Duration::minutes(30), Some(end))
}

/// Populate an investigation with findings from both analyzers
fn with_analyses(mut investigation: Investigation) -> Investigation {
    let current_logs = vec![log("ERROR: Database connection failed"), log("ok")];
    let baseline_logs = vec![log("ok"), log("ok")];
    let error_findings = ErrorPatternAnalyzer::new(2.0).analyze(&current_logs, &baseline_logs);

    let current_spans = vec![span("GET /api", 5000.0)];
    let baseline_spans = vec![span("GET /api", 1000.0)];
    let slow_findings = SlowRequestAnalyzer::new(2.0).analyze(&current_spans, &baseline_spans);

    let started_at = Utc::now();
    let mut metadata = BTreeMap::new();
    metadata.insert("log_query".to_string(), r#"{namespace="api"}"#.to_string());

    investigation.push_analysis(Analysis::new(error_findings, started_at, metadata));
    investigation.push_analysis(Analysis::new(slow_findings, started_at, BTreeMap::new()));
    investigation.set_status(InvestigationStatus::Completed);
    investigation
}

#[tokio::test]
async fn test_round_trip_preserves_all_fields() {
    let (_dir, store) = create_test_store().await;

    let mut investigation = with_analyses(sample_investigation("round trip"));
    investigation
        .metadata
        .insert("note".to_string(), serde_json::json!({"k": [1, 2, 3]}));

    store.save(&investigation).await.unwrap();
    let fetched = store.get(investigation.id).await.unwrap();

    // Field-exact comparison via the serialized form.
    assert_eq!(
        serde_json::to_value(&fetched).unwrap(),
        serde_json::to_value(&investigation).unwrap()
    );
    assert_eq!(fetched.analyses.len(), 2);
}

#[tokio::test]
async fn test_save_is_an_upsert() {
    let (_dir, store) = create_test_store().await;

    let mut investigation = sample_investigation("upsert");
    store.save(&investigation).await.unwrap();

    investigation.set_status(InvestigationStatus::Running);
    store.save(&investigation).await.unwrap();

    let fetched = store.get(investigation.id).await.unwrap();
    assert_eq!(fetched.status, InvestigationStatus::Running);

    let all = store.list(&ListFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_list_filters_by_status_newest_first() {
    let (_dir, store) = create_test_store().await;

    let now = Utc::now();
    for (i, status) in [
        InvestigationStatus::Pending,
        InvestigationStatus::Completed,
        InvestigationStatus::Failed,
        InvestigationStatus::Completed,
    ]
    .into_iter()
    .enumerate()
    {
        let mut investigation = sample_investigation(&format!("inv-{}", i));
        investigation.created_at = now - Duration::minutes((10 - i as i64) * 5);
        investigation.status = status;
        store.save(&investigation).await.unwrap();
    }

    let completed = store
        .list(&ListFilter {
            status: Some(InvestigationStatus::Completed),
            limit: 10,
        })
        .await
        .unwrap();
    assert_eq!(completed.len(), 2);
    // Newest first.
    assert_eq!(completed[0].name, "inv-3");
    assert_eq!(completed[1].name, "inv-1");

    let limited = store
        .list(&ListFilter {
            status: None,
            limit: 2,
        })
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].name, "inv-3");
}

#[tokio::test]
async fn test_get_missing_is_not_found() {
    let (_dir, store) = create_test_store().await;

    let err = store.get(InvestigationId::new()).await.unwrap_err();
    assert!(matches!(err, SiftError::InvestigationNotFound(_)));
}

#[tokio::test]
async fn test_delete_reports_existence() {
    let (_dir, store) = create_test_store().await;

    let investigation = with_analyses(sample_investigation("to delete"));
    store.save(&investigation).await.unwrap();

    assert!(store.delete(investigation.id).await.unwrap());
    assert!(!store.delete(investigation.id).await.unwrap());

    // Analyses are owned by the investigation row, so nothing lingers.
    let all = store.list(&ListFilter::default()).await.unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn test_store_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("sift_test.db");

    let investigation = with_analyses(sample_investigation("durable"));
    {
        let store = sift_core::SqliteInvestigationStore::new(&path).await.unwrap();
        store.save(&investigation).await.unwrap();
    }

    let reopened = sift_core::SqliteInvestigationStore::new(&path).await.unwrap();
    let fetched = reopened.get(investigation.id).await.unwrap();
    assert_eq!(fetched.name, "durable");
    assert_eq!(fetched.status, InvestigationStatus::Completed);
    assert_eq!(fetched.analyses.len(), 2);
}
