//! Loki query client
//!
//! Issues LogQL range queries against Grafana Loki's HTTP API and flattens
//! the stream-shaped response into [`LogRecord`]s.

use crate::error::{Result, SiftError};
use crate::query::LogQueryClient;
use crate::types::LogRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Loki query_range response envelope
#[derive(Debug, Deserialize)]
struct QueryRangeResponse {
    status: String,
    #[serde(default)]
    data: QueryRangeData,
}

#[derive(Debug, Default, Deserialize)]
struct QueryRangeData {
    #[serde(default)]
    result: Vec<LokiStream>,
}

#[derive(Debug, Deserialize)]
struct LokiStream {
    #[serde(default)]
    #[allow(dead_code)]
    stream: HashMap<String, String>,

    /// Pairs of (nanosecond timestamp string, line text)
    #[serde(default)]
    values: Vec<(String, String)>,
}

/// Loki labels / label-values response envelope
#[derive(Debug, Deserialize)]
struct LabelsResponse {
    status: String,
    #[serde(default)]
    data: Vec<String>,
}

/// Client for querying Grafana Loki
pub struct LokiClient {
    base_url: String,
    limit: usize,
    client: reqwest::Client,
}

impl LokiClient {
    /// Create a Loki client with a bounded per-call timeout
    pub fn new(base_url: &str, timeout: Duration, limit: usize) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        info!(url = %base_url, "initialized Loki client");
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            limit,
            client,
        })
    }

    fn nanos(ts: DateTime<Utc>) -> i64 {
        ts.timestamp_nanos_opt().unwrap_or(i64::MAX)
    }

    /// List label names known to the backend over a time window
    pub async fn query_labels(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let url = format!("{}/loki/api/v1/labels", self.base_url);
        self.fetch_labels(&url, start, end).await
    }

    /// List known values for one label over a time window
    pub async fn query_label_values(
        &self,
        label: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let url = format!("{}/loki/api/v1/label/{}/values", self.base_url, label);
        self.fetch_labels(&url, start, end).await
    }

    async fn fetch_labels(
        &self,
        url: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let response = self
            .client
            .get(url)
            .query(&[
                ("start", Self::nanos(start).to_string()),
                ("end", Self::nanos(end).to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SiftError::Backend(format!(
                "Loki returned HTTP {}: {}",
                status, body
            )));
        }

        let parsed: LabelsResponse = response.json().await?;
        if parsed.status != "success" {
            return Err(SiftError::Backend(format!(
                "Loki label query status: {}",
                parsed.status
            )));
        }
        Ok(parsed.data)
    }
}

#[async_trait]
impl LogQueryClient for LokiClient {
    async fn query_range(
        &self,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LogRecord>> {
        debug!(%query, %start, %end, "querying Loki");

        let response = self
            .client
            .get(format!("{}/loki/api/v1/query_range", self.base_url))
            .query(&[
                ("query", query.to_string()),
                ("start", Self::nanos(start).to_string()),
                ("end", Self::nanos(end).to_string()),
                ("limit", self.limit.to_string()),
                ("direction", "backward".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SiftError::Backend(format!(
                "Loki returned HTTP {}: {}",
                status, body
            )));
        }

        let parsed: QueryRangeResponse = response.json().await?;
        if parsed.status != "success" {
            return Err(SiftError::Backend(format!(
                "Loki query status: {}",
                parsed.status
            )));
        }

        let mut records = Vec::new();
        for stream in parsed.data.result {
            for (ts, line) in stream.values {
                let nanos: i64 = ts.parse().unwrap_or_default();
                let timestamp = DateTime::from_timestamp(
                    nanos.div_euclid(1_000_000_000),
                    nanos.rem_euclid(1_000_000_000) as u32,
                )
                .unwrap_or_else(Utc::now);
                records.push(LogRecord { timestamp, line });
            }
        }

        debug!(count = records.len(), "Loki query returned");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_response_flattening() {
        let body = r#"{
            "status": "success",
            "data": {
                "resultType": "streams",
                "result": [
                    {
                        "stream": {"namespace": "api"},
                        "values": [
                            ["1700000000000000000", "ERROR: boom"],
                            ["1700000001000000000", "ok"]
                        ]
                    }
                ]
            }
        }"#;

        let parsed: QueryRangeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.status, "success");
        assert_eq!(parsed.data.result.len(), 1);
        assert_eq!(parsed.data.result[0].values.len(), 2);
        assert_eq!(parsed.data.result[0].values[0].1, "ERROR: boom");
    }

    #[test]
    fn test_error_status_detected() {
        let body = r#"{"status": "error"}"#;
        let parsed: QueryRangeResponse = serde_json::from_str(body).unwrap();
        assert_ne!(parsed.status, "success");
        assert!(parsed.data.result.is_empty());
    }
}
