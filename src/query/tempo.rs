//! Tempo query client
//!
//! Searches Grafana Tempo for traces matching a tag set and extracts the
//! root operation name and duration of each as a [`Span`].

use crate::error::{Result, SiftError};
use crate::query::TraceQueryClient;
use crate::types::Span;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

/// Tempo search response envelope
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    traces: Vec<TraceSummary>,
}

#[derive(Debug, Deserialize)]
struct TraceSummary {
    #[serde(rename = "rootTraceName", default)]
    root_trace_name: Option<String>,

    #[serde(rename = "rootServiceName", default)]
    root_service_name: Option<String>,

    #[serde(rename = "durationMs", default)]
    duration_ms: f64,
}

/// Client for querying Grafana Tempo
pub struct TempoClient {
    base_url: String,
    limit: usize,
    client: reqwest::Client,
}

impl TempoClient {
    /// Create a Tempo client with a bounded per-call timeout
    pub fn new(base_url: &str, timeout: Duration, limit: usize) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        info!(url = %base_url, "initialized Tempo client");
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            limit,
            client,
        })
    }

    /// Render a tag set as Tempo's logfmt search expression
    fn render_tags(tags: &BTreeMap<String, String>) -> String {
        tags.iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl TraceQueryClient for TempoClient {
    async fn search_traces(
        &self,
        tags: &BTreeMap<String, String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Span>> {
        debug!(?tags, %start, %end, "searching Tempo");

        let mut params = vec![
            ("start", start.timestamp().to_string()),
            ("end", end.timestamp().to_string()),
            ("limit", self.limit.to_string()),
        ];
        if !tags.is_empty() {
            params.push(("tags", Self::render_tags(tags)));
        }

        let response = self
            .client
            .get(format!("{}/api/search", self.base_url))
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SiftError::Backend(format!(
                "Tempo returned HTTP {}: {}",
                status, body
            )));
        }

        let parsed: SearchResponse = response.json().await?;
        let spans = parsed
            .traces
            .into_iter()
            .map(|t| Span {
                operation: t
                    .root_trace_name
                    .or(t.root_service_name)
                    .unwrap_or_else(|| "unknown".to_string()),
                duration_ms: t.duration_ms,
            })
            .collect::<Vec<_>>();

        debug!(count = spans.len(), "Tempo search returned");
        Ok(spans)
    }
}
