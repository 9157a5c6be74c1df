//! Embedded SQLite store for investigations
//!
//! One row per investigation id; labels, analyses, and metadata are JSON
//! columns so new optional fields default safely when reading rows written
//! by older versions. Connection pooling via deadpool-sqlite keeps the
//! blocking rusqlite work off the async runtime.

use crate::error::{Result, SiftError};
use crate::storage::{InvestigationStore, ListFilter};
use crate::types::{Analysis, Investigation, InvestigationId, InvestigationStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_sqlite::{Config, Pool, Runtime};
use rusqlite::params;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// SQLite-backed investigation store
pub struct SqliteInvestigationStore {
    pool: Pool,
}

/// Flat row image, converted to/from [`Investigation`] outside the
/// connection closures so serde errors don't masquerade as database errors.
struct InvestigationRow {
    id: String,
    name: String,
    labels: String,
    start_time: String,
    end_time: Option<String>,
    status: String,
    analyses: String,
    created_at: String,
    updated_at: String,
    metadata: String,
}

impl SqliteInvestigationStore {
    /// Open (or create) the store at the given database file path
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path_str = db_path.as_ref().to_string_lossy().to_string();
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let config = Config::new(path_str.clone());
        let pool = config.create_pool(Runtime::Tokio1).map_err(|e| {
            SiftError::Database(format!("Failed to create connection pool: {}", e))
        })?;

        let store = Self { pool };
        store.init_schema().await?;
        info!(path = %path_str, "initialized investigation store");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn().await?;
        conn.interact(|conn| {
            conn.execute(
                r#"
                CREATE TABLE IF NOT EXISTS investigations (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    labels TEXT NOT NULL,
                    start_time TEXT NOT NULL,
                    end_time TEXT,
                    status TEXT NOT NULL,
                    analyses TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    metadata TEXT NOT NULL
                )
                "#,
                [],
            )
        })
        .await
        .map_err(|e| SiftError::Database(format!("Pool interaction failed: {}", e)))??;
        Ok(())
    }

    async fn conn(&self) -> Result<deadpool_sqlite::Object> {
        self.pool.get().await.map_err(|e| {
            SiftError::Database(format!("Failed to get connection from pool: {}", e))
        })
    }

    fn to_row(investigation: &Investigation) -> Result<InvestigationRow> {
        Ok(InvestigationRow {
            id: investigation.id.to_string(),
            name: investigation.name.clone(),
            labels: serde_json::to_string(&investigation.labels)?,
            start_time: investigation.start_time.to_rfc3339(),
            end_time: investigation.end_time.map(|t| t.to_rfc3339()),
            status: investigation.status.to_string(),
            analyses: serde_json::to_string(&investigation.analyses)?,
            created_at: investigation.created_at.to_rfc3339(),
            updated_at: investigation.updated_at.to_rfc3339(),
            metadata: serde_json::to_string(&investigation.metadata)?,
        })
    }

    fn from_row(row: InvestigationRow) -> Result<Investigation> {
        let labels: BTreeMap<String, String> = serde_json::from_str(&row.labels)?;
        let analyses: Vec<Analysis> = serde_json::from_str(&row.analyses)?;
        let metadata: BTreeMap<String, serde_json::Value> = serde_json::from_str(&row.metadata)?;
        let status: InvestigationStatus = serde_json::from_str(&format!("\"{}\"", row.status))?;

        Ok(Investigation {
            id: InvestigationId::from_string(&row.id)?,
            name: row.name,
            labels,
            start_time: Self::parse_ts(&row.start_time)?,
            end_time: row.end_time.as_deref().map(Self::parse_ts).transpose()?,
            status,
            analyses,
            created_at: Self::parse_ts(&row.created_at)?,
            updated_at: Self::parse_ts(&row.updated_at)?,
            metadata,
        })
    }

    fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| SiftError::Database(format!("Invalid timestamp in store: {}", e)))
    }

    fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<InvestigationRow> {
        Ok(InvestigationRow {
            id: row.get("id")?,
            name: row.get("name")?,
            labels: row.get("labels")?,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            status: row.get("status")?,
            analyses: row.get("analyses")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            metadata: row.get("metadata")?,
        })
    }
}

#[async_trait]
impl InvestigationStore for SqliteInvestigationStore {
    async fn save(&self, investigation: &Investigation) -> Result<()> {
        debug!(id = %investigation.id, status = %investigation.status, "saving investigation");
        let row = Self::to_row(investigation)?;

        let conn = self.conn().await?;
        conn.interact(move |conn| {
            conn.execute(
                r#"
                INSERT OR REPLACE INTO investigations
                (id, name, labels, start_time, end_time, status, analyses, created_at, updated_at, metadata)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    row.id,
                    row.name,
                    row.labels,
                    row.start_time,
                    row.end_time,
                    row.status,
                    row.analyses,
                    row.created_at,
                    row.updated_at,
                    row.metadata,
                ],
            )
        })
        .await
        .map_err(|e| SiftError::Database(format!("Pool interaction failed: {}", e)))??;

        Ok(())
    }

    async fn get(&self, id: InvestigationId) -> Result<Investigation> {
        let id_str = id.to_string();
        let conn = self.conn().await?;

        let row = conn
            .interact(move |conn| {
                conn.query_row(
                    "SELECT * FROM investigations WHERE id = ?1",
                    params![id_str],
                    Self::read_row,
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })
            })
            .await
            .map_err(|e| SiftError::Database(format!("Pool interaction failed: {}", e)))??;

        match row {
            Some(row) => Self::from_row(row),
            None => Err(SiftError::InvestigationNotFound(id.to_string())),
        }
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<Investigation>> {
        let status = filter.status.map(|s| s.to_string());
        let limit = filter.limit as i64;
        let conn = self.conn().await?;

        let rows = conn
            .interact(move |conn| -> rusqlite::Result<Vec<InvestigationRow>> {
                let (sql, use_status) = match status {
                    Some(_) => (
                        "SELECT * FROM investigations WHERE status = ?1 \
                         ORDER BY created_at DESC LIMIT ?2",
                        true,
                    ),
                    None => (
                        "SELECT * FROM investigations ORDER BY created_at DESC LIMIT ?1",
                        false,
                    ),
                };
                let mut stmt = conn.prepare(sql)?;
                let mapped = if use_status {
                    stmt.query_map(params![status.unwrap(), limit], Self::read_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?
                } else {
                    stmt.query_map(params![limit], Self::read_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?
                };
                Ok(mapped)
            })
            .await
            .map_err(|e| SiftError::Database(format!("Pool interaction failed: {}", e)))??;

        rows.into_iter().map(Self::from_row).collect()
    }

    async fn delete(&self, id: InvestigationId) -> Result<bool> {
        let id_str = id.to_string();
        let conn = self.conn().await?;

        let deleted = conn
            .interact(move |conn| {
                conn.execute("DELETE FROM investigations WHERE id = ?1", params![id_str])
            })
            .await
            .map_err(|e| SiftError::Database(format!("Pool interaction failed: {}", e)))??;

        if deleted > 0 {
            debug!(id = %id, "deleted investigation");
        }
        Ok(deleted > 0)
    }
}
