//! Storage layer for Sift investigations
//!
//! Provides the store abstraction the engine persists through, plus the
//! embedded SQLite implementation. Implementations must treat `save` as an
//! atomic upsert keyed by investigation id so concurrent runs serialize on
//! the store (last write wins).

pub mod sqlite;

use crate::error::Result;
use crate::types::{Investigation, InvestigationId, InvestigationStatus};
use async_trait::async_trait;

pub use sqlite::SqliteInvestigationStore;

/// Filter for listing investigations
#[derive(Debug, Clone)]
pub struct ListFilter {
    /// Only return investigations in this status
    pub status: Option<InvestigationStatus>,

    /// Maximum number of records, newest first
    pub limit: usize,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: 50,
        }
    }
}

/// Durable persistence for investigation records
#[async_trait]
pub trait InvestigationStore: Send + Sync {
    /// Insert or replace an investigation, keyed by id
    async fn save(&self, investigation: &Investigation) -> Result<()>;

    /// Fetch an investigation by id
    async fn get(&self, id: InvestigationId) -> Result<Investigation>;

    /// List investigations, newest first (linear scan is acceptable)
    async fn list(&self, filter: &ListFilter) -> Result<Vec<Investigation>>;

    /// Delete an investigation; returns whether a record existed
    async fn delete(&self, id: InvestigationId) -> Result<bool>;
}
