//! Persistence boundary
//!
//! The pipeline hands each finished record to a [`PersistenceGateway`] as a
//! flattened key/value record plus the table tag derived from its beam type.

pub mod sqlite;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::PersistenceError;
use crate::models::{FlatRecord, TableTag};

pub use sqlite::SqliteGateway;

/// Sink for finished beam records
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn persist(&self, table: &TableTag, record: &FlatRecord) -> Result<(), PersistenceError>;
}

/// Gateway that logs records instead of storing them (`--dry-run`)
#[derive(Debug, Default)]
pub struct DryRunGateway {
    persisted: Mutex<Vec<(TableTag, FlatRecord)>>,
}

impl DryRunGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records received so far, in call order
    pub async fn persisted(&self) -> Vec<(TableTag, FlatRecord)> {
        self.persisted.lock().await.clone()
    }
}

#[async_trait]
impl PersistenceGateway for DryRunGateway {
    async fn persist(&self, table: &TableTag, record: &FlatRecord) -> Result<(), PersistenceError> {
        tracing::info!(table = %table, record = %record.to_json(), "Dry run: record not stored");
        self.persisted
            .lock()
            .await
            .push((table.clone(), record.clone()));
        Ok(())
    }
}
