//! Database Test Utilities
//!
//! Temporary SQLite gateways, schema inspection and a gateway that always fails

use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

use mpcp_etl::error::PersistenceError;
use mpcp_etl::models::{FlatRecord, TableTag};
use mpcp_etl::{PersistenceGateway, SqliteGateway};

/// Column information from PRAGMA table_info
#[derive(Debug, sqlx::FromRow)]
pub struct ColumnInfo {
    pub cid: i32,
    pub name: String,
    pub r#type: String,
    pub notnull: i32,
    pub dflt_value: Option<String>,
    pub pk: i32,
}

/// File-backed gateway in a fresh directory
///
/// Returns (TempDir, SqliteGateway) - TempDir must be kept alive for duration of test
pub async fn temp_gateway() -> Result<(TempDir, SqliteGateway)> {
    let temp_dir = TempDir::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_dir.path().join("mpcp.db").display());
    let gateway = SqliteGateway::connect(&db_url).await?;
    Ok((temp_dir, gateway))
}

/// Get table schema information
pub async fn get_table_columns(pool: &SqlitePool, table_name: &str) -> Result<Vec<ColumnInfo>> {
    let query = format!("PRAGMA table_info({})", table_name);
    let columns = sqlx::query_as::<_, ColumnInfo>(&query)
        .fetch_all(pool)
        .await?;
    Ok(columns)
}

/// Check if table has specific column
pub async fn has_column(pool: &SqlitePool, table_name: &str, column_name: &str) -> Result<bool> {
    let columns = get_table_columns(pool, table_name).await?;
    Ok(columns.iter().any(|c| c.name == column_name))
}

/// Gateway whose every call fails, counting attempts
#[derive(Debug, Default)]
pub struct FailingGateway {
    attempts: AtomicUsize,
}

impl FailingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistenceGateway for FailingGateway {
    async fn persist(&self, table: &TableTag, _record: &FlatRecord) -> Result<(), PersistenceError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(PersistenceError::InvalidIdentifier(format!(
            "{} (rejected by test gateway)",
            table
        )))
    }
}
