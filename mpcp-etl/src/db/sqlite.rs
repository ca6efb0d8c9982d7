//! SQLite persistence gateway
//!
//! One table per table tag, created on first use from the record's columns.
//! Columns a later record introduces are added with `ALTER TABLE`, so geometry
//! and beam tables grow with the flattening without a migration step.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tokio::sync::Mutex;

use mpcp_common::time::{now, utc_to_iso8601};

use super::PersistenceGateway;
use crate::error::PersistenceError;
use crate::models::{ColumnKind, FlatRecord, FlatValue, TableTag};

/// Column stamped on every inserted row
pub const INGESTED_AT_COLUMN: &str = "ingested_at";

#[derive(Debug, sqlx::FromRow)]
struct TableColumn {
    name: String,
}

/// Gateway backed by a scoped SQLite pool
#[derive(Debug)]
pub struct SqliteGateway {
    pool: SqlitePool,
    /// Columns seen per table this session
    known_columns: Mutex<HashMap<String, HashSet<String>>>,
}

impl SqliteGateway {
    /// Connect to `database_url` (e.g. `sqlite:///data/mpcp.db?mode=rwc`)
    pub async fn connect(database_url: &str) -> Result<Self, PersistenceError> {
        if let Some(path) = sqlite_file_path(database_url) {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::debug!("Connecting to database: {}", database_url);
        let pool = SqlitePool::connect(database_url).await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            known_columns: Mutex::new(HashMap::new()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Release the pool; pending writes complete first
    pub async fn close(self) {
        self.pool.close().await;
    }

    async fn ensure_table(&self, table: &str, record: &FlatRecord) -> Result<(), PersistenceError> {
        let mut known = self.known_columns.lock().await;
        if let Some(columns) = known.get(table) {
            if record.keys().all(|k| columns.contains(k)) {
                return Ok(());
            }
        }

        let mut definitions = vec![
            "id INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
            format!("{} TEXT NOT NULL", quote(INGESTED_AT_COLUMN)),
        ];
        for (name, value) in record.iter() {
            definitions.push(format!("{} {}", quote(name), value.kind().sql_type()));
        }
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote(table),
            definitions.join(", ")
        );
        sqlx::query(&sql).execute(&self.pool).await?;

        // The table may predate this record's columns
        let mut existing: HashSet<String> =
            sqlx::query_as::<_, TableColumn>(&format!("PRAGMA table_info({})", quote(table)))
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|c| c.name)
                .collect();
        for (name, value) in record.iter() {
            if !existing.contains(name) {
                let sql = format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    quote(table),
                    quote(name),
                    value.kind().sql_type()
                );
                sqlx::query(&sql).execute(&self.pool).await?;
                tracing::info!(table = %table, column = %name, "Column added");
                existing.insert(name.to_string());
            }
        }

        tracing::debug!(table = %table, columns = existing.len(), "Table ready");
        known.insert(table.to_string(), existing);
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for SqliteGateway {
    async fn persist(&self, table: &TableTag, record: &FlatRecord) -> Result<(), PersistenceError> {
        validate_identifier(table.as_str())?;
        for (name, value) in record.iter() {
            validate_identifier(name)?;
            if let FlatValue::Real(v) = value {
                if !v.is_finite() {
                    return Err(PersistenceError::Encode {
                        column: name.to_string(),
                        reason: format!("non-finite value {}", v),
                    });
                }
            }
        }

        self.ensure_table(table.as_str(), record).await?;

        let names: Vec<String> = std::iter::once(INGESTED_AT_COLUMN)
            .chain(record.keys())
            .map(quote)
            .collect();
        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(table.as_str()),
            names.join(", "),
            placeholders
        );

        let mut query = sqlx::query(&sql).bind(utc_to_iso8601(&now()));
        for (_, value) in record.iter() {
            query = match value {
                FlatValue::Real(v) => query.bind(*v),
                FlatValue::Text(s) => query.bind(s.clone()),
                FlatValue::Bool(b) => query.bind(*b),
                FlatValue::Json(j) => query.bind(j.to_string()),
                FlatValue::Null(ColumnKind::Real) => query.bind(Option::<f64>::None),
                FlatValue::Null(ColumnKind::Bool) => query.bind(Option::<bool>::None),
                FlatValue::Null(ColumnKind::Text | ColumnKind::Json) => {
                    query.bind(Option::<String>::None)
                }
            };
        }
        query.execute(&self.pool).await?;

        tracing::debug!(table = %table, columns = record.len(), "Record stored");
        Ok(())
    }
}

/// Identifiers are interpolated into SQL, so only `[a-z0-9_]` is accepted
fn validate_identifier(name: &str) -> Result<(), PersistenceError> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(PersistenceError::InvalidIdentifier(name.to_string()))
    }
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name)
}

/// File path of a `sqlite:` URL, if it names a file
fn sqlite_file_path(url: &str) -> Option<&Path> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(Path::new(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn temp_gateway() -> (TempDir, SqliteGateway) {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let gateway = SqliteGateway::connect(&url).await.unwrap();
        (dir, gateway)
    }

    #[test]
    fn test_identifier_validation() {
        assert!(validate_identifier("beam_2_5x").is_ok());
        assert!(validate_identifier("mlc_leaves_a").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("2x").is_err());
        assert!(validate_identifier("beam\"; DROP TABLE x; --").is_err());
        assert!(validate_identifier("Beam_6e").is_err());
    }

    #[test]
    fn test_sqlite_file_path() {
        assert_eq!(
            sqlite_file_path("sqlite:///data/mpcp.db?mode=rwc"),
            Some(Path::new("/data/mpcp.db"))
        );
        assert_eq!(sqlite_file_path("sqlite:mpcp.db"), Some(Path::new("mpcp.db")));
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
        assert_eq!(sqlite_file_path("postgres://host/db"), None);
    }

    #[tokio::test]
    async fn test_round_trip() {
        let (_dir, gateway) = temp_gateway().await;
        let mut record = FlatRecord::new();
        record.push("beam_type", FlatValue::Text("6e".into()));
        record.push("relative_output", FlatValue::Real(0.98));
        record.push("flatness_horizontal", FlatValue::Null(ColumnKind::Real));

        let tag = TableTag::new("beam_6e");
        gateway.persist(&tag, &record).await.unwrap();
        gateway.persist(&tag, &record).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM beam_6e")
            .fetch_one(gateway.pool())
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_later_columns_are_added() {
        let (_dir, gateway) = temp_gateway().await;
        let tag = TableTag::new("beam_10x");

        let mut first = FlatRecord::new();
        first.push("relative_output", FlatValue::Real(1.0));
        gateway.persist(&tag, &first).await.unwrap();

        let mut second = first.clone();
        second.push("note", FlatValue::Text("partial".into()));
        gateway.persist(&tag, &second).await.unwrap();

        let note: Option<String> =
            sqlx::query_scalar("SELECT note FROM beam_10x ORDER BY id DESC LIMIT 1")
                .fetch_one(gateway.pool())
                .await
                .unwrap();
        assert_eq!(note.as_deref(), Some("partial"));
    }

    #[tokio::test]
    async fn test_non_finite_rejected() {
        let (_dir, gateway) = temp_gateway().await;
        let mut record = FlatRecord::new();
        record.push("relative_output", FlatValue::Real(f64::NAN));
        let err = gateway
            .persist(&TableTag::new("beam_6e"), &record)
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Encode { .. }));
    }
}
