//! mpcp-etl library interface
//!
//! Turns MPC measurement folders into typed beam records and hands them to a
//! persistence gateway. Exposed as a library for the binary and integration tests.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::config::IngestSettings;
pub use crate::db::{DryRunGateway, PersistenceGateway, SqliteGateway};
pub use crate::error::{IngestError, IngestResult};
pub use crate::services::{BeamTypeDispatcher, FolderOutcome, ScanSummary};
