//! # MPC-Plus Common Library
//!
//! Shared code for the MPC-Plus crates:
//! - Error types
//! - TOML bootstrap configuration and settings resolution
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod time;

pub use config::{
    ConfigSource, ExportPreference, IngestSection, LeafTemplateConfig, LoggingConfig, PersistenceSection,
    TomlConfig,
};
pub use error::{Error, Result};
