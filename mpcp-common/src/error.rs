//! Errors shared by the MPC-Plus crates

use std::path::PathBuf;
use thiserror::Error;

/// Result alias over [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised while bootstrapping config and paths
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem failure while resolving folders or opening files
    #[error("Filesystem: {0}")]
    Io(#[from] std::io::Error),

    /// TOML bootstrap file could not be parsed
    #[error("Invalid config file {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A command-line argument or environment override was rejected
    #[error("Rejected argument: {0}")]
    InvalidInput(String),
}
