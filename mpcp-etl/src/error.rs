//! Error types for mpcp-etl
//!
//! Every folder-level failure names the offending path so a reviewer can find the
//! measurement folder without re-running the pipeline.

use std::path::PathBuf;
use thiserror::Error;

use crate::models::InvalidTransition;

/// Tokens accepted by the classifier, in the order operators see them in diagnostics
pub const ACCEPTED_TOKENS: &str = "6e, 9e, 12e, 16e, 10x, 15x, 2.5x, 6x";

/// Path-encoded or marker-file metadata failures
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Folder name does not carry a required field
    #[error("{field} not found in {}: expected {expected}", .path.display())]
    NotFound {
        path: PathBuf,
        field: &'static str,
        expected: &'static str,
    },

    /// Sibling marker file absent
    #[error("Marker file missing: {} (every measurement folder must carry Check.xml with IsBaseline)", .path.display())]
    MarkerFileMissing { path: PathBuf },

    /// Marker file present but not readable as XML
    #[error("Marker file {} is unreadable: {reason}", .path.display())]
    MarkerFileMalformed { path: PathBuf, reason: String },
}

/// Measurement export failures
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Export file absent or unreadable
    #[error("Measurement export missing in {}: {reason}", .path.display())]
    Io { path: PathBuf, reason: String },

    /// Export present but malformed
    #[error("Malformed measurement export {}: {reason}", .path.display())]
    Format { path: PathBuf, reason: String },
}

/// Image analyzer failures
#[derive(Debug, Error)]
pub enum ImageAnalysisError {
    /// Detector image could not be decoded
    #[error("Cannot decode {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },

    /// Clinical, dark and flood frames disagree on geometry
    #[error("Image dimensions differ: clinical {clinical:?}, dark {dark:?}, flood {flood:?}")]
    DimensionMismatch {
        clinical: (usize, usize),
        dark: (usize, usize),
        flood: (usize, usize),
    },

    /// Corrected profile has no usable radiation field
    #[error("No radiation field found in {axis} profile")]
    NoField { axis: &'static str },
}

/// Persistence backend failures
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database path error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot encode column {column}: {reason}")]
    Encode { column: String, reason: String },

    #[error("Invalid table or column name: {0}")]
    InvalidIdentifier(String),
}

/// Folder pipeline error
#[derive(Debug, Error)]
pub enum IngestError {
    /// No beam-type token matched the folder path
    #[error("Unrecognized beam type for {}: path must contain one of: {}", .path.display(), ACCEPTED_TOKENS)]
    UnrecognizedBeamType { path: PathBuf },

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Image analysis failed for {}: {source}", .path.display())]
    ImageAnalysis {
        path: PathBuf,
        #[source]
        source: ImageAnalysisError,
    },

    #[error("Persistence failed for {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: PersistenceError,
    },

    #[error(transparent)]
    State(#[from] InvalidTransition),

    /// Invalid ingest configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// mpcp-common error
    #[error("Common error: {0}")]
    Common(#[from] mpcp_common::Error),
}

/// Result type for pipeline operations
pub type IngestResult<T> = Result<T, IngestError>;
