//! Folder-name metadata resolution
//!
//! The console names each measurement folder
//! `...-SN<digits>-YYYY-MM-DD-HH-MM-SS-...-<Template>` and drops a `Check.xml`
//! marker next to the export. Acquisition time and serial come from the name,
//! the baseline flag from the marker.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

use mpcp_common::time::parse_folder_timestamp;

use crate::error::MetadataError;
use crate::models::{MachineSerial, PathMetadata};

/// Marker file carrying `IsBaseline`
pub const MARKER_FILE: &str = "Check.xml";

static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2}").expect("Invalid timestamp regex")
});

static SERIAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"SN(\d+)").expect("Invalid serial regex"));

/// Path components, the folder itself first, then its ancestors
pub(crate) fn nearest_components(path: &Path) -> impl Iterator<Item = Cow<'_, str>> {
    path.components()
        .rev()
        .map(|c| c.as_os_str().to_string_lossy())
}

/// Metadata resolver service
#[derive(Debug, Clone, Default)]
pub struct PathMetadataResolver;

impl PathMetadataResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve all three fields for a measurement folder
    ///
    /// The marker file is read last so path problems are reported without touching disk.
    pub fn resolve(&self, folder: &Path) -> Result<PathMetadata, MetadataError> {
        let acquisition_time = self.acquisition_time(folder)?;
        let machine_serial = self.machine_serial(folder)?;
        let is_baseline = self.is_baseline(folder)?;

        tracing::debug!(
            folder = %folder.display(),
            serial = %machine_serial,
            acquired = %acquisition_time,
            is_baseline,
            "Resolved folder metadata"
        );

        Ok(PathMetadata {
            acquisition_time,
            machine_serial,
            is_baseline,
        })
    }

    /// First valid `YYYY-MM-DD-HH-MM-SS` run, nearest component first
    pub fn acquisition_time(&self, path: &Path) -> Result<NaiveDateTime, MetadataError> {
        nearest_components(path)
            .find_map(|component| {
                TIMESTAMP_RE
                    .find_iter(&component)
                    .find_map(|m| parse_folder_timestamp(m.as_str()))
            })
            .ok_or_else(|| MetadataError::NotFound {
                path: path.to_path_buf(),
                field: "acquisition time",
                expected: "a valid YYYY-MM-DD-HH-MM-SS timestamp in the folder name",
            })
    }

    /// `SN<digits>`, nearest component first
    pub fn machine_serial(&self, path: &Path) -> Result<MachineSerial, MetadataError> {
        nearest_components(path)
            .find_map(|component| {
                SERIAL_RE
                    .captures(&component)
                    .and_then(|caps| caps.get(1))
                    .and_then(|digits| MachineSerial::from_digits(digits.as_str()))
            })
            .ok_or_else(|| MetadataError::NotFound {
                path: path.to_path_buf(),
                field: "machine serial",
                expected: "SN<digits> in the folder name",
            })
    }

    /// Read `IsBaseline` from the folder's marker file; absence is an error, never `false`
    pub fn is_baseline(&self, folder: &Path) -> Result<bool, MetadataError> {
        let marker = marker_path(folder);
        if !marker.is_file() {
            return Err(MetadataError::MarkerFileMissing { path: marker });
        }

        let text = std::fs::read_to_string(&marker).map_err(|e| {
            MetadataError::MarkerFileMalformed {
                path: marker.clone(),
                reason: e.to_string(),
            }
        })?;

        let doc = roxmltree::Document::parse(&text).map_err(|e| {
            MetadataError::MarkerFileMalformed {
                path: marker.clone(),
                reason: e.to_string(),
            }
        })?;

        // Matched by local name: console builds disagree on the namespace URI
        let value = doc
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name() == "IsBaseline")
            .and_then(|n| n.text())
            .map(|t| t.trim().to_ascii_lowercase());

        match value.as_deref() {
            Some("true") | Some("1") => Ok(true),
            Some("false") | Some("0") => Ok(false),
            _ => Err(MetadataError::NotFound {
                path: marker,
                field: "IsBaseline",
                expected: "a boolean IsBaseline element",
            }),
        }
    }
}

fn marker_path(folder: &Path) -> PathBuf {
    folder.join(MARKER_FILE)
}
