//! Measurement folder discovery
//!
//! A measurement folder is any directory holding `Results.csv` or `Results.xml`.
//! Traversal is sequential and sorted so batch runs process folders in a stable order.
//! Symbolic links are not followed, so a linked folder is never ingested twice.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use crate::services::numeric_extractor::{RESULTS_CSV, RESULTS_XML};

#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

/// Measurement folder scanner
#[derive(Debug, Clone)]
pub struct FolderScanner {
    ignore_patterns: Vec<String>,
    max_depth: Option<usize>,
}

impl Default for FolderScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl FolderScanner {
    /// Scanner with default ignore patterns (`.git`, `.DS_Store`, `Thumbs.db`, ...)
    pub fn new() -> Self {
        Self {
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
                ".svn".to_string(),
                "$RECYCLE.BIN".to_string(),
            ],
            max_depth: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Directories under `root` (inclusive) that carry a measurement export
    pub fn scan(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .max_depth(self.max_depth.unwrap_or(usize::MAX))
            .into_iter()
            .filter_entry(|e| !self.is_ignored(e));

        let mut folders = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_dir() && is_measurement_folder(entry.path()) {
                        folders.push(entry.path().to_path_buf());
                    }
                }
                Err(e) => {
                    // Unreadable subtrees are skipped, the rest of the scan continues
                    tracing::warn!("Error accessing entry: {}", e);
                }
            }
        }

        tracing::debug!(
            root = %root.display(),
            folders = folders.len(),
            "Measurement folder scan complete"
        );
        Ok(folders)
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        let file_name = entry.file_name().to_string_lossy();
        self.ignore_patterns
            .iter()
            .any(|pattern| file_name.contains(pattern.as_str()))
    }
}

pub fn is_measurement_folder(path: &Path) -> bool {
    path.join(RESULTS_CSV).is_file() || path.join(RESULTS_XML).is_file()
}
