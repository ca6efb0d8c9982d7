//! Beam-type classification from folder paths
//!
//! Tokens are searched per path component, the measurement folder first. Within a
//! component the most specific token wins, and a token only counts when it is not
//! glued to a preceding digit or decimal point (`16e` never reads as `6e`).

use std::path::Path;

use crate::config::IngestSettings;
use crate::error::{IngestError, IngestResult};
use crate::models::{BeamType, LeafRange};
use crate::services::path_metadata::nearest_components;

/// Token search order: electron, then x-ray, then geometry
const TOKEN_PRIORITY: [(&str, BeamType); 8] = [
    ("16e", BeamType::E16),
    ("12e", BeamType::E12),
    ("9e", BeamType::E9),
    ("6e", BeamType::E6),
    ("2.5x", BeamType::X2_5),
    ("10x", BeamType::X10),
    ("15x", BeamType::X15),
    ("6x", BeamType::X6),
];

/// Outcome of classifying one folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Beam(BeamType),
    /// Template deliberately not ingested; the run is a no-op
    Excluded { marker: String },
}

/// Beam classifier service
#[derive(Debug, Clone)]
pub struct BeamClassifier {
    settings: IngestSettings,
}

impl BeamClassifier {
    pub fn new(settings: IngestSettings) -> Self {
        Self { settings }
    }

    pub fn classify(&self, path: &Path) -> IngestResult<Classification> {
        let full = path.to_string_lossy();

        if let Some(marker) = self
            .settings
            .exclusion_markers
            .iter()
            .find(|m| full.contains(m.as_str()))
        {
            tracing::info!(
                folder = %path.display(),
                marker = %marker,
                "Excluded template, skipping folder"
            );
            return Ok(Classification::Excluded {
                marker: marker.clone(),
            });
        }

        let beam_type = nearest_components(path)
            .find_map(|component| match_token(&component))
            .ok_or_else(|| IngestError::UnrecognizedBeamType {
                path: path.to_path_buf(),
            })?;

        let beam_type = if beam_type == BeamType::X6 && full.contains(&self.settings.fff_marker) {
            BeamType::X6Fff
        } else {
            beam_type
        };

        tracing::debug!(folder = %path.display(), beam_type = %beam_type, "Classified folder");
        Ok(Classification::Beam(beam_type))
    }

    /// Leaf span for a geometry folder: first matching template, else the default
    pub fn leaf_range(&self, path: &Path) -> LeafRange {
        let full = path.to_string_lossy();
        self.settings
            .leaf_templates
            .iter()
            .find(|t| full.contains(t.marker.as_str()))
            .map(|t| t.range)
            .unwrap_or(self.settings.default_leaf_range)
    }
}

fn match_token(component: &str) -> Option<BeamType> {
    TOKEN_PRIORITY
        .iter()
        .find(|(token, _)| contains_token(component, token))
        .map(|(_, beam_type)| *beam_type)
}

fn contains_token(haystack: &str, token: &str) -> bool {
    haystack.match_indices(token).any(|(start, _)| {
        haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |prev| !(prev.is_ascii_digit() || prev == '.'))
    })
}
