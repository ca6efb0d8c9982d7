//! Ingest settings resolution for mpcp-etl
//!
//! Provides multi-tier resolution with CLI → ENV → TOML → built-in defaults.

use mpcp_common::config::env_flag;
use mpcp_common::{ConfigSource, ExportPreference, IngestSection, TomlConfig};
use tracing::{info, warn};

use crate::error::{IngestError, IngestResult};
use crate::models::LeafRange;

pub const ENV_ANALYZE_IMAGES: &str = "MPCP_ANALYZE_IMAGES";
pub const ENV_PERSIST_INCOMPLETE: &str = "MPCP_PERSIST_INCOMPLETE";

/// Template marker with its leaf span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafTemplate {
    pub marker: String,
    pub range: LeafRange,
}

/// Validated classification, extraction and persistence policy for one process
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub fff_marker: String,
    pub exclusion_markers: Vec<String>,
    pub leaf_templates: Vec<LeafTemplate>,
    pub default_leaf_range: LeafRange,
    pub export_preference: ExportPreference,
    pub analyze_images: bool,
    /// Hand records that failed after construction to the gateway anyway
    pub persist_incomplete: bool,
}

impl IngestSettings {
    /// Build from the TOML file, validating leaf ranges
    pub fn from_toml(config: &TomlConfig) -> IngestResult<Self> {
        let mut settings = Self::from_section(&config.ingest)?;
        settings.persist_incomplete = config.persistence.persist_incomplete;
        Ok(settings)
    }

    fn from_section(section: &IngestSection) -> IngestResult<Self> {
        let default_leaf_range =
            LeafRange::new(section.default_first_leaf, section.default_last_leaf)
                .map_err(|e| IngestError::Config(format!("ingest.default leaf range: {}", e)))?;

        let leaf_templates = section
            .leaf_templates
            .iter()
            .map(|t| {
                LeafRange::new(t.first_leaf, t.last_leaf)
                    .map(|range| LeafTemplate {
                        marker: t.marker.clone(),
                        range,
                    })
                    .map_err(|e| {
                        IngestError::Config(format!("ingest.leaf_templates '{}': {}", t.marker, e))
                    })
            })
            .collect::<IngestResult<Vec<_>>>()?;

        if section.fff_marker.trim().is_empty() {
            return Err(IngestError::Config(
                "ingest.fff_marker must not be empty".to_string(),
            ));
        }

        Ok(Self {
            fff_marker: section.fff_marker.clone(),
            exclusion_markers: section
                .exclusion_markers
                .iter()
                .filter(|m| !m.trim().is_empty())
                .cloned()
                .collect(),
            leaf_templates,
            default_leaf_range,
            export_preference: section.export_preference,
            analyze_images: section.analyze_images,
            persist_incomplete: false,
        })
    }

    /// Apply `MPCP_ANALYZE_IMAGES` / `MPCP_PERSIST_INCOMPLETE` over the TOML values
    pub fn with_env_overrides(mut self) -> IngestResult<Self> {
        if let Some(analyze) = env_flag(ENV_ANALYZE_IMAGES)? {
            info!("Image analysis {} by environment", if analyze { "enabled" } else { "disabled" });
            self.analyze_images = analyze;
        }
        if let Some(persist) = env_flag(ENV_PERSIST_INCOMPLETE)? {
            info!("Incomplete-record persistence set to {} by environment", persist);
            self.persist_incomplete = persist;
        }
        Ok(self)
    }
}

/// Report where the bootstrap configuration came from
///
/// Called once the subscriber is installed; loading happens before logging
/// can be configured.
pub fn log_config_source(source: &ConfigSource) {
    match source {
        ConfigSource::File(path) => info!(path = %path.display(), "Loaded config file"),
        ConfigSource::Defaults => warn!("No config file found; using built-in defaults"),
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        // The built-in section always validates
        match Self::from_section(&IngestSection::default()) {
            Ok(settings) => settings,
            Err(_) => Self {
                fff_marker: "BeamCheckTemplate6xFFF".to_string(),
                exclusion_markers: Vec::new(),
                leaf_templates: Vec::new(),
                default_leaf_range: LeafRange::default(),
                export_preference: ExportPreference::Csv,
                analyze_images: true,
                persist_incomplete: false,
            },
        }
    }
}
