//! Bootstrap configuration loading and settings resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Bootstrap configuration loaded from TOML file
///
/// Every section is optional; a missing file yields the compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Data folder holding the default SQLite database
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Folder classification and extraction settings
    #[serde(default)]
    pub ingest: IngestSection,

    /// Persistence backend settings
    #[serde(default)]
    pub persistence: PersistenceSection,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Which measurement export to read when a folder carries both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportPreference {
    #[default]
    Csv,
    Xml,
}

/// Path marker that scopes geometry records to a narrower leaf span
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LeafTemplateConfig {
    pub marker: String,
    pub first_leaf: u16,
    pub last_leaf: u16,
}

/// `[ingest]` section
#[derive(Debug, Clone, Deserialize)]
pub struct IngestSection {
    /// Path marker that turns a `6x` folder into a flattening-filter-free beam check
    #[serde(default = "default_fff_marker")]
    pub fff_marker: String,

    /// Path markers of templates that are deliberately not ingested
    #[serde(default = "default_exclusion_markers")]
    pub exclusion_markers: Vec<String>,

    /// Template markers with their own leaf span, checked in order
    #[serde(default = "default_leaf_templates")]
    pub leaf_templates: Vec<LeafTemplateConfig>,

    #[serde(default = "default_first_leaf")]
    pub default_first_leaf: u16,

    #[serde(default = "default_last_leaf")]
    pub default_last_leaf: u16,

    #[serde(default)]
    pub export_preference: ExportPreference,

    /// Run the profile-image analyzer (disable for test benches without images)
    #[serde(default = "default_true")]
    pub analyze_images: bool,
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            fff_marker: default_fff_marker(),
            exclusion_markers: default_exclusion_markers(),
            leaf_templates: default_leaf_templates(),
            default_first_leaf: default_first_leaf(),
            default_last_leaf: default_last_leaf(),
            export_preference: ExportPreference::default(),
            analyze_images: true,
        }
    }
}

/// `[persistence]` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersistenceSection {
    /// sqlx connection URL; defaults to `mpcp.db` under the root folder
    #[serde(default)]
    pub database_url: Option<String>,

    /// Hand records whose extraction or image merge failed to the database anyway
    #[serde(default)]
    pub persist_incomplete: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_fff_marker() -> String {
    "BeamCheckTemplate6xFFF".to_string()
}

fn default_exclusion_markers() -> Vec<String> {
    vec!["EnhancedMLC".to_string()]
}

fn default_leaf_templates() -> Vec<LeafTemplateConfig> {
    vec![LeafTemplateConfig {
        marker: "GeometryCheckTemplate6xMVkVEnhancedCouch".to_string(),
        first_leaf: 11,
        last_leaf: 50,
    }]
}

fn default_first_leaf() -> u16 {
    1
}

fn default_last_leaf() -> u16 {
    60
}

fn default_true() -> bool {
    true
}

impl TomlConfig {
    /// Parse a TOML bootstrap file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Locate and parse the bootstrap file, falling back to defaults
    ///
    /// An explicitly named file (CLI or environment) must exist and parse.
    /// A missing file at the platform locations is not an error. The source is
    /// returned so the caller can report it once logging is up.
    pub fn load_or_default(
        cli_arg: Option<&Path>,
        env_var_name: &str,
    ) -> Result<(Self, ConfigSource)> {
        let path = match explicit_config_file(cli_arg, env_var_name) {
            Some(path) => path,
            None => match platform_config_file() {
                Some(path) => path,
                None => return Ok((Self::default(), ConfigSource::Defaults)),
            },
        };
        let config = Self::load(&path)?;
        Ok((config, ConfigSource::File(path)))
    }
}

/// Where the bootstrap configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// No file at the platform locations
    Defaults,
}

fn explicit_config_file(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }
    std::env::var(env_var_name).ok().map(PathBuf::from)
}

/// First existing file among the per-user and system locations
fn platform_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("mpcp").join("config.toml"));
    if let Some(path) = user_config.filter(|p| p.exists()) {
        return Some(path);
    }

    let system_config = PathBuf::from("/etc/mpcp/config.toml");
    (cfg!(target_os = "linux") && system_config.exists()).then_some(system_config)
}

/// Root (data) folder resolution
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        return PathBuf::from(path);
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    get_default_root_folder()
}

/// Database URL resolution; the fallback is `mpcp.db` inside `root_folder`
pub fn resolve_database_url(
    cli_arg: Option<&str>,
    env_var_name: &str,
    config: &TomlConfig,
    root_folder: &Path,
) -> String {
    if let Some(url) = cli_arg {
        return url.to_string();
    }

    if let Ok(url) = std::env::var(env_var_name) {
        return url;
    }

    if let Some(url) = &config.persistence.database_url {
        return url.clone();
    }

    format!("sqlite://{}?mode=rwc", root_folder.join("mpcp.db").display())
}

/// Read a boolean environment override (`1/0`, `true/false`, `yes/no`)
///
/// Unset yields `Ok(None)`; an unrecognized value is an error rather than a silent default.
pub fn env_flag(env_var_name: &str) -> Result<Option<bool>> {
    let Ok(raw) = std::env::var(env_var_name) else {
        return Ok(None);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        other => Err(Error::InvalidInput(format!(
            "{} must be a boolean, got '{}'",
            env_var_name, other
        ))),
    }
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/mpcp (or /var/lib/mpcp for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("mpcp"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/mpcp"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\mpcp
        dirs::data_local_dir()
            .map(|d| d.join("mpcp"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\mpcp"))
    } else {
        dirs::data_dir()
            .map(|d| d.join("mpcp"))
            .unwrap_or_else(|| PathBuf::from("./mpcp_data"))
    }
}
