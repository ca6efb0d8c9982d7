//! Bootstrap configuration resolution tests
//!
//! Environment variables are process-global, so every test touching them runs serially.

use mpcp_common::config::{env_flag, resolve_database_url, resolve_root_folder};
use mpcp_common::{ConfigSource, Error, ExportPreference, TomlConfig};
use serial_test::serial;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
#[serial]
fn test_load_explicit_config_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        root_folder = "/srv/mpcp"

        [logging]
        level = "debug"

        [ingest]
        export_preference = "xml"
        analyze_images = false
        "#,
    );

    let (config, source) = TomlConfig::load_or_default(Some(&path), "MPCP_TEST_CONFIG").unwrap();
    assert_eq!(source, ConfigSource::File(path.clone()));
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/mpcp")));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.ingest.export_preference, ExportPreference::Xml);
    assert!(!config.ingest.analyze_images);
}

#[test]
#[serial]
fn test_config_path_from_environment() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[persistence]\ndatabase_url = \"sqlite://env.db\"\n");

    std::env::set_var("MPCP_TEST_CONFIG", &path);
    let (config, _) = TomlConfig::load_or_default(None, "MPCP_TEST_CONFIG").unwrap();
    std::env::remove_var("MPCP_TEST_CONFIG");

    assert_eq!(
        config.persistence.database_url.as_deref(),
        Some("sqlite://env.db")
    );
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_platform_lookup_falls_back_to_defaults() {
    let home = TempDir::new().unwrap();
    std::env::remove_var("MPCP_TEST_CONFIG");
    std::env::set_var("XDG_CONFIG_HOME", home.path());

    let (config, source) = TomlConfig::load_or_default(None, "MPCP_TEST_CONFIG").unwrap();
    assert_eq!(source, ConfigSource::Defaults);
    assert_eq!(config.logging.level, TomlConfig::default().logging.level);

    let user_file = home.path().join("mpcp").join("config.toml");
    std::fs::create_dir_all(user_file.parent().unwrap()).unwrap();
    std::fs::write(&user_file, "[logging]\nlevel = \"trace\"\n").unwrap();
    let (config, source) = TomlConfig::load_or_default(None, "MPCP_TEST_CONFIG").unwrap();
    std::env::remove_var("XDG_CONFIG_HOME");

    assert_eq!(source, ConfigSource::File(user_file));
    assert_eq!(config.logging.level, "trace");
}

#[test]
#[serial]
fn test_explicit_missing_file_is_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");

    let result = TomlConfig::load_or_default(Some(&missing), "MPCP_TEST_CONFIG");
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
#[serial]
fn test_malformed_file_names_path() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[ingest\nfff_marker = ");

    let err = TomlConfig::load(&path).unwrap_err();
    assert!(matches!(err, Error::ConfigParse { .. }));
    assert!(err.to_string().contains("config.toml"));
}

#[test]
#[serial]
fn test_root_folder_priority() {
    let mut config = TomlConfig::default();
    config.root_folder = Some(PathBuf::from("/from/toml"));

    std::env::set_var("MPCP_TEST_ROOT", "/from/env");
    assert_eq!(
        resolve_root_folder(Some(Path::new("/from/cli")), "MPCP_TEST_ROOT", &config),
        PathBuf::from("/from/cli")
    );
    assert_eq!(
        resolve_root_folder(None, "MPCP_TEST_ROOT", &config),
        PathBuf::from("/from/env")
    );
    std::env::remove_var("MPCP_TEST_ROOT");

    assert_eq!(
        resolve_root_folder(None, "MPCP_TEST_ROOT", &config),
        PathBuf::from("/from/toml")
    );
}

#[test]
#[serial]
fn test_database_url_env_beats_toml() {
    let mut config = TomlConfig::default();
    config.persistence.database_url = Some("sqlite://toml.db".to_string());

    std::env::set_var("MPCP_TEST_DATABASE_URL", "sqlite://env.db");
    let url = resolve_database_url(None, "MPCP_TEST_DATABASE_URL", &config, Path::new("/x"));
    std::env::remove_var("MPCP_TEST_DATABASE_URL");

    assert_eq!(url, "sqlite://env.db");
}

#[test]
#[serial]
fn test_env_flag_parsing() {
    std::env::remove_var("MPCP_TEST_FLAG");
    assert_eq!(env_flag("MPCP_TEST_FLAG").unwrap(), None);

    std::env::set_var("MPCP_TEST_FLAG", "Yes");
    assert_eq!(env_flag("MPCP_TEST_FLAG").unwrap(), Some(true));

    std::env::set_var("MPCP_TEST_FLAG", "0");
    assert_eq!(env_flag("MPCP_TEST_FLAG").unwrap(), Some(false));

    std::env::set_var("MPCP_TEST_FLAG", "maybe");
    assert!(matches!(
        env_flag("MPCP_TEST_FLAG"),
        Err(Error::InvalidInput(_))
    ));
    std::env::remove_var("MPCP_TEST_FLAG");
}
