//! Unit tests for bootstrap configuration and root folder resolution
//!
//! Note: Uses serial_test to prevent ENV variable race conditions.
//! Tests that manipulate VINDEC_ROOT_FOLDER are marked with #[serial].

use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vindec_common::config::{
    database_path, default_root_folder, load_toml_config, resolve_root_folder, TomlConfig,
    ROOT_FOLDER_ENV,
};

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    let resolved = resolve_root_folder(Some(Path::new("/from/cli")), &toml);

    assert_eq!(resolved, PathBuf::from("/from/cli"));
    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_environment_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    let resolved = resolve_root_folder(None, &toml);

    assert_eq!(resolved, PathBuf::from("/from/env"));
    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_used_without_env() {
    env::remove_var(ROOT_FOLDER_ENV);
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    assert_eq!(resolve_root_folder(None, &toml), PathBuf::from("/from/toml"));
}

#[test]
#[serial]
fn test_falls_back_to_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolved = resolve_root_folder(None, &TomlConfig::default());

    assert_eq!(resolved, default_root_folder());
    assert!(resolved.to_string_lossy().contains("vindec"));
}

#[test]
fn test_database_path_inside_root() {
    let path = database_path(Path::new("/data/vindec"));
    assert_eq!(path, PathBuf::from("/data/vindec/vindec.db"));
}

#[test]
fn test_missing_toml_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = load_toml_config(&temp_dir.path().join("absent.toml")).unwrap();

    assert_eq!(config, TomlConfig::default());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_toml_fields_parse() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/vindec"
port = 5800
api_timeout_secs = 15
enable_secondary_api = true
secondary_api_key = "abc123"

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();

    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/vindec")));
    assert_eq!(config.port, Some(5800));
    assert_eq!(config.api_timeout_secs, Some(15));
    assert_eq!(config.enable_secondary_api, Some(true));
    assert_eq!(config.secondary_api_key.as_deref(), Some("abc123"));
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_malformed_toml_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "port = [not valid").unwrap();

    assert!(load_toml_config(&path).is_err());
}
