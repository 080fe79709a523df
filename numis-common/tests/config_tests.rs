//! Root folder resolution tests
//!
//! Uses serial_test because the tests manipulate NUMIS_ROOT_FOLDER.

use numis_common::config::{RootFolderInitializer, RootFolderResolver, ROOT_FOLDER_ENV};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
#[serial]
fn test_cli_argument_has_highest_priority() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/from-env");

    let resolved = RootFolderResolver::new("numis-intake")
        .with_cli_arg(Some(PathBuf::from("/tmp/from-cli")))
        .with_toml_root(Some(PathBuf::from("/tmp/from-toml")))
        .resolve();

    env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(resolved, PathBuf::from("/tmp/from-cli"));
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/from-env");

    let resolved = RootFolderResolver::new("numis-intake")
        .with_toml_root(Some(PathBuf::from("/tmp/from-toml")))
        .resolve();

    env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(resolved, PathBuf::from("/tmp/from-env"));
}

#[test]
#[serial]
fn test_toml_used_without_env() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolved = RootFolderResolver::new("numis-intake")
        .with_toml_root(Some(PathBuf::from("/tmp/from-toml")))
        .resolve();

    assert_eq!(resolved, PathBuf::from("/tmp/from-toml"));
}

#[test]
#[serial]
fn test_default_when_nothing_configured() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolved = RootFolderResolver::new("numis-intake").resolve();

    assert!(!resolved.as_os_str().is_empty());
}

#[test]
fn test_initializer_creates_storage_directory() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path().join("numis");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert!(initializer.storage_path().is_dir());
}
