//! Configuration resolution against the real process environment
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that set WCT_DATABASE or WCT_BIND are marked with #[serial].

use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;
use wct_common::config::{ConfigOverrides, WctConfig, DEFAULT_BIND, DEFAULT_PAGE_SIZE, ENV_BIND, ENV_DATABASE};

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
#[serial]
fn test_env_overrides_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        bind_addr = "0.0.0.0:8000"
        page_size = 50
        "#,
    );

    env::set_var(ENV_BIND, "127.0.0.1:9000");
    env::remove_var(ENV_DATABASE);

    let cfg = WctConfig::resolve(&ConfigOverrides {
        config_file: Some(path),
        ..Default::default()
    })
    .unwrap();

    env::remove_var(ENV_BIND);

    assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
    assert_eq!(cfg.page_size, 50);
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    env::set_var(ENV_DATABASE, "/tmp/from-env.db");

    let cfg = WctConfig::resolve(&ConfigOverrides {
        database_path: Some(PathBuf::from("/tmp/from-cli.db")),
        config_file: Some(PathBuf::from("/nonexistent/config.toml")),
        ..Default::default()
    })
    .unwrap();

    env::remove_var(ENV_DATABASE);

    assert_eq!(cfg.database_path, PathBuf::from("/tmp/from-cli.db"));
}

#[test]
#[serial]
fn test_invalid_file_falls_back_to_defaults() {
    env::remove_var(ENV_BIND);
    env::remove_var(ENV_DATABASE);

    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "page_size = \"lots\"\n[[[");

    let cfg = WctConfig::resolve(&ConfigOverrides {
        config_file: Some(path),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(cfg.bind_addr, DEFAULT_BIND);
    assert_eq!(cfg.page_size, DEFAULT_PAGE_SIZE);
}
