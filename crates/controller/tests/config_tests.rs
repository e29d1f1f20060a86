//! Integration tests for configuration parsing
//!
//! Tests arm configuration handling, including:
//! - Minimal and full config files
//! - Hex USB ID parsing
//! - Saving and reloading through the filesystem
//! - Invalid configuration handling

use controller::config::{ArmConfig, load_config};
use std::time::Duration;
use tempfile::TempDir;

const MINIMAL_CONFIG: &str = r#"
[device]
"#;

const FULL_CONFIG: &str = r#"
[device]
vendor_id = "0x1267"
product_id = "0x0001"
interface = 0
transfer_timeout_ms = 500

[logging]
log_level = "debug"

[cli]
hold_ms = 250
"#;

#[test]
fn test_parse_minimal_config() {
    let config: ArmConfig = toml::from_str(MINIMAL_CONFIG).expect("Failed to parse");
    assert_eq!(config, ArmConfig::default());
}

#[test]
fn test_parse_empty_config() {
    let config: ArmConfig = toml::from_str("").expect("Failed to parse");
    assert_eq!(config.device.vendor_id, 0x1267);
    assert_eq!(config.logging.log_level, "info");
    assert_eq!(config.cli.hold_ms, 1000);
}

#[test]
fn test_parse_full_config() {
    let config: ArmConfig = toml::from_str(FULL_CONFIG).expect("Failed to parse");
    assert_eq!(config.device.vendor_id, 0x1267);
    assert_eq!(config.device.product_id, 0x0001);
    assert_eq!(config.device.interface, 0);
    assert_eq!(config.device.transfer_timeout(), Duration::from_millis(500));
    assert_eq!(config.logging.log_level, "debug");
    assert_eq!(config.cli.hold_ms, 250);
}

#[test]
fn test_invalid_hex_id_rejected() {
    let result: Result<ArmConfig, _> = toml::from_str(
        r#"
[device]
vendor_id = "1267"
"#,
    );
    assert!(result.is_err());

    let result: Result<ArmConfig, _> = toml::from_str(
        r#"
[device]
product_id = "0xZZZZ"
"#,
    );
    assert!(result.is_err());
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("arm.toml");

    let mut config = ArmConfig::default();
    config.device.product_id = 0x0042;
    config.logging.log_level = "trace".to_string();
    config.save(&path).expect("Failed to save");

    let loaded = ArmConfig::load(Some(path)).expect("Failed to load");
    assert_eq!(loaded, config);
}

#[test]
fn test_load_rejects_invalid_log_level() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("arm.toml");
    std::fs::write(&path, "[logging]\nlog_level = \"loud\"\n").unwrap();

    let err = ArmConfig::load(Some(path)).unwrap_err();
    assert!(format!("{:#}", err).contains("Invalid log level"));
}

#[test]
fn test_load_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    assert!(ArmConfig::load(Some(dir.path().join("absent.toml"))).is_err());
}

#[test]
fn test_load_config_plain_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("arm.toml");
    std::fs::write(&path, FULL_CONFIG).unwrap();

    let config = load_config(path.to_str().unwrap()).expect("Failed to load");
    assert_eq!(config.cli.hold_ms, 250);
}

#[test]
fn test_default_path_location() {
    let path = ArmConfig::default_path();
    assert!(path.ends_with("robotic-arm/arm.toml"));
}
