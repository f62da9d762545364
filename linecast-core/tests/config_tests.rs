//! Integration tests for configuration system

use std::time::Duration;

use linecast_core::codec::{JsonSchema, Protocol};
use linecast_core::config::{sample_config, ConfigFile, SessionConfig, LEGACY_FOCAL_SCALE};
use tempfile::TempDir;

#[test]
fn test_protocol_from_string() {
    assert_eq!("json".parse::<Protocol>().unwrap(), Protocol::Json);
    assert_eq!("gpla".parse::<Protocol>().unwrap(), Protocol::Gpla);
    assert_eq!("binary".parse::<Protocol>().unwrap(), Protocol::Gpla);
    assert!("carrier-pigeon".parse::<Protocol>().is_err());
}

#[test]
fn test_schema_from_string() {
    assert_eq!("mesh-v1".parse::<JsonSchema>().unwrap(), JsonSchema::MeshV1);
    assert_eq!("strokes-v2".parse::<JsonSchema>().unwrap(), JsonSchema::StrokesV2);
    assert!("v3".parse::<JsonSchema>().is_err());
}

#[test]
fn test_session_config_builder() {
    let config = SessionConfig::default()
        .with_host("10.0.0.2")
        .with_port(51601)
        .with_protocol(Protocol::Json)
        .with_json_schema(JsonSchema::MeshV1)
        .with_focal_scale(LEGACY_FOCAL_SCALE);

    assert_eq!(config.address(), "10.0.0.2:51601");
    assert_eq!(config.protocol, Protocol::Json);
    assert!(config.validate().is_empty());
    assert!(config.validate_strict().is_ok());
}

#[test]
fn test_validation_warnings() {
    let config = SessionConfig::default()
        .with_port(8080)
        .with_connect_timeout(Duration::from_secs(30))
        .with_focal_scale(-0.2);

    let warnings = config.validate();
    assert_eq!(warnings.len(), 3, "warnings: {:?}", warnings);
    assert!(warnings.iter().any(|w| w.contains("8080")));
}

#[test]
fn test_strict_validation_errors() {
    assert!(SessionConfig::default().with_host("  ").validate_strict().is_err());
    assert!(SessionConfig::default().with_port(0).validate_strict().is_err());
    assert!(SessionConfig::default()
        .with_connect_timeout(Duration::ZERO)
        .validate_strict()
        .is_err());
    assert!(SessionConfig::default()
        .with_focal_scale(f64::NAN)
        .validate_strict()
        .is_err());
    assert!(SessionConfig::default().with_focal_scale(0.0).validate_strict().is_err());
}

#[test]
fn test_sample_config_matches_defaults() {
    let config: ConfigFile = toml::from_str(&sample_config()).expect("Sample config must parse");
    let session = config.session_config();
    let defaults = SessionConfig::default();

    assert_eq!(session.host, defaults.host);
    assert_eq!(session.port, defaults.port);
    assert_eq!(session.connect_timeout, defaults.connect_timeout);
    assert_eq!(session.protocol, defaults.protocol);
    assert_eq!(session.json_schema, defaults.json_schema);
    assert_eq!(session.focal_scale, defaults.focal_scale);
}

#[test]
fn test_config_file_roundtrip() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("nested").join("config.toml");

    // Create and save config
    let mut config = ConfigFile::default();
    config.connection.port = 51650;
    config.capture.protocol = Protocol::Json;
    config.capture.json_schema = JsonSchema::MeshV1;
    config.export.base64 = true;
    config
        .save_to(config_path.clone())
        .expect("Failed to save config");

    // Load and verify
    let loaded = ConfigFile::load_from(config_path).expect("Failed to load config");
    assert_eq!(loaded.connection.port, 51650);
    assert_eq!(loaded.capture.protocol, Protocol::Json);
    assert_eq!(loaded.capture.json_schema, JsonSchema::MeshV1);
    assert!(loaded.export.base64);
}

#[test]
fn test_missing_file_gives_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let loaded = ConfigFile::load_from(temp_dir.path().join("absent.toml")).unwrap();
    assert_eq!(loaded.connection.port, 51677);
}

#[test]
fn test_malformed_file_is_config_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[connection]\nport = \"not a number\"\n").unwrap();

    let err = ConfigFile::load_from(path).unwrap_err();
    assert!(err.to_string().contains("Configuration error"));
    assert!(err.user_hint().is_some());
}
