//! Tests for configuration validation

use std::path::PathBuf;

use query_tracker::config::TrackerConfig;

#[test]
fn test_tracker_config_validation() {
    let valid = TrackerConfig {
        max_concurrent: 16,
        active_query_log: Some(PathBuf::from("/var/lib/engine/active.log")),
        log_capacity: 64,
        record_size: 512,
        recover_on_start: true,
    };
    assert!(valid.validate().is_ok());
}

#[test]
fn test_tracker_config_invalid_limit() {
    let invalid = TrackerConfig {
        max_concurrent: -2,
        ..TrackerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_geometry_ignored_without_log() {
    let cfg = TrackerConfig {
        active_query_log: None,
        log_capacity: 0,
        record_size: 3,
        ..TrackerConfig::default()
    };
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_tracker_config_from_json() {
    let json = r#"{
        "max_concurrent": -1,
        "active_query_log": "/var/lib/engine/active.log",
        "log_capacity": 256,
        "record_size": 1024,
        "recover_on_start": false
    }"#;

    let config = TrackerConfig::from_json_str(json).unwrap();
    assert_eq!(config.max_concurrent, -1);
    assert_eq!(config.log_capacity, 256);
    assert!(!config.recover_on_start);
}

#[test]
fn test_tracker_config_json_roundtrip() {
    let cfg = TrackerConfig::default();
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(TrackerConfig::from_json_str(&json).unwrap(), cfg);
}
