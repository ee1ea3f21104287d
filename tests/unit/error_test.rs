//! Tests for error types

use std::path::PathBuf;

use query_tracker::core::{ConfigurationError, RecoveryError, TrackerError};

#[test]
fn test_admission_errors() {
    assert_eq!(format!("{}", TrackerError::AdmissionCanceled), "admission canceled");
    assert_eq!(format!("{}", TrackerError::AdmissionTimedOut), "admission timed out");
}

#[test]
fn test_mismatch_error() {
    let err = ConfigurationError::Mismatch {
        field: "capacity",
        expected: 64,
        found: 32,
    };
    assert_eq!(
        format!("{}", err),
        "activity log capacity mismatch: file declares 32, configured 64"
    );
}

#[test]
fn test_configuration_error_converts_to_tracker_error() {
    let err: TrackerError = ConfigurationError::InvalidCapacity(0).into();
    assert_eq!(format!("{}", err), "invalid activity log capacity 0");
    assert!(matches!(err, TrackerError::Configuration(_)));
}

#[test]
fn test_io_error_keeps_source() {
    let err = ConfigurationError::Io {
        path: PathBuf::from("/nope/active.log"),
        source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
    };
    assert!(format!("{}", err).contains("/nope/active.log"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_recovery_errors() {
    let err = RecoveryError::NotFound(PathBuf::from("/tmp/x.log"));
    assert_eq!(format!("{}", err), "activity log not found: /tmp/x.log");
    let err = RecoveryError::Format("bad magic".to_string());
    assert_eq!(format!("{}", err), "activity log format error: bad magic");
}
