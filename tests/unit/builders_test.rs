//! Tests for builder modules

use query_tracker::builders::build_tracker;
use query_tracker::config::TrackerConfig;
use query_tracker::core::RequestContext;
use query_tracker::infra::activity_log::{ActivityLog, RecoveryReader};
use tempfile::tempdir;

#[test]
fn test_builder_defaults() {
    let controller = build_tracker(&TrackerConfig::default()).unwrap();
    assert_eq!(controller.get_max_concurrent(), 20);
    assert!(!controller.log().is_enabled());
    assert_eq!(controller.available(), Some(20));
}

#[tokio::test]
async fn test_built_tracker_records_descriptions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("active.log");
    let cfg = TrackerConfig::from_json_str(&format!(
        r#"{{ "max_concurrent": 4, "active_query_log": {:?}, "log_capacity": 8 }}"#,
        path.to_str().unwrap()
    ))
    .unwrap();
    let controller = build_tracker(&cfg).unwrap();

    let ctx = RequestContext::new().with_tenant("user");
    let handle = controller.insert(&ctx, "query string").await.unwrap();
    assert!(handle.is_recorded());

    let reader = RecoveryReader::open(&path).unwrap();
    let entries: Vec<_> = reader.entries().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].description, "tenant=user query=query string");

    controller.delete(handle);
    assert_eq!(reader.entries().count(), 0);
}
