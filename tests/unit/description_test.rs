//! Tests for activity descriptions

use query_tracker::core::{format_description, RequestContext};
use uuid::Uuid;

#[test]
fn test_activity_description() {
    let ctx = RequestContext::new();
    assert_eq!(format_description(&ctx, &ctx, "query string"), "query=query string");

    let ctx = RequestContext::new().with_tenant("user");
    assert_eq!(
        format_description(&ctx, &ctx, "query string"),
        "tenant=user query=query string"
    );

    let trace_id = Uuid::new_v4().simple().to_string();
    let ctx = RequestContext::new().with_trace_id(trace_id.clone());
    let activity = format_description(&ctx, &ctx, "query string");
    assert_eq!(activity, format!("traceID={trace_id} query=query string"));

    let ctx = ctx.with_tenant("fake");
    let activity = format_description(&ctx, &ctx, "query string");
    assert_eq!(activity, format!("traceID={trace_id} tenant=fake query=query string"));
    assert!(!activity.starts_with(' '));
    assert!(!activity.ends_with(' '));
    assert!(!activity.contains("  "));
}

#[test]
fn test_multiline_query_renders_on_one_line() {
    let ctx = RequestContext::new().with_tenant("user");
    let activity = format_description(&ctx, &ctx, "sum(\n  rate(x[5m])\n)");
    assert_eq!(activity.lines().count(), 1);
    assert_eq!(activity, "tenant=user query=sum(\\n  rate(x[5m])\\n)");

    let activity = format_description(&ctx, &ctx, "a\tb\r\nc");
    assert!(!activity.contains(['\n', '\r', '\t']));
    assert_eq!(activity, "tenant=user query=a\\tb\\r\\nc");
}
