//! Paginated listing against LocalStack.

use crate::common::{LocalStackTestContext, unique_bucket};
use funnel_error::{FunnelError, Result};
use funnel_types::ListOptions;

fn seeded(keys: &[&str]) -> Option<(LocalStackTestContext, String)> {
    let ctx = LocalStackTestContext::new();
    if !ctx.is_available() {
        eprintln!("LocalStack not available, skipping test");
        return None;
    }
    let bucket = unique_bucket("funnel-list");
    ctx.create_bucket(&bucket);
    for key in keys {
        ctx.put(&bucket, key, b"x");
    }
    Some((ctx, bucket))
}

#[test]
#[ignore = "requires LocalStack"]
fn test_list_spans_multiple_pages() {
    // More keys than one ListObjects page holds.
    let names: Vec<String> = (0..1205).map(|i| format!("key-{i:05}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let Some((ctx, bucket)) = seeded(&refs) else { return };

    let mut funnel = ctx.funnel(1);
    let mut cursor = funnel.list(&bucket, ListOptions::new());
    let keys: Vec<String> = cursor.by_ref().collect::<Result<_>>().unwrap();

    assert_eq!(keys, names);
    assert_eq!(cursor.pages(), 2);
}

#[test]
#[ignore = "requires LocalStack"]
fn test_list_with_prefix_marker_and_delimiter() {
    let Some((ctx, bucket)) = seeded(&["a/1", "a/2", "b/1", "b/2", "c"]) else {
        return;
    };
    let mut funnel = ctx.funnel(1);

    let keys: Vec<String> = funnel
        .list(&bucket, ListOptions::new().with_prefix("b/"))
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(keys, vec!["b/1", "b/2"]);

    let keys: Vec<String> = funnel
        .list(&bucket, ListOptions::new().with_marker("a/2"))
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(keys, vec!["b/1", "b/2", "c"]);

    let keys: Vec<String> = funnel
        .list(&bucket, ListOptions::new().with_delimiter("/"))
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(keys, vec!["a/", "b/", "c"]);
}

#[test]
#[ignore = "requires LocalStack"]
fn test_list_missing_bucket_fails() {
    let ctx = LocalStackTestContext::new();
    if !ctx.is_available() {
        eprintln!("LocalStack not available, skipping test");
        return;
    }

    let mut funnel = ctx.funnel(1);
    let mut cursor = funnel.list(&unique_bucket("funnel-absent"), ListOptions::new());

    assert!(matches!(
        cursor.next(),
        Some(Err(FunnelError::ContainerNotFound(_)))
    ));
    assert!(cursor.next().is_none());
}
