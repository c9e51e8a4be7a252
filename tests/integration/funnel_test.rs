//! Batch operations through the engine against LocalStack.

use crate::common::{LocalStackTestContext, unique_bucket};
use funnel_engine::Failure;
use funnel_types::{Acl, BatchConfig};
use std::fs;
use tempfile::TempDir;

fn setup() -> Option<LocalStackTestContext> {
    let ctx = LocalStackTestContext::new();
    if !ctx.is_available() {
        eprintln!("LocalStack not available, skipping test");
        return None;
    }
    Some(ctx)
}

#[test]
#[ignore = "requires LocalStack"]
fn test_put_then_get_round_trip() {
    let Some(ctx) = setup() else { return };
    let bucket = unique_bucket("funnel-put");
    ctx.create_bucket(&bucket);

    let local = TempDir::new().unwrap();
    let mut paths = Vec::new();
    for i in 0..20 {
        let path = local.path().join(format!("file-{i:02}.txt"));
        fs::write(&path, format!("content {i}")).unwrap();
        paths.push(path.to_string_lossy().into_owned());
    }

    let mut funnel = ctx.funnel(4);
    let failed = funnel.put(&bucket, paths, &BatchConfig::new()).unwrap();
    assert!(failed.is_empty(), "unexpected failures: {failed:?}");
    assert_eq!(ctx.keys(&bucket).len(), 20);

    let keys: Vec<String> = (0..20).map(|i| format!("file-{i:02}.txt")).collect();
    let download = TempDir::new().unwrap();
    let config = BatchConfig::new().with_download_dir(download.path());
    let failed = funnel.get(&bucket, keys, &config).unwrap();
    assert!(failed.is_empty(), "unexpected failures: {failed:?}");

    for i in 0..20 {
        let data = fs::read_to_string(download.path().join(format!("file-{i:02}.txt"))).unwrap();
        assert_eq!(data, format!("content {i}"));
    }

    let stats = funnel.stats();
    assert_eq!(stats.jobs_ok(), 40);
    funnel.shutdown();
}

#[test]
#[ignore = "requires LocalStack"]
fn test_put_only_new_skips_identical_content() {
    let Some(ctx) = setup() else { return };
    let bucket = unique_bucket("funnel-only-new");
    ctx.create_bucket(&bucket);

    let local = TempDir::new().unwrap();
    let path = local.path().join("same.txt");
    fs::write(&path, "unchanged").unwrap();
    let item = path.to_string_lossy().into_owned();

    let mut funnel = ctx.funnel(2);
    let config = BatchConfig::new().with_put_only_new(true);
    assert!(funnel.put(&bucket, [item.clone()], &config).unwrap().is_empty());
    assert!(funnel.put(&bucket, [item.clone()], &config).unwrap().is_empty());
    assert_eq!(funnel.stats().jobs_skipped, 1);

    fs::write(&path, "changed").unwrap();
    assert!(funnel.put(&bucket, [item], &config).unwrap().is_empty());
    assert_eq!(ctx.get(&bucket, "same.txt").unwrap(), b"changed");
}

#[test]
#[ignore = "requires LocalStack"]
fn test_put_rewrites_keys_and_applies_acl() {
    let Some(ctx) = setup() else { return };
    let bucket = unique_bucket("funnel-keys");
    ctx.create_bucket(&bucket);

    let local = TempDir::new().unwrap();
    let path = local.path().join("report.csv");
    fs::write(&path, "a,b\n").unwrap();

    let mut funnel = ctx.funnel(1);
    let config = BatchConfig::new()
        .with_add_prefix("backup/")
        .with_acl(Acl::PublicRead);
    let failed = funnel
        .put(&bucket, [path.to_string_lossy().into_owned()], &config)
        .unwrap();

    assert!(failed.is_empty());
    assert_eq!(ctx.keys(&bucket), vec!["backup/report.csv"]);
    assert!(
        ctx.public_permissions(&bucket, "backup/report.csv")
            .contains(&"READ".to_string())
    );
}

#[test]
#[ignore = "requires LocalStack"]
fn test_get_missing_key_is_reported() {
    let Some(ctx) = setup() else { return };
    let bucket = unique_bucket("funnel-missing");
    ctx.create_bucket(&bucket);
    ctx.put(&bucket, "present.txt", b"here");

    let download = TempDir::new().unwrap();
    let mut funnel = ctx.funnel(2);
    let config = BatchConfig::new().with_download_dir(download.path());
    let failed = funnel
        .get(&bucket, ["present.txt", "absent.txt"], &config)
        .unwrap();

    let items = Failure::collapse(failed).unwrap();
    assert_eq!(items, vec!["absent.txt"]);
    assert!(download.path().join("present.txt").exists());
    assert!(!download.path().join("absent.txt").exists());
}

#[test]
#[ignore = "requires LocalStack"]
fn test_delete_removes_keys() {
    let Some(ctx) = setup() else { return };
    let bucket = unique_bucket("funnel-delete");
    ctx.create_bucket(&bucket);
    for key in ["a", "b", "c"] {
        ctx.put(&bucket, key, b"x");
    }

    let mut funnel = ctx.funnel(3);
    let failed = funnel.delete(&bucket, ["a", "c"], &BatchConfig::new()).unwrap();

    assert!(failed.is_empty());
    assert_eq!(ctx.keys(&bucket), vec!["b"]);
}

#[test]
#[ignore = "requires LocalStack"]
fn test_copy_between_buckets() {
    let Some(ctx) = setup() else { return };
    let source = unique_bucket("funnel-copy-src");
    let dest = unique_bucket("funnel-copy-dst");
    ctx.create_bucket(&source);
    ctx.create_bucket(&dest);
    ctx.put(&source, "logs/one.log", b"1");
    ctx.put(&source, "logs/two.log", b"2");
    ctx.put(&source, "logs/a b+c%d.log", b"3");

    let mut funnel = ctx.funnel(2);
    let config = BatchConfig::new()
        .with_source_container(&source)
        .with_del_prefix("logs/")
        .with_add_prefix("archive/");
    let failed = funnel
        .copy(
            &dest,
            ["logs/one.log", "logs/two.log", "logs/a b+c%d.log", "logs/none.log"],
            &config,
        )
        .unwrap();

    assert_eq!(Failure::collapse(failed).unwrap(), vec!["logs/none.log"]);
    assert_eq!(ctx.get(&dest, "archive/one.log").unwrap(), b"1");
    assert_eq!(ctx.get(&dest, "archive/two.log").unwrap(), b"2");
    assert_eq!(ctx.get(&dest, "archive/a b+c%d.log").unwrap(), b"3");
}

#[test]
#[ignore = "requires LocalStack"]
fn test_create_list_and_drop_container() {
    let Some(ctx) = setup() else { return };
    let bucket = unique_bucket("funnel-admin");

    let mut funnel = ctx.funnel(1);
    funnel.create_container(&bucket).unwrap();
    assert!(funnel.list_containers().unwrap().contains(&bucket));

    funnel.drop_container(&bucket).unwrap();
    assert!(!funnel.list_containers().unwrap().contains(&bucket));
}
