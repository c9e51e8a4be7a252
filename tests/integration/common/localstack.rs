//! LocalStack test context and utilities.

use aws_sdk_s3::Client as S3Client;
use funnel_engine::Funnel;
use funnel_s3::{S3Config, S3Connector};
use funnel_types::PoolConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::runtime::Runtime;

/// LocalStack test context.
///
/// Holds a raw SDK client for arranging and inspecting buckets, driven by
/// its own runtime so tests stay synchronous like the engine.
pub struct LocalStackTestContext {
    pub s3: S3Client,
    pub endpoint: String,
    pub region: String,
    runtime: Runtime,
}

impl LocalStackTestContext {
    /// Create a new LocalStack test context.
    ///
    /// Uses the `LOCALSTACK_ENDPOINT` environment variable if set,
    /// otherwise defaults to `http://localhost:4566`.
    pub fn new() -> Self {
        let endpoint = std::env::var("LOCALSTACK_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:4566".to_string());
        let region = "us-east-1".to_string();
        let runtime = Runtime::new().expect("Failed to start test runtime");

        let config = runtime.block_on(
            aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_sdk_s3::config::Region::new(region.clone()))
                .endpoint_url(&endpoint)
                .credentials_provider(aws_sdk_s3::config::Credentials::new(
                    "test", "test", None, None, "localstack",
                ))
                .load(),
        );
        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(true)
            .build();

        Self {
            s3: S3Client::from_conf(s3_config),
            endpoint,
            region,
            runtime,
        }
    }

    /// Check if LocalStack is available and healthy.
    pub fn is_available(&self) -> bool {
        self.runtime
            .block_on(self.s3.list_buckets().send())
            .is_ok()
    }

    /// Connector configuration pointing at LocalStack.
    pub fn s3_config(&self) -> S3Config {
        S3Config::new()
            .with_endpoint(&self.endpoint)
            .with_region(&self.region)
            .with_credentials("test", "test")
    }

    /// A funnel with `threads` workers against LocalStack.
    pub fn funnel(&self, threads: usize) -> Funnel<S3Connector> {
        let connector = S3Connector::new(self.s3_config()).expect("Failed to build connector");
        Funnel::new(connector, PoolConfig::new().with_thread_count(threads))
            .expect("Failed to build funnel")
    }

    /// Create an S3 bucket for testing.
    pub fn create_bucket(&self, name: &str) {
        self.runtime
            .block_on(self.s3.create_bucket().bucket(name).send())
            .expect("Failed to create bucket");
    }

    /// Upload an object directly.
    pub fn put(&self, bucket: &str, key: &str, data: &[u8]) {
        self.runtime
            .block_on(
                self.s3
                    .put_object()
                    .bucket(bucket)
                    .key(key)
                    .body(data.to_vec().into())
                    .send(),
            )
            .expect("Failed to upload object");
    }

    /// Download an object directly, `None` when it does not exist.
    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.runtime.block_on(async {
            let output = self.s3.get_object().bucket(bucket).key(key).send().await.ok()?;
            let data = output.body.collect().await.ok()?;
            Some(data.to_vec())
        })
    }

    /// List every key of a bucket.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let output = self
            .runtime
            .block_on(self.s3.list_objects_v2().bucket(bucket).send())
            .expect("Failed to list objects");
        output
            .contents()
            .iter()
            .filter_map(|o| o.key().map(String::from))
            .collect()
    }

    /// The ACL grants of an object, as permission names for the AllUsers group.
    pub fn public_permissions(&self, bucket: &str, key: &str) -> Vec<String> {
        let output = self
            .runtime
            .block_on(self.s3.get_object_acl().bucket(bucket).key(key).send())
            .expect("Failed to read object ACL");
        output
            .grants()
            .iter()
            .filter(|grant| {
                grant
                    .grantee()
                    .and_then(|g| g.uri())
                    .is_some_and(|uri| uri.ends_with("/global/AllUsers"))
            })
            .filter_map(|grant| grant.permission().map(|p| p.as_str().to_string()))
            .collect()
    }
}

/// A bucket name no other test in this run uses.
pub fn unique_bucket(prefix: &str) -> String {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    format!(
        "{prefix}-{}-{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    )
}
