//! Blocking store traits implemented over the async AWS SDK.

use crate::config::{DIGEST_METADATA_KEY, S3Config, create_s3_client};
use crate::error::map_sdk_error;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration, ObjectCannedAcl};
use funnel_error::{FunnelError, Result, StoreError};
use funnel_traits::{Connection, Connector, Container, KeyInfo, ListPage, PutOptions};
use funnel_types::Acl;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

/// Region S3 creates buckets in when no location constraint is sent.
const DEFAULT_REGION: &str = "us-east-1";

/// Bytes escaped in `x-amz-copy-source`: everything but unreserved
/// characters and the path separator.
const COPY_SOURCE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Creates S3 connections with fixed credentials and endpoint.
pub struct S3Connector {
    config: S3Config,
    runtime: Arc<Runtime>,
}

impl S3Connector {
    /// Build a connector and the runtime its connections share.
    pub fn new(config: S3Config) -> Result<Self> {
        config.validate().map_err(FunnelError::Config)?;

        let runtime = Builder::new_multi_thread()
            .worker_threads(config.runtime_threads)
            .thread_name("funnel-s3")
            .enable_all()
            .build()
            .map_err(|e| FunnelError::Other(anyhow::anyhow!("failed to start S3 runtime: {e}")))?;

        info!(
            endpoint = config.endpoint_url().as_deref().unwrap_or("aws"),
            region = config.region.as_deref().unwrap_or("default"),
            "S3 connector ready"
        );

        Ok(Self {
            config,
            runtime: Arc::new(runtime),
        })
    }

    pub fn config(&self) -> &S3Config {
        &self.config
    }
}

impl Connector for S3Connector {
    type Connection = S3Connection;

    fn connect(&self) -> Result<S3Connection> {
        let client = self.runtime.block_on(create_s3_client(&self.config));
        debug!("Created S3 client");
        Ok(S3Connection {
            client,
            runtime: self.runtime.clone(),
        })
    }
}

/// One S3 client.
pub struct S3Connection {
    client: Client,
    runtime: Arc<Runtime>,
}

impl S3Connection {
    fn region(&self) -> String {
        self.client
            .config()
            .region()
            .map(|r| r.as_ref().to_string())
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }
}

impl Connection for S3Connection {
    type Container = S3Container;

    fn container(&self, name: &str) -> Result<S3Container> {
        self.runtime
            .block_on(self.client.head_bucket().bucket(name).send())
            .map_err(|e| map_sdk_error("head_bucket", name, e))?;

        Ok(S3Container {
            client: self.client.clone(),
            runtime: self.runtime.clone(),
            bucket: name.to_string(),
        })
    }

    fn list_containers(&self) -> Result<Vec<String>> {
        let output = self
            .runtime
            .block_on(self.client.list_buckets().send())
            .map_err(|e| map_sdk_error("list_buckets", "", e))?;

        Ok(output
            .buckets()
            .iter()
            .filter_map(|bucket| bucket.name().map(str::to_string))
            .collect())
    }

    fn create_container(&self, name: &str) -> Result<()> {
        let mut request = self.client.create_bucket().bucket(name);

        let region = self.region();
        if region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region.as_str()))
                    .build(),
            );
        }

        self.runtime
            .block_on(request.send())
            .map_err(|e| map_sdk_error("create_bucket", name, e))?;
        Ok(())
    }

    fn drop_container(&self, name: &str) -> Result<()> {
        self.runtime
            .block_on(self.client.delete_bucket().bucket(name).send())
            .map_err(|e| map_sdk_error("delete_bucket", name, e))?;
        Ok(())
    }
}

/// Handle to one bucket.
pub struct S3Container {
    client: Client,
    runtime: Arc<Runtime>,
    bucket: String,
}

impl Container for S3Container {
    fn name(&self) -> &str {
        &self.bucket
    }

    fn get_object(&self, key: &str, dest: &mut dyn Write) -> Result<u64> {
        self.runtime.block_on(async {
            let output = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| map_sdk_error("get_object", key, e))?;

            let mut body = output.body;
            let mut written = 0u64;
            while let Some(chunk) = body
                .try_next()
                .await
                .map_err(|e| StoreError::Transport(format!("get_object {key}: {e}")))?
            {
                dest.write_all(&chunk)
                    .map_err(|e| FunnelError::local(key, e))?;
                written += chunk.len() as u64;
            }
            Ok::<_, FunnelError>(written)
        })
    }

    fn put_object(&self, key: &str, source: &Path, options: &PutOptions) -> Result<u64> {
        let size = std::fs::metadata(source)
            .map_err(|e| FunnelError::local(source, e))?
            .len();

        self.runtime.block_on(async {
            let body = ByteStream::from_path(source)
                .await
                .map_err(|e| FunnelError::local(source, std::io::Error::other(e)))?;

            let mut request = self
                .client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .acl(canned_acl(options.acl))
                .body(body);
            if let Some(digest) = &options.digest {
                request = request.metadata(DIGEST_METADATA_KEY, digest);
            }

            request
                .send()
                .await
                .map_err(|e| map_sdk_error("put_object", key, e))?;
            Ok::<_, FunnelError>(size)
        })
    }

    fn object_digest(&self, key: &str) -> Result<Option<String>> {
        let result = self
            .runtime
            .block_on(self.client.head_object().bucket(&self.bucket).key(key).send());

        match result {
            Ok(output) => Ok(output
                .metadata()
                .and_then(|metadata| metadata.get(DIGEST_METADATA_KEY))
                .cloned()),
            Err(e) => match map_sdk_error("head_object", key, e) {
                FunnelError::Store(StoreError::NotFound(_)) => Ok(None),
                other => Err(other),
            },
        }
    }

    fn delete_object(&self, key: &str) -> Result<()> {
        self.runtime
            .block_on(self.client.delete_object().bucket(&self.bucket).key(key).send())
            .map_err(|e| map_sdk_error("delete_object", key, e))?;
        Ok(())
    }

    fn copy_object(
        &self,
        source_container: &str,
        source_key: &str,
        dest_key: &str,
        acl: Acl,
    ) -> Result<()> {
        self.runtime
            .block_on(
                self.client
                    .copy_object()
                    .bucket(&self.bucket)
                    .key(dest_key)
                    .copy_source(copy_source(source_container, source_key))
                    .acl(canned_acl(acl))
                    .send(),
            )
            .map_err(|e| {
                map_sdk_error("copy_object", &format!("{source_container}/{source_key}"), e)
            })?;
        Ok(())
    }

    fn list_keys(&self, marker: &str, prefix: &str, delimiter: &str) -> Result<ListPage> {
        let mut request = self.client.list_objects().bucket(&self.bucket);
        if !marker.is_empty() {
            request = request.marker(marker);
        }
        if !prefix.is_empty() {
            request = request.prefix(prefix);
        }
        if !delimiter.is_empty() {
            request = request.delimiter(delimiter);
        }

        let output = self
            .runtime
            .block_on(request.send())
            .map_err(|e| map_sdk_error("list_objects", &self.bucket, e))?;

        let mut keys: Vec<KeyInfo> = output
            .contents()
            .iter()
            .filter_map(|object| {
                let size = object.size().unwrap_or(0).max(0) as u64;
                object.key().map(|key| KeyInfo::object(key, size))
            })
            .chain(
                output
                    .common_prefixes()
                    .iter()
                    .filter_map(|prefix| prefix.prefix().map(KeyInfo::prefix)),
            )
            .collect();
        // Objects and common prefixes arrive as separate lists.
        keys.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(ListPage::new(keys, output.is_truncated().unwrap_or(false)))
    }
}

/// `bucket/key` with the key URL-encoded, as S3 expects the copy source.
fn copy_source(bucket: &str, key: &str) -> String {
    format!("{bucket}/{}", utf8_percent_encode(key, COPY_SOURCE))
}

fn canned_acl(acl: Acl) -> ObjectCannedAcl {
    match acl {
        Acl::Private => ObjectCannedAcl::Private,
        Acl::PublicRead => ObjectCannedAcl::PublicRead,
        Acl::PublicReadWrite => ObjectCannedAcl::PublicReadWrite,
        Acl::AuthenticatedRead => ObjectCannedAcl::AuthenticatedRead,
    }
}
