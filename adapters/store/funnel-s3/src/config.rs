//! S3 client configuration and creation.

use aws_config::BehaviorVersion;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// User metadata entry holding an object's SHA-256 content digest.
pub const DIGEST_METADATA_KEY: &str = "sha256";

/// Configuration for S3 access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// AWS region
    pub region: Option<String>,

    /// Custom endpoint (for LocalStack or other S3-compatible stores).
    ///
    /// A bare `host:port` gets its scheme from `secure`.
    pub endpoint: Option<String>,

    /// Explicit AWS access key (optional)
    pub access_key: Option<String>,

    /// Explicit AWS secret key (optional)
    pub secret_key: Option<String>,

    /// AWS profile name (optional)
    pub profile: Option<String>,

    /// Use HTTPS for custom endpoints given without a scheme
    pub secure: bool,

    /// Connect and read timeout in seconds
    pub timeout_secs: u64,

    /// Threads of the runtime driving the SDK
    pub runtime_threads: usize,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: None,
            endpoint: None,
            access_key: None,
            secret_key: None,
            profile: None,
            secure: true,
            timeout_secs: 30,
            runtime_threads: 2,
        }
    }
}

impl S3Config {
    /// Create a new S3Config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom endpoint (for LocalStack).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the AWS region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set explicit credentials.
    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Set the AWS profile.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Choose between HTTPS and plain HTTP for scheme-less endpoints.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the request timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the number of runtime threads.
    pub fn with_runtime_threads(mut self, threads: usize) -> Self {
        self.runtime_threads = threads;
        self
    }

    /// The endpoint URL handed to the SDK, if any.
    pub fn endpoint_url(&self) -> Option<String> {
        self.endpoint.as_ref().map(|endpoint| {
            if endpoint.contains("://") {
                endpoint.clone()
            } else {
                let scheme = if self.secure { "https" } else { "http" };
                format!("{scheme}://{endpoint}")
            }
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.access_key.is_some() != self.secret_key.is_some() {
            return Err("access key and secret key must be given together".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be at least 1".to_string());
        }
        if self.runtime_threads == 0 {
            return Err("runtime_threads must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Create an S3 client from configuration.
///
/// SDK-level retries are disabled: jobs run their own retry loop and must
/// see every failure.
pub async fn create_s3_client(config: &S3Config) -> Client {
    use aws_config::Region;

    let mut aws_config_loader = aws_config::defaults(BehaviorVersion::latest())
        .retry_config(RetryConfig::disabled())
        .timeout_config(
            TimeoutConfig::builder()
                .connect_timeout(Duration::from_secs(config.timeout_secs))
                .read_timeout(Duration::from_secs(config.timeout_secs))
                .build(),
        );

    if let Some(region) = &config.region {
        aws_config_loader = aws_config_loader.region(Region::new(region.clone()));
    }

    if let Some(endpoint) = config.endpoint_url() {
        aws_config_loader = aws_config_loader.endpoint_url(endpoint);
    }

    if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
        let credentials =
            aws_sdk_s3::config::Credentials::new(access_key, secret_key, None, None, "s3funnel");
        aws_config_loader = aws_config_loader.credentials_provider(credentials);
    }

    if let Some(profile) = &config.profile {
        aws_config_loader = aws_config_loader.profile_name(profile);
    }

    let aws_config = aws_config_loader.load().await;

    // Path-style addressing for custom endpoints (LocalStack)
    let s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config);
    let s3_config = if config.endpoint.is_some() {
        s3_config_builder.force_path_style(true).build()
    } else {
        s3_config_builder.build()
    };

    Client::from_conf(s3_config)
}
