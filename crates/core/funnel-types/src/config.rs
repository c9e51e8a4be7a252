//! Configuration types for pools, batches and listings.

use crate::{Acl, RetryConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default chunk size used when digesting local files (8 KiB).
pub const DEFAULT_DIGEST_CHUNK_SIZE: usize = 8192;

/// Sizing for the worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of worker threads
    pub thread_count: usize,

    /// Maximum number of jobs queued or executing at once.
    ///
    /// Defaults to twice the thread count when unset.
    pub max_jobs: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            thread_count: 5,
            max_jobs: None,
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    pub fn with_thread_count(mut self, count: usize) -> Self {
        self.thread_count = count;
        self
    }

    /// Set the in-flight job limit.
    pub fn with_max_jobs(mut self, max_jobs: usize) -> Self {
        self.max_jobs = Some(max_jobs);
        self
    }

    /// The in-flight job limit actually applied.
    pub fn effective_max_jobs(&self) -> usize {
        self.max_jobs
            .unwrap_or_else(|| self.thread_count.saturating_mul(2))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.thread_count == 0 {
            return Err("thread_count must be at least 1".to_string());
        }
        if self.effective_max_jobs() < self.thread_count {
            return Err(format!(
                "max_jobs ({}) must be at least thread_count ({})",
                self.effective_max_jobs(),
                self.thread_count
            ));
        }
        Ok(())
    }
}

/// Settings shared by every job of one batch request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Retry budget and backoff
    pub retry: RetryConfig,

    /// ACL applied to uploaded and copied objects
    pub acl: Acl,

    /// Prefix prepended to destination keys (put, copy)
    pub add_prefix: Option<String>,

    /// Prefix stripped once from the front of the source path or key (put, copy)
    pub del_prefix: Option<String>,

    /// Keep the whole local path as the key instead of its base name (put)
    pub put_full_path: bool,

    /// Skip uploads whose remote digest already matches the local file (put)
    pub put_only_new: bool,

    /// Container objects are copied from (copy)
    pub source_container: Option<String>,

    /// Directory downloaded keys are written under (get); defaults to the
    /// working directory
    pub download_dir: Option<PathBuf>,

    /// Read size used when digesting local files
    pub digest_chunk_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            acl: Acl::default(),
            add_prefix: None,
            del_prefix: None,
            put_full_path: false,
            put_only_new: false,
            source_container: None,
            download_dir: None,
            digest_chunk_size: DEFAULT_DIGEST_CHUNK_SIZE,
        }
    }
}

impl BatchConfig {
    /// Create a new batch configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the number of attempts per job.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.retry.max_attempts = attempts;
        self
    }

    /// Set the ACL.
    pub fn with_acl(mut self, acl: Acl) -> Self {
        self.acl = acl;
        self
    }

    /// Set the ACL from its wire form, coercing unknown values to private.
    pub fn with_acl_str(mut self, acl: &str) -> Self {
        self.acl = Acl::coerce(acl);
        self
    }

    /// Set the prefix added to destination keys.
    pub fn with_add_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.add_prefix = Some(prefix.into());
        self
    }

    /// Set the prefix removed from source paths or keys.
    pub fn with_del_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.del_prefix = Some(prefix.into());
        self
    }

    /// Keep full local paths as keys.
    pub fn with_put_full_path(mut self, enabled: bool) -> Self {
        self.put_full_path = enabled;
        self
    }

    /// Only upload files whose content changed.
    pub fn with_put_only_new(mut self, enabled: bool) -> Self {
        self.put_only_new = enabled;
        self
    }

    /// Set the container objects are copied from.
    pub fn with_source_container(mut self, container: impl Into<String>) -> Self {
        self.source_container = Some(container.into());
        self
    }

    /// Set the directory downloads are written under.
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    /// Set the digest read size.
    pub fn with_digest_chunk_size(mut self, size: usize) -> Self {
        self.digest_chunk_size = size;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.retry.validate()?;
        if self.digest_chunk_size == 0 {
            return Err("digest_chunk_size must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Settings for a key listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListOptions {
    /// Key to start listing after
    pub marker: Option<String>,

    /// Only list keys starting with this prefix
    pub prefix: Option<String>,

    /// Group keys sharing a prefix up to this delimiter
    pub delimiter: Option<String>,

    /// Pause before re-requesting a page after a transient failure
    #[serde(with = "crate::duration_millis")]
    pub retry_interval: Duration,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            marker: None,
            prefix: None,
            delimiter: None,
            retry_interval: Duration::from_secs(1),
        }
    }
}

impl ListOptions {
    /// Create listing options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start after the given key.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Restrict to keys with the given prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Group keys by the given delimiter.
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    /// Set the pause between retries of a failed page request.
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }
}
