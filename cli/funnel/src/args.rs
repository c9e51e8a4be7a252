//! CLI argument definitions for s3funnel.

use clap::{Args, Parser, Subcommand};
use funnel_cli_common::LogLevel;
use funnel_types::{BatchConfig, ListOptions, PoolConfig, RetryConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Multithreaded bulk operations against S3-compatible object stores.
///
/// Items (keys, or local paths for put) are taken from the command line,
/// from --input, or one per line from stdin. Items that could not be
/// processed are printed to stdout, one per line.
///
/// ## Examples
///
/// Download every key under a prefix:
///   s3funnel list my-bucket --prefix logs/ | s3funnel get my-bucket --dir ./logs
///
/// Upload a tree, skipping unchanged files:
///   find data -type f | s3funnel put my-bucket --full-path --only-new
///
/// Copy between buckets with 20 threads:
///   s3funnel -t 20 list src | s3funnel copy dst --source-bucket src
///
/// Exit status is 0 when every item succeeded, 4 when some items failed
/// and 1 on internal errors.
#[derive(Parser, Debug)]
#[command(name = "s3funnel")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    // === Concurrency ===
    /// Number of worker threads (must be >= 1)
    #[arg(short = 't', long, global = true, default_value = "5", value_parser = parse_positive_usize)]
    pub threads: usize,

    /// Maximum jobs queued or running at once [default: 2 x threads]
    #[arg(long, global = true, value_parser = parse_positive_usize)]
    pub max_jobs: Option<usize>,

    /// Attempts per item before giving up (must be >= 1)
    #[arg(short = 'r', long, global = true, default_value = "5", value_parser = clap::value_parser!(u32).range(1..))]
    pub retries: u32,

    /// Backoff time unit in milliseconds; attempt i waits unit * 2^i / 4
    #[arg(long, global = true, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    pub backoff_unit_ms: u64,

    /// Upper bound for a single backoff sleep in seconds [default: none]
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_backoff: Option<u64>,

    // === AWS Configuration ===
    /// AWS region
    #[arg(long, global = true, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Custom S3 endpoint (host:port or URL, for LocalStack or other stores)
    #[arg(long, global = true, env = "FUNNEL_S3_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Use plain HTTP for an endpoint given without a scheme
    #[arg(long, global = true)]
    pub insecure: bool,

    /// AWS access key ID
    #[arg(long, global = true, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub access_key: Option<String>,

    /// AWS secret access key
    #[arg(long, global = true, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// AWS profile name
    #[arg(long, global = true, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// Connect and read timeout in seconds
    #[arg(long, global = true, default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    // === Output ===
    /// Do not print the run summary to stderr
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Log level
    #[arg(short = 'l', long, global = true, value_enum, default_value = "warn")]
    pub log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List all buckets
    Buckets,

    /// Create a bucket
    Create {
        /// Bucket name
        bucket: String,
    },

    /// Delete an empty bucket
    Drop {
        /// Bucket name
        bucket: String,
    },

    /// List the keys of a bucket
    List(ListArgs),

    /// Download keys into a local directory
    Get(GetArgs),

    /// Upload local files
    Put(PutArgs),

    /// Delete keys
    Delete(ItemArgs),

    /// Copy keys from another bucket
    Copy(CopyArgs),
}

/// Target bucket and the items to process.
#[derive(Args, Debug)]
pub struct ItemArgs {
    /// Bucket to operate on
    pub bucket: String,

    /// Items to process; read from --input or stdin when omitted
    pub items: Vec<String>,

    /// Read items from this file, one per line
    #[arg(short = 'i', long)]
    pub input: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Bucket to list
    pub bucket: String,

    /// Only list keys starting with this prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// Start listing after this key
    #[arg(long)]
    pub marker: Option<String>,

    /// Group keys by this delimiter
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Pause before retrying a failed page request, in milliseconds
    #[arg(long, default_value = "1000")]
    pub retry_interval_ms: u64,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[command(flatten)]
    pub target: ItemArgs,

    /// Directory downloads are written under [default: current directory]
    #[arg(short = 'd', long)]
    pub dir: Option<PathBuf>,
}

/// Key rewriting and ACL shared by put and copy.
#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Canned ACL for new objects; unknown values fall back to private
    #[arg(long, default_value = "private")]
    pub acl: String,

    /// Prefix prepended to destination keys
    #[arg(long)]
    pub add_prefix: Option<String>,

    /// Prefix stripped from the front of source paths or keys
    #[arg(long)]
    pub del_prefix: Option<String>,
}

#[derive(Args, Debug)]
pub struct PutArgs {
    #[command(flatten)]
    pub target: ItemArgs,

    #[command(flatten)]
    pub keys: KeyArgs,

    /// Keep the whole local path as the key instead of the file name
    #[arg(long)]
    pub full_path: bool,

    /// Skip files whose content is already stored under the same key
    #[arg(long)]
    pub only_new: bool,
}

#[derive(Args, Debug)]
pub struct CopyArgs {
    #[command(flatten)]
    pub target: ItemArgs,

    #[command(flatten)]
    pub keys: KeyArgs,

    /// Bucket the keys are copied from
    #[arg(long)]
    pub source_bucket: String,
}

impl Cli {
    pub fn pool_config(&self) -> PoolConfig {
        let config = PoolConfig::new().with_thread_count(self.threads);
        match self.max_jobs {
            // The pool needs at least one slot per thread.
            Some(max_jobs) => config.with_max_jobs(max_jobs.max(self.threads)),
            None => config,
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        let retry = RetryConfig::new()
            .with_max_attempts(self.retries)
            .with_backoff_unit(Duration::from_millis(self.backoff_unit_ms));
        match self.max_backoff {
            Some(secs) => retry.with_max_backoff(Duration::from_secs(secs)),
            None => retry,
        }
    }
}

impl KeyArgs {
    fn apply(&self, mut config: BatchConfig) -> BatchConfig {
        config = config.with_acl_str(&self.acl);
        if let Some(prefix) = &self.add_prefix {
            config = config.with_add_prefix(prefix);
        }
        if let Some(prefix) = &self.del_prefix {
            config = config.with_del_prefix(prefix);
        }
        config
    }
}

impl Command {
    /// Batch settings for the item commands.
    pub fn batch_config(&self, retry: RetryConfig) -> BatchConfig {
        let config = BatchConfig::new().with_retry(retry);
        match self {
            Command::Get(args) => match &args.dir {
                Some(dir) => config.with_download_dir(dir),
                None => config,
            },
            Command::Put(args) => args
                .keys
                .apply(config)
                .with_put_full_path(args.full_path)
                .with_put_only_new(args.only_new),
            Command::Copy(args) => args
                .keys
                .apply(config)
                .with_source_container(&args.source_bucket),
            _ => config,
        }
    }
}

impl ListArgs {
    pub fn options(&self) -> ListOptions {
        let mut options =
            ListOptions::new().with_retry_interval(Duration::from_millis(self.retry_interval_ms));
        if let Some(prefix) = &self.prefix {
            options = options.with_prefix(prefix);
        }
        if let Some(marker) = &self.marker {
            options = options.with_marker(marker);
        }
        if let Some(delimiter) = &self.delimiter {
            options = options.with_delimiter(delimiter);
        }
        options
    }
}

/// Parse a positive usize (>= 1).
fn parse_positive_usize(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("0 is not in 1..".to_string()),
        Ok(value) => Ok(value),
        Err(_) => Err(format!("'{s}' is not a valid number")),
    }
}
