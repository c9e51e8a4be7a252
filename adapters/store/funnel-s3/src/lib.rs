//! funnel-s3 - S3 implementation of the s3funnel store traits.
//!
//! Works against AWS S3 and S3-compatible endpoints such as LocalStack.
//! The AWS SDK is async; this crate owns a small tokio runtime and drives
//! it from the engine's worker threads, which never run inside a runtime.

mod config;
mod error;
mod store;

pub use config::{DIGEST_METADATA_KEY, S3Config, create_s3_client};
pub use error::map_sdk_error;
pub use store::{S3Connection, S3Connector, S3Container};
