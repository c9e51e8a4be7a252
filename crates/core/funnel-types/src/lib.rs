//! Shared configuration types for s3funnel.
//!
//! This crate defines the value types handed to the engine:
//! - [`Acl`] - canned access-control values for uploads and copies
//! - [`RetryConfig`] - per-job retry budget and backoff formula
//! - [`PoolConfig`] - worker pool sizing
//! - [`BatchConfig`] - per-request settings shared by every job of a batch
//! - [`ListOptions`] - listing cursor settings

pub mod acl;
pub mod config;
pub mod retry;

mod duration_millis;

pub use acl::Acl;
pub use config::{BatchConfig, DEFAULT_DIGEST_CHUNK_SIZE, ListOptions, PoolConfig};
pub use retry::RetryConfig;
