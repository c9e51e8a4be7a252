//! Shared utilities for the s3funnel command line.
//!
//! Log level selection, logging setup and human-readable formatting for
//! run summaries.

pub mod args;
pub mod format;
pub mod logging;

pub use args::LogLevel;
pub use format::{format_bytes, format_number, format_rate};
pub use logging::init_logging;
