//! Shared LocalStack setup for integration tests.

pub mod localstack;

pub use localstack::{LocalStackTestContext, unique_bucket};
