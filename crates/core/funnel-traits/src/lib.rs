//! Core traits for s3funnel.
//!
//! This crate defines the capability surface the engine consumes from an
//! object-store client:
//! - [`Connector`] - Establishes connections with fixed credentials
//! - [`Connection`] - Resolves containers and administers them
//! - [`Container`] - Per-object operations and paginated key listing
//!
//! Implementations map their native errors into
//! [`funnel_error::StoreError`] so the engine can classify them.

pub mod listing;
pub mod store;

pub use listing::{KeyInfo, ListPage};
pub use store::{Connection, Connector, Container, PutOptions};
