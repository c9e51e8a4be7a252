//! Object-store collaborator traits.

use crate::ListPage;
use funnel_error::Result;
use funnel_types::Acl;
use std::io::Write;
use std::path::Path;

/// Factory for connections to an object store.
///
/// Credentials and transport security are fixed when the connector is
/// built; [`connect`](Connector::connect) never retries on its own.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;

    /// Establishes a new connection.
    fn connect(&self) -> Result<Self::Connection>;
}

/// A live connection to an object store.
pub trait Connection: 'static {
    /// The container handle type resolved through this connection.
    type Container: Container;

    /// Resolves a container handle.
    ///
    /// Fails with [`StoreError::NotFound`](funnel_error::StoreError::NotFound)
    /// when the container does not exist.
    fn container(&self, name: &str) -> Result<Self::Container>;

    /// Lists the names of all containers visible to these credentials.
    fn list_containers(&self) -> Result<Vec<String>>;

    /// Creates a container.
    fn create_container(&self, name: &str) -> Result<()>;

    /// Deletes a container.
    fn drop_container(&self, name: &str) -> Result<()>;
}

/// Options applied to an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// Canned ACL for the new object
    pub acl: Acl,

    /// Content digest of the source file, stored alongside the object so
    /// later uploads can detect unchanged content
    pub digest: Option<String>,
}

impl PutOptions {
    /// Create upload options with the given ACL.
    pub fn new(acl: Acl) -> Self {
        Self { acl, digest: None }
    }

    /// Attach a content digest.
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }
}

/// A handle to one container (bucket) of an object store.
pub trait Container: 'static {
    /// The container name.
    fn name(&self) -> &str;

    /// Downloads an object into `dest`, returning the number of bytes written.
    ///
    /// Failures writing to `dest` are reported as
    /// [`FunnelError::Local`](funnel_error::FunnelError::Local).
    fn get_object(&self, key: &str, dest: &mut dyn Write) -> Result<u64>;

    /// Uploads the file at `source` under `key`, returning its size.
    fn put_object(&self, key: &str, source: &Path, options: &PutOptions) -> Result<u64>;

    /// Returns the stored content digest of an object.
    ///
    /// `None` when the object does not exist or carries no digest.
    fn object_digest(&self, key: &str) -> Result<Option<String>>;

    /// Deletes an object.
    fn delete_object(&self, key: &str) -> Result<()>;

    /// Copies `source_key` from `source_container` into this container as `dest_key`.
    fn copy_object(
        &self,
        source_container: &str,
        source_key: &str,
        dest_key: &str,
        acl: Acl,
    ) -> Result<()>;

    /// Fetches one page of keys following `marker`.
    ///
    /// Empty strings mean "no marker", "no prefix" and "no delimiter".
    fn list_keys(&self, marker: &str, prefix: &str, delimiter: &str) -> Result<ListPage>;
}
