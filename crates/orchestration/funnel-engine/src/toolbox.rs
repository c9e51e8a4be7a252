//! Per-worker cache of a store connection and its container handles.

use funnel_error::{FunnelError, Result, StoreError};
use funnel_traits::{Connection, Connector};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Container handle type produced by a connector's connections.
pub type ContainerOf<C> = <<C as Connector>::Connection as Connection>::Container;

/// Lazily-created connection plus a cache of resolved container handles.
///
/// A toolbox belongs to exactly one worker thread for its whole life. It is
/// built on that thread and never crosses a thread boundary, so it needs no
/// locking. A cached container always implies a live cached connection.
pub struct ToolBox<C: Connector> {
    connector: Arc<C>,
    containers: HashMap<String, ContainerOf<C>>,
    connection: Option<C::Connection>,
    resets: u64,
}

impl<C: Connector> ToolBox<C> {
    /// Create an empty toolbox that connects through `connector` on demand.
    pub fn new(connector: Arc<C>) -> Self {
        Self {
            connector,
            containers: HashMap::new(),
            connection: None,
            resets: 0,
        }
    }

    /// Returns the cached connection, establishing one if needed.
    ///
    /// Connection failures propagate immediately; retrying is the caller's
    /// business.
    pub fn connection(&mut self) -> Result<&C::Connection> {
        let connection = match self.connection.take() {
            Some(connection) => connection,
            None => {
                debug!("Starting new store connection");
                self.connector.connect()?
            }
        };
        Ok(self.connection.insert(connection))
    }

    /// Returns the cached handle for `name`, resolving it if needed.
    pub fn container(&mut self, name: &str) -> Result<&ContainerOf<C>> {
        if !self.containers.contains_key(name) {
            let connection = self.connection()?;
            debug!(container = name, "Resolving container");
            let container = connection.container(name).map_err(|e| match e {
                FunnelError::Store(StoreError::NotFound(_)) => {
                    FunnelError::ContainerNotFound(name.to_string())
                }
                other => other,
            })?;
            self.containers.insert(name.to_string(), container);
        }

        self.containers
            .get(name)
            .ok_or_else(|| FunnelError::ContainerNotFound(name.to_string()))
    }

    /// Discards the cached connection and every cached container.
    pub fn reset(&mut self) {
        self.containers.clear();
        self.connection = None;
        self.resets += 1;
        debug!(resets = self.resets, "Toolbox reset");
    }

    /// Drops the cached handle for one container, keeping the connection.
    pub fn evict(&mut self, name: &str) {
        self.containers.remove(name);
    }

    /// Whether a connection is currently cached.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Number of cached container handles.
    pub fn cached_containers(&self) -> usize {
        self.containers.len()
    }

    /// Number of times [`reset`](Self::reset) has been called.
    pub fn reset_count(&self) -> u64 {
        self.resets
    }
}
