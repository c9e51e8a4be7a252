//! The batch facade.
//!
//! A [`Funnel`] turns one batch request into one [`Job`] per item, feeds
//! them through its worker pool and returns the failures. Batch calls only
//! return `Err` for problems with the request itself (bad configuration, a
//! stopped pool); per-item problems always come back as [`Failure`]s.

use crate::job::{Job, JobKind};
use crate::listing::ListCursor;
use crate::pool::WorkerPool;
use crate::sink::{Failure, failure_channel};
use crate::stats::{FunnelStats, StatsSnapshot};
use crate::toolbox::ToolBox;
use funnel_error::{ErrorClass, FunnelError, Result, classify};
use funnel_traits::{Connection, Connector};
use funnel_types::{BatchConfig, ListOptions, PoolConfig};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

type JobPool<C> = WorkerPool<Job, ToolBox<C>>;

/// Concurrent batch engine over one object store.
pub struct Funnel<C: Connector> {
    connector: Arc<C>,
    pool_config: PoolConfig,
    pool: Option<JobPool<C>>,
    /// Used for listing and container administration, never by workers
    toolbox: ToolBox<C>,
    stats: Arc<FunnelStats>,
}

impl<C: Connector> Funnel<C> {
    /// Create a funnel. Worker threads start with the first batch.
    pub fn new(connector: C, pool_config: PoolConfig) -> Result<Self> {
        pool_config.validate().map_err(FunnelError::Config)?;
        let connector = Arc::new(connector);

        Ok(Self {
            toolbox: ToolBox::new(connector.clone()),
            connector,
            pool_config,
            pool: None,
            stats: Arc::new(FunnelStats::new()),
        })
    }

    /// Download every key in `keys` from `container`.
    pub fn get<I>(&mut self, container: &str, keys: I, config: &BatchConfig) -> Result<Vec<Failure>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.batch(JobKind::Get, container, keys, config)
    }

    /// Upload every local file in `paths` into `container`.
    pub fn put<I>(&mut self, container: &str, paths: I, config: &BatchConfig) -> Result<Vec<Failure>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.batch(JobKind::Put, container, paths, config)
    }

    /// Delete every key in `keys` from `container`.
    pub fn delete<I>(&mut self, container: &str, keys: I, config: &BatchConfig) -> Result<Vec<Failure>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.batch(JobKind::Delete, container, keys, config)
    }

    /// Copy every key in `keys` from the configured source container into
    /// `container`.
    pub fn copy<I>(&mut self, container: &str, keys: I, config: &BatchConfig) -> Result<Vec<Failure>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        if config.source_container.is_none() {
            return Err(FunnelError::Config(
                "copy requires a source container".to_string(),
            ));
        }
        self.batch(JobKind::Copy, container, keys, config)
    }

    /// Lazily list the keys of `container`.
    pub fn list(&mut self, container: &str, options: ListOptions) -> ListCursor<'_, C> {
        ListCursor::new(&mut self.toolbox, container, options)
    }

    /// Names of every container visible to the connector's credentials.
    pub fn list_containers(&mut self) -> Result<Vec<String>> {
        self.admin(|connection| connection.list_containers())
    }

    /// Create the container `name`. Fails if it exists or the store rejects it.
    pub fn create_container(&mut self, name: &str) -> Result<()> {
        self.admin(|connection| connection.create_container(name))?;
        info!(container = name, "Created container");
        Ok(())
    }

    /// Delete an empty container and forget its cached handle.
    pub fn drop_container(&mut self, name: &str) -> Result<()> {
        self.admin(|connection| connection.drop_container(name))?;
        self.toolbox.evict(name);
        info!(container = name, "Dropped container");
        Ok(())
    }

    /// Counters accumulated over every batch run by this funnel.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn pool_config(&self) -> &PoolConfig {
        &self.pool_config
    }

    /// Whether worker threads are currently running.
    pub fn is_running(&self) -> bool {
        self.pool.is_some()
    }

    /// Stop and join the worker threads.
    ///
    /// A later batch starts a fresh pool.
    pub fn shutdown(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.shutdown();
            info!("Funnel shut down");
        }
    }

    fn batch<I>(
        &mut self,
        kind: JobKind,
        container: &str,
        items: I,
        config: &BatchConfig,
    ) -> Result<Vec<Failure>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        config.validate().map_err(FunnelError::Config)?;

        let started = Instant::now();
        let stats = self.stats.clone();
        let config = Arc::new(config.clone());
        let container: Arc<str> = Arc::from(container);
        let (sink, drain) = failure_channel();
        let pool = self.pool()?;

        let mut submitted = 0usize;
        for item in items {
            let job = Job::new(
                kind,
                container.clone(),
                item,
                config.clone(),
                sink.clone(),
                stats.clone(),
            );
            pool.submit(job)?;
            submitted += 1;
        }
        drop(sink);

        pool.join();
        let failures = drain.collect();

        info!(
            operation = %kind,
            container = %container,
            submitted,
            failed = failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch complete"
        );
        Ok(failures)
    }

    fn pool(&mut self) -> Result<&JobPool<C>> {
        let pool = match self.pool.take() {
            Some(pool) => pool,
            None => {
                let connector = self.connector.clone();
                WorkerPool::new(&self.pool_config, move |worker_id| {
                    debug!(worker = worker_id, "Creating toolbox");
                    ToolBox::new(connector.clone())
                })?
            }
        };
        Ok(self.pool.insert(pool))
    }

    /// Run an administrative call on the funnel's own connection, resetting
    /// it once if the session turns out to be stale.
    fn admin<T, F>(&mut self, op: F) -> Result<T>
    where
        F: Fn(&C::Connection) -> Result<T>,
    {
        match self.toolbox.connection().and_then(&op) {
            Err(e) if classify(&e) == ErrorClass::StaleSession => {
                warn!(error = %e, "Stale session, resetting connection");
                self.toolbox.reset();
                self.stats.record_reset();
                self.toolbox.connection().and_then(&op)
            }
            result => result,
        }
    }
}

impl<C: Connector> Drop for Funnel<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
