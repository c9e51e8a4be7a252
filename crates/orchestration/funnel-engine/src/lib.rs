//! funnel-engine - Concurrent batch execution against an object store.
//!
//! This crate fans bulk get/put/delete/copy requests out across a bounded
//! pool of OS threads. It provides:
//!
//! - [`ToolBox`] - per-worker cache of one connection and its container handles
//! - [`Job`] - one retryable unit of work with its own backoff state machine
//! - [`WorkerPool`] - fixed threads pulling from a bounded in-flight queue
//! - [`Funnel`] - the batch facade that collects per-item failures
//! - [`ListCursor`] - single-threaded paginated key listing
//!
//! # Example
//!
//! ```ignore
//! use funnel_engine::{Funnel, Failure};
//! use funnel_types::{BatchConfig, PoolConfig};
//!
//! let mut funnel = Funnel::new(connector, PoolConfig::new().with_thread_count(8))?;
//!
//! let failed = funnel.get("my-bucket", ["a.txt", "b.txt"], &BatchConfig::new())?;
//! for failure in &failed {
//!     eprintln!("failed: {failure}");
//! }
//!
//! funnel.shutdown();
//! ```

pub mod digest;
pub mod funnel;
pub mod job;
pub mod keys;
pub mod listing;
pub mod pool;
pub mod sink;
pub mod stats;
pub mod toolbox;

mod queue;

#[cfg(test)]
pub(crate) mod testing;

pub use funnel::Funnel;
pub use job::{Job, JobKind, JobOutcome, JobReport};
pub use listing::ListCursor;
pub use pool::{Task, WorkerPool};
pub use sink::{Failure, FailureDrain, FailureSink, failure_channel};
pub use stats::{FunnelStats, StatsSnapshot};
pub use toolbox::ToolBox;
