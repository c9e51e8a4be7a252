//! Failure collection for batch requests.
//!
//! Workers push one entry per job that did not succeed; the engine drains
//! the channel once every job of the batch has been consumed.

use funnel_error::{FunnelError, Result};
use tokio::sync::mpsc;
use tracing::warn;

/// A job that did not reach success.
#[derive(Debug)]
pub enum Failure {
    /// Expected per-item failure (not found, server rejection, local file
    /// problem, exhausted retries)
    Item(String),

    /// A programming-level anomaly while processing `item`
    Unexpected { item: String, error: FunnelError },
}

impl Failure {
    /// The item identifier the failure belongs to.
    pub fn item(&self) -> &str {
        match self {
            Self::Item(item) => item,
            Self::Unexpected { item, .. } => item,
        }
    }

    /// Whether this entry wraps an unexpected error.
    pub fn is_unexpected(&self) -> bool {
        matches!(self, Self::Unexpected { .. })
    }

    /// Collapse drained failures into item identifiers.
    ///
    /// Fails with the first unexpected error, so callers that treat internal
    /// errors as fatal can abort the whole batch.
    pub fn collapse(failures: Vec<Failure>) -> Result<Vec<String>> {
        let mut items = Vec::with_capacity(failures.len());
        for failure in failures {
            match failure {
                Self::Item(item) => items.push(item),
                Self::Unexpected { error, .. } => return Err(error),
            }
        }
        Ok(items)
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Item(item) => write!(f, "{item}"),
            Self::Unexpected { item, error } => write!(f, "{item}: {error}"),
        }
    }
}

/// Write side of a batch's failure channel, cloned into every job.
#[derive(Debug, Clone)]
pub struct FailureSink {
    tx: mpsc::UnboundedSender<Failure>,
}

impl FailureSink {
    /// Record a failure. Never blocks.
    pub fn push(&self, failure: Failure) {
        if let Err(e) = self.tx.send(failure) {
            warn!(item = e.0.item(), "Failure sink closed, dropping entry");
        }
    }
}

/// Read side of a batch's failure channel, held by the engine.
#[derive(Debug)]
pub struct FailureDrain {
    rx: mpsc::UnboundedReceiver<Failure>,
}

impl FailureDrain {
    /// Take every entry currently in the channel, in arrival order.
    pub fn collect(mut self) -> Vec<Failure> {
        let mut failures = Vec::new();
        while let Ok(failure) = self.rx.try_recv() {
            failures.push(failure);
        }
        failures
    }
}

/// Create the failure channel for one batch.
pub fn failure_channel() -> (FailureSink, FailureDrain) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FailureSink { tx }, FailureDrain { rx })
}
