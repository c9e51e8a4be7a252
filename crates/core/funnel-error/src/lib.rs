//! Error types and classification for s3funnel.
//!
//! This crate provides:
//! - [`FunnelError`] - Top-level error enum for all engine errors
//! - [`StoreError`] - Errors surfaced by an object-store collaborator
//! - [`ErrorClass`] for retry/abort decision making inside a job

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for s3funnel.
#[derive(Error, Debug)]
pub enum FunnelError {
    /// Errors reported by the object-store collaborator
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The named container does not exist on the remote side
    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    /// A local file could not be read, created or removed
    #[error("Local I/O error on {}: {source}", path.display())]
    Local {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The worker pool no longer accepts jobs
    #[error("Worker pool is shut down")]
    PoolShutdown,

    /// A job panicked while running on a worker
    #[error("Worker panicked: {0}")]
    WorkerPanic(String),

    /// Generic errors (wrapped anyhow)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FunnelError {
    /// Wrap an I/O error that happened on a local path.
    pub fn local(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Local {
            path: path.into(),
            source,
        }
    }
}

/// Errors surfaced by an object-store client.
///
/// Adapters map their client's native errors into these variants so that
/// the job state machine can classify them without knowing the client.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The remote answered with something the client could not use; the
    /// cached session should be discarded
    #[error("Stale session: {0}")]
    StaleSession(String),

    /// The remote explicitly reported a missing object or container
    #[error("Not found: {0}")]
    NotFound(String),

    /// The remote store's server signalled an error
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Partial reads, socket errors, timeouts
    #[error("Transport error: {0}")]
    Transport(String),

    /// Credentials were rejected
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A connection could not be established
    #[error("Connection failed: {0}")]
    Connect(String),
}

/// Error classification for retry decisions.
///
/// Every error a job can observe falls into exactly one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Transient transport failure - retry with exponential backoff
    TransientTransport,

    /// Broken remote session - reset the toolbox and retry
    StaleSession,

    /// Missing object - abort, expected failure
    NotFound,

    /// Remote server rejected the request - abort, expected failure
    RemoteServer,

    /// Local file missing, unreadable or uncreatable - abort, expected failure
    LocalResource,

    /// Programming-level anomaly - abort and surface distinctly
    Unexpected,
}

impl ErrorClass {
    /// Whether a job should attempt the operation again.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::TransientTransport | Self::StaleSession)
    }

    /// Whether the failure is an expected, per-item outcome.
    pub fn is_expected(self) -> bool {
        !matches!(self, Self::Unexpected)
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TransientTransport => write!(f, "TransientTransport"),
            Self::StaleSession => write!(f, "StaleSession"),
            Self::NotFound => write!(f, "NotFound"),
            Self::RemoteServer => write!(f, "RemoteServer"),
            Self::LocalResource => write!(f, "LocalResource"),
            Self::Unexpected => write!(f, "Unexpected"),
        }
    }
}

/// Classifies an error to determine retry behavior.
pub fn classify(error: &FunnelError) -> ErrorClass {
    match error {
        FunnelError::Store(e) => classify_store_error(e),
        FunnelError::Local { .. } => ErrorClass::LocalResource,
        FunnelError::ContainerNotFound(_)
        | FunnelError::Config(_)
        | FunnelError::PoolShutdown
        | FunnelError::WorkerPanic(_)
        | FunnelError::Other(_) => ErrorClass::Unexpected,
    }
}

fn classify_store_error(error: &StoreError) -> ErrorClass {
    match error {
        StoreError::StaleSession(_) => ErrorClass::StaleSession,
        StoreError::NotFound(_) => ErrorClass::NotFound,
        StoreError::Server { .. } => ErrorClass::RemoteServer,
        StoreError::Transport(_) => ErrorClass::TransientTransport,
        StoreError::Auth(_) => ErrorClass::RemoteServer,
        StoreError::Connect(_) => ErrorClass::TransientTransport,
    }
}

/// Result type alias using FunnelError.
pub type Result<T> = std::result::Result<T, FunnelError>;
