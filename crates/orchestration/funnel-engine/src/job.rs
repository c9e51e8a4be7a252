//! Jobs: one retryable operation against a single item.
//!
//! Every job kind shares the same bounded-retry state machine. An attempt
//! either succeeds, asks for a retry (stale session or transient transport
//! error) or aborts. Stale sessions reset the worker's [`ToolBox`] and retry
//! at once; transient errors back off exponentially first. A job that never
//! succeeds pushes exactly one entry onto its batch's failure sink.

use crate::digest::file_digest;
use crate::keys::{copy_key, download_path, put_key};
use crate::pool::{Task, panic_message};
use crate::sink::{Failure, FailureSink};
use crate::stats::FunnelStats;
use crate::toolbox::ToolBox;
use funnel_error::{ErrorClass, FunnelError, Result, classify};
use funnel_traits::{Connector, Container, PutOptions};
use funnel_types::BatchConfig;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, debug_span, error, info, warn};

/// The operation a job performs on its item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// Download the item (a key) into the download directory
    Get,
    /// Upload the item (a local path)
    Put,
    /// Delete the item (a key)
    Delete,
    /// Copy the item (a key) from the source container
    Copy,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::Put => write!(f, "put"),
            Self::Delete => write!(f, "delete"),
            Self::Copy => write!(f, "copy"),
        }
    }
}

/// Terminal state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The operation completed
    Succeeded,
    /// Put in only-new mode found identical content already stored
    Skipped,
    /// A non-retryable error of the given class ended the job
    Aborted(ErrorClass),
    /// Every attempt asked for a retry
    ExhaustedRetries,
    /// An unclassified error ended the job
    Unexpected,
}

/// What happened while running one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub outcome: JobOutcome,

    /// Attempts made. Zero when the job failed during preparation, before
    /// touching the store.
    pub attempts: u32,

    /// Toolbox resets triggered by stale sessions
    pub resets: u32,

    /// Total time slept backing off
    pub backoff: Duration,
}

impl JobReport {
    fn new() -> Self {
        Self {
            outcome: JobOutcome::Unexpected,
            attempts: 0,
            resets: 0,
            backoff: Duration::ZERO,
        }
    }

    fn finish(mut self, outcome: JobOutcome) -> Self {
        self.outcome = outcome;
        self
    }
}

/// Destination resolved before the retry loop starts.
enum Target {
    Get { path: PathBuf, created: bool },
    Put { key: String, path: PathBuf, digest: String },
    Delete,
    Copy { source_container: String, dest_key: String },
}

/// Result of a successful attempt.
enum Completed {
    Transferred(u64),
    Skipped,
}

/// One unit of work bound to one item of a batch.
pub struct Job {
    kind: JobKind,
    container: Arc<str>,
    item: String,
    config: Arc<BatchConfig>,
    sink: FailureSink,
    stats: Arc<FunnelStats>,
}

impl Job {
    pub fn new(
        kind: JobKind,
        container: Arc<str>,
        item: impl Into<String>,
        config: Arc<BatchConfig>,
        sink: FailureSink,
        stats: Arc<FunnelStats>,
    ) -> Self {
        Self {
            kind,
            container,
            item: item.into(),
            config,
            sink,
            stats,
        }
    }

    /// Run the job to a terminal state against `toolbox`.
    ///
    /// Failures are pushed onto the job's sink; the report describes the
    /// run for callers that want more than the sink tells them.
    pub fn run<C: Connector>(&self, toolbox: &mut ToolBox<C>) -> JobReport {
        let span = debug_span!("job", kind = %self.kind, item = %self.item);
        let _entered = span.enter();

        let mut report = JobReport::new();
        let mut target = match self.prepare() {
            Ok(target) => target,
            Err(e) => return self.fail(report, None, e),
        };

        let retry = &self.config.retry;
        for attempt in 0..retry.max_attempts {
            report.attempts += 1;
            self.stats.record_attempt();

            let error = match self.attempt(toolbox, &mut target) {
                Ok(Completed::Transferred(bytes)) => {
                    debug!(attempt, bytes, "Job succeeded");
                    self.stats.record_success(bytes);
                    return report.finish(JobOutcome::Succeeded);
                }
                Ok(Completed::Skipped) => {
                    info!(container = %self.container, "Skipping unchanged file");
                    self.stats.record_skipped();
                    return report.finish(JobOutcome::Skipped);
                }
                Err(e) => e,
            };

            let class = classify(&error);
            if !class.is_retryable() {
                return self.fail(report, Some(&target), error);
            }

            let is_last = attempt + 1 == retry.max_attempts;
            match class {
                ErrorClass::StaleSession => {
                    warn!(attempt, error = %error, "Stale session, resetting connection");
                    toolbox.reset();
                    report.resets += 1;
                    self.stats.record_reset();
                }
                _ => {
                    warn!(attempt, error = %error, "Transient error");
                    if !is_last {
                        let delay = retry.backoff_duration(attempt);
                        debug!(attempt, delay_ms = delay.as_millis() as u64, "Backing off");
                        thread::sleep(delay);
                        report.backoff += delay;
                    }
                }
            }

            if !is_last {
                self.stats.record_retry();
            }
        }

        warn!(
            attempts = report.attempts,
            container = %self.container,
            "Retries exhausted"
        );
        self.cleanup(Some(&target));
        self.stats.record_failure();
        self.sink.push(Failure::Item(self.item.clone()));
        report.finish(JobOutcome::ExhaustedRetries)
    }

    /// Resolve keys and local paths, and check the local side of a put.
    ///
    /// Puts always hash the source file, whether or not only-new mode is
    /// on, so every uploaded object carries its digest for later only-new
    /// runs to compare against.
    fn prepare(&self) -> Result<Target> {
        let config = &self.config;
        match self.kind {
            JobKind::Get => Ok(Target::Get {
                path: download_path(&self.item, config)?,
                created: false,
            }),
            JobKind::Put => {
                let path = PathBuf::from(&self.item);
                let metadata = fs::metadata(&path).map_err(|e| FunnelError::local(&path, e))?;
                if !metadata.is_file() {
                    return Err(FunnelError::local(
                        &path,
                        std::io::Error::new(ErrorKind::InvalidInput, "not a regular file"),
                    ));
                }
                let digest = file_digest(&path, config.digest_chunk_size)?;
                Ok(Target::Put {
                    key: put_key(&self.item, config),
                    path,
                    digest,
                })
            }
            JobKind::Delete => Ok(Target::Delete),
            JobKind::Copy => {
                let source_container = config.source_container.clone().ok_or_else(|| {
                    FunnelError::Config("copy requires a source container".to_string())
                })?;
                Ok(Target::Copy {
                    source_container,
                    dest_key: copy_key(&self.item, config),
                })
            }
        }
    }

    fn attempt<C: Connector>(
        &self,
        toolbox: &mut ToolBox<C>,
        target: &mut Target,
    ) -> Result<Completed> {
        let container = toolbox.container(&self.container)?;
        let key = self.item.as_str();

        match target {
            Target::Get { path, created } => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent).map_err(|e| FunnelError::local(parent, e))?;
                }
                let file = File::create(&*path).map_err(|e| FunnelError::local(&*path, e))?;
                *created = true;

                let mut writer = BufWriter::new(file);
                let bytes = container
                    .get_object(key, &mut writer)
                    .map_err(|e| match e {
                        FunnelError::Local { source, .. } => FunnelError::local(&*path, source),
                        other => other,
                    })?;
                writer.flush().map_err(|e| FunnelError::local(&*path, e))?;
                Ok(Completed::Transferred(bytes))
            }
            Target::Put { key, path, digest } => {
                if self.config.put_only_new
                    && container.object_digest(key)?.as_deref() == Some(digest.as_str())
                {
                    return Ok(Completed::Skipped);
                }
                let options = PutOptions::new(self.config.acl).with_digest(digest.as_str());
                let bytes = container.put_object(key, path, &options)?;
                Ok(Completed::Transferred(bytes))
            }
            Target::Delete => {
                container.delete_object(key)?;
                Ok(Completed::Transferred(0))
            }
            Target::Copy {
                source_container,
                dest_key,
            } => {
                container.copy_object(source_container, key, dest_key, self.config.acl)?;
                Ok(Completed::Transferred(0))
            }
        }
    }

    /// Abort on a non-retryable error.
    fn fail(&self, report: JobReport, target: Option<&Target>, error: FunnelError) -> JobReport {
        let class = classify(&error);
        self.cleanup(target);

        if !class.is_expected() {
            error!(error = %error, container = %self.container, "Unexpected error");
            self.stats.record_unexpected();
            self.sink.push(Failure::Unexpected {
                item: self.item.clone(),
                error,
            });
            return report.finish(JobOutcome::Unexpected);
        }

        if self.kind == JobKind::Put && class == ErrorClass::RemoteServer {
            error!(error = %error, class = %class, "Unexpected server error on upload");
        } else {
            warn!(error = %error, class = %class, "Job failed");
        }
        self.stats.record_failure();
        self.sink.push(Failure::Item(self.item.clone()));
        report.finish(JobOutcome::Aborted(class))
    }

    /// Remove a partially written download.
    fn cleanup(&self, target: Option<&Target>) {
        if let Some(Target::Get {
            path,
            created: true,
        }) = target
        {
            match fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "Removed partial download"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial download"),
            }
        }
    }
}

impl<C: Connector> Task<ToolBox<C>> for Job {
    fn execute(self, toolbox: &mut ToolBox<C>) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run(toolbox)));
        if let Err(payload) = result {
            let message = panic_message(payload.as_ref());
            error!(kind = %self.kind, item = %self.item, panic = %message, "Job panicked");

            toolbox.reset();
            if let (JobKind::Get, Ok(path)) = (self.kind, download_path(&self.item, &self.config)) {
                self.cleanup(Some(&Target::Get {
                    path,
                    created: true,
                }));
            }
            self.stats.record_unexpected();
            self.sink.push(Failure::Unexpected {
                item: self.item.clone(),
                error: FunnelError::WorkerPanic(message),
            });
        }
    }
}
