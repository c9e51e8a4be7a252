//! Command execution.

use crate::args::{Cli, Command};
use crate::input;
use anyhow::{Context, Result};
use funnel_engine::{Failure, Funnel, StatsSnapshot};
use funnel_s3::{S3Config, S3Connector};
use std::io::{self, BufWriter, Write};
use tracing::{error, info};

/// What a command did, for the summary and the exit status.
#[derive(Debug)]
pub struct RunSummary {
    pub operation: &'static str,
    pub failed: usize,
    pub unexpected: usize,
    /// Engine counters; only set for batch commands
    pub stats: Option<StatsSnapshot>,
}

/// Build the S3 connector from the global options.
fn s3_config(args: &Cli) -> S3Config {
    let mut config = S3Config::new()
        .with_secure(!args.insecure)
        .with_timeout(args.timeout);
    if let Some(region) = &args.region {
        config = config.with_region(region);
    }
    if let Some(endpoint) = &args.endpoint {
        config = config.with_endpoint(endpoint);
    }
    if let (Some(access_key), Some(secret_key)) = (&args.access_key, &args.secret_key) {
        config = config.with_credentials(access_key, secret_key);
    }
    if let Some(profile) = &args.profile {
        config = config.with_profile(profile);
    }
    config
}

pub fn execute(args: Cli) -> Result<RunSummary> {
    let connector = S3Connector::new(s3_config(&args)).context("failed to configure S3")?;
    let mut funnel = Funnel::new(connector, args.pool_config())?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let (operation, tally) = match &args.command {
        Command::Buckets => {
            for name in funnel.list_containers()? {
                writeln!(out, "{name}")?;
            }
            ("buckets", None)
        }
        Command::Create { bucket } => {
            funnel
                .create_container(bucket)
                .with_context(|| format!("failed to create bucket {bucket}"))?;
            ("create", None)
        }
        Command::Drop { bucket } => {
            funnel
                .drop_container(bucket)
                .with_context(|| format!("failed to drop bucket {bucket}"))?;
            ("drop", None)
        }
        Command::List(list) => {
            for key in funnel.list(&list.bucket, list.options()) {
                let key = key.with_context(|| format!("failed to list bucket {}", list.bucket))?;
                writeln!(out, "{key}")?;
            }
            ("list", None)
        }
        Command::Get(get) => {
            let items = input::items(&get.target.items, get.target.input.as_deref())?;
            let config = args.command.batch_config(args.retry_config());
            let failures = funnel.get(&get.target.bucket, items, &config)?;
            ("get", Some(report(&failures, &mut out)?))
        }
        Command::Put(put) => {
            let items = input::items(&put.target.items, put.target.input.as_deref())?;
            let config = args.command.batch_config(args.retry_config());
            let failures = funnel.put(&put.target.bucket, items, &config)?;
            ("put", Some(report(&failures, &mut out)?))
        }
        Command::Delete(target) => {
            let items = input::items(&target.items, target.input.as_deref())?;
            let config = args.command.batch_config(args.retry_config());
            let failures = funnel.delete(&target.bucket, items, &config)?;
            ("delete", Some(report(&failures, &mut out)?))
        }
        Command::Copy(copy) => {
            let items = input::items(&copy.target.items, copy.target.input.as_deref())?;
            let config = args.command.batch_config(args.retry_config());
            let failures = funnel.copy(&copy.target.bucket, items, &config)?;
            ("copy", Some(report(&failures, &mut out)?))
        }
    };
    out.flush()?;

    let stats = tally.map(|_| funnel.stats());
    funnel.shutdown();

    let (failed, unexpected) = tally.unwrap_or((0, 0));
    info!(operation, failed, unexpected, "Finished");
    Ok(RunSummary {
        operation,
        failed,
        unexpected,
        stats,
    })
}

/// Print failed items to `out`, returning (failed, unexpected) counts.
fn report(failures: &[Failure], out: &mut impl Write) -> Result<(usize, usize)> {
    let mut unexpected = 0;
    for failure in failures {
        writeln!(out, "{}", failure.item())?;
        if let Failure::Unexpected { item, error } = failure {
            error!(item = %item, error = %error, "Internal error");
            unexpected += 1;
        }
    }
    Ok((failures.len(), unexpected))
}
