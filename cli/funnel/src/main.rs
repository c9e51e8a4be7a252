//! s3funnel CLI
//!
//! Multithreaded bulk operations against S3-compatible object stores.

use clap::Parser;
use funnel_cli_common::{format_bytes, format_number, format_rate, init_logging};

mod args;
mod input;
mod run;

use args::Cli;

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    // Logs go to stderr so stdout carries only keys and failed items
    init_logging(args.log_level)?;

    let quiet = args.quiet;
    let summary = run::execute(args)?;

    if let Some(stats) = summary.stats.as_ref().filter(|_| !quiet) {
        let secs = stats.duration().num_milliseconds() as f64 / 1000.0;

        eprintln!();
        eprintln!("{} completed:", summary.operation);
        eprintln!("  Items:       {}", format_number(stats.jobs_total()));
        eprintln!("  Succeeded:   {}", format_number(stats.jobs_succeeded));
        if stats.jobs_skipped > 0 {
            eprintln!("  Unchanged:   {}", format_number(stats.jobs_skipped));
        }
        eprintln!("  Failed:      {}", format_number(summary.failed as u64));
        eprintln!("  Transferred: {}", format_bytes(stats.bytes_transferred));
        eprintln!("  Duration:    {secs:.2}s ({})", format_rate(stats.jobs_total(), secs));
        if stats.retries > 0 || stats.resets > 0 {
            eprintln!(
                "  Retries:     {} ({} connection resets)",
                format_number(stats.retries),
                format_number(stats.resets)
            );
        }
    }

    if summary.unexpected > 0 {
        std::process::exit(1); // Internal error on at least one item
    }
    if summary.failed > 0 {
        std::process::exit(4); // Partial failure
    }

    Ok(())
}
