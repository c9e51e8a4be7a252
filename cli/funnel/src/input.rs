//! Item sources for the batch commands.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::warn;

/// Items from the command line, or else lazily from `input` or stdin.
///
/// Lines are trimmed of trailing whitespace and blank lines are skipped.
/// Reading stops at the first I/O error, which is logged.
pub fn items(
    args: &[String],
    input: Option<&Path>,
) -> Result<Box<dyn Iterator<Item = String>>> {
    if !args.is_empty() {
        return Ok(Box::new(args.to_vec().into_iter()));
    }

    let reader: Box<dyn BufRead> = match input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };
    Ok(Box::new(lines(reader)))
}

fn lines<R: BufRead>(reader: R) -> impl Iterator<Item = String> {
    reader
        .lines()
        .map_while(|line| match line {
            Ok(line) => Some(line),
            Err(e) => {
                warn!(error = %e, "Failed to read item, stopping input");
                None
            }
        })
        .filter_map(|line| {
            let item = line.trim_end();
            (!item.is_empty()).then(|| item.to_string())
        })
}
