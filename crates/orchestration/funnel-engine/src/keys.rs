//! Destination key and local path construction.
//!
//! All functions here are pure and run once per job, before its retry loop.

use funnel_error::{FunnelError, Result};
use funnel_types::BatchConfig;
use std::io::{Error, ErrorKind};
use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};

/// Key an uploaded file is stored under.
///
/// The delete-prefix is stripped once from the front of the path, the path
/// is reduced to its base name unless full paths are kept, and finally the
/// add-prefix is prepended.
pub fn put_key(path: &str, config: &BatchConfig) -> String {
    let stripped = strip_prefix(path, config.del_prefix.as_deref());
    let name = if config.put_full_path {
        stripped
    } else {
        base_name(stripped)
    };
    with_prefix(name, config.add_prefix.as_deref())
}

/// Key a copied object is stored under in the destination container.
///
/// Same prefix rules as [`put_key`], without base-name reduction.
pub fn copy_key(key: &str, config: &BatchConfig) -> String {
    let stripped = strip_prefix(key, config.del_prefix.as_deref());
    with_prefix(stripped, config.add_prefix.as_deref())
}

/// Local path a downloaded key is written to.
///
/// Leading slashes are dropped so absolute-looking keys stay relative.
/// Keys that would resolve outside the download directory are rejected.
pub fn download_path(key: &str, config: &BatchConfig) -> Result<PathBuf> {
    let relative = Path::new(key.trim_start_matches('/'));
    let escapes = relative
        .components()
        .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(FunnelError::local(
            key,
            Error::new(ErrorKind::InvalidInput, "key resolves outside the download directory"),
        ));
    }

    Ok(match &config.download_dir {
        Some(dir) => dir.join(relative),
        None => relative.to_path_buf(),
    })
}

fn strip_prefix<'a>(value: &'a str, prefix: Option<&str>) -> &'a str {
    match prefix {
        Some(prefix) if !prefix.is_empty() => value.strip_prefix(prefix).unwrap_or(value),
        _ => value,
    }
}

fn with_prefix(value: &str, prefix: Option<&str>) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}{value}"),
        None => value.to_string(),
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit(['/', MAIN_SEPARATOR]).next().unwrap_or(path)
}
