//! Glob expansion of source identifiers for multi-source runs.
//!
//! Each pattern expands to its matching files in sorted order, so a batch
//! like `columns/*.txt` is processed (and reported) deterministically.
//!
//! ```no_run
//! use sortstat::io::glob::expand_sources;
//!
//! let sources = expand_sources(["export/part-*.txt", "extra.txt.gz"])?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result, bail};
use glob::glob;
use std::path::PathBuf;

/// Expand a glob pattern into a sorted vector of matching file paths.
///
/// Directories are skipped. Zero matches is not an error here.
///
/// # Errors
/// Returns an error if the pattern is invalid or a matched entry cannot be read.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;

    let mut result = Vec::new();
    for entry in paths {
        let path =
            entry.with_context(|| format!("error reading glob entry for pattern: {pattern}"))?;
        if path.is_file() {
            result.push(path);
        }
    }
    result.sort();
    Ok(result)
}

/// Like [`expand_glob`], but zero matches is an error.
///
/// # Errors
/// See [`expand_glob`]; also fails when nothing matches.
pub fn expand_glob_required(pattern: &str) -> Result<Vec<PathBuf>> {
    let files = expand_glob(pattern)?;
    if files.is_empty() {
        bail!("no files found matching pattern: {pattern}");
    }
    Ok(files)
}

/// Expand every pattern and concatenate the matches in pattern order.
///
/// Every pattern must match at least one file. Matches are returned as
/// source identifiers, so paths must be valid UTF-8.
///
/// # Errors
/// Returns an error for an invalid or unmatched pattern, or a non-UTF-8 path.
pub fn expand_sources<I, S>(patterns: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sources = Vec::new();
    for pattern in patterns {
        for path in expand_glob_required(pattern.as_ref())? {
            match path.to_str() {
                Some(s) => sources.push(s.to_string()),
                None => bail!("path is not valid UTF-8: {}", path.display()),
            }
        }
    }
    Ok(sources)
}
